//! Delegated-authorization strategy: interactive OAuth with refresh.
//!
//! Acquisition builds a consent URL from the app descriptor
//! (`client_secrets.json`) and suspends on a [`ConsentBroker`] until the
//! user-approved authorization code arrives — either pasted manually or
//! delivered to a loopback callback listener. The resulting credential
//! carries refresh material, so later resolutions renew it with a single
//! token-endpoint round trip instead of repeating the interactive flow.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{Strategy, StrategyDescriptor};
use crate::credential::{Credential, StrategyKind};
use crate::error::{Error, Result};
use crate::platform::{OAuthApp, TokenGrant, VideoPlatform};

/// Out-of-band redirect: the provider displays the code for the user to
/// paste back instead of redirecting anywhere.
const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// The suspension point of interactive acquisition: turns an
/// authorization URL into an authorization code. Callers supply the
/// implementation, and with it the cancellation behavior.
#[async_trait]
pub trait ConsentBroker: Send + Sync {
    /// Redirect URI the authorization URL should carry.
    fn redirect_uri(&self) -> String;

    /// Present the URL to the user and wait for the resulting code.
    async fn obtain_code(&self, auth_url: &str) -> Result<String>;
}

/// Manual consent: print the URL, read the pasted code from stdin.
pub struct ManualConsent;

#[async_trait]
impl ConsentBroker for ManualConsent {
    fn redirect_uri(&self) -> String {
        OOB_REDIRECT_URI.to_string()
    }

    async fn obtain_code(&self, auth_url: &str) -> Result<String> {
        println!();
        println!("Open this URL in your browser and approve access:");
        println!("  {auth_url}");
        println!("Then paste the authorization code below.");
        print!("Authorization code: ");

        let line = tokio::task::spawn_blocking(|| {
            use std::io::{BufRead, Write};
            std::io::stdout().flush().ok();
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .map(|_| line)
        })
        .await
        .map_err(|e| Error::AcquisitionFailed(format!("stdin reader failed: {e}")))?
        .map_err(|e| Error::AcquisitionFailed(format!("reading authorization code: {e}")))?;

        let code = line.trim();
        if code.is_empty() {
            return Err(Error::AcquisitionFailed(
                "no authorization code provided".to_string(),
            ));
        }
        Ok(code.to_string())
    }
}

/// Handle for aborting a pending callback-listener wait.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// Loopback-listener consent: serve one redirect on a local port and pull
/// the authorization code out of its query string.
pub struct CallbackConsent {
    port: u16,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl CallbackConsent {
    pub fn new(port: u16) -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            port,
            cancel_tx: Arc::new(tx),
            cancel_rx: rx,
        }
    }

    /// Handle the caller can use to abort the authorization wait (wired
    /// to Ctrl-C in the CLI).
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            tx: self.cancel_tx.clone(),
        }
    }
}

#[async_trait]
impl ConsentBroker for CallbackConsent {
    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}", self.port)
    }

    async fn obtain_code(&self, auth_url: &str) -> Result<String> {
        let listener = TcpListener::bind(("127.0.0.1", self.port))
            .await
            .map_err(|e| {
                Error::AcquisitionFailed(format!(
                    "callback listener failed to bind port {}: {e}",
                    self.port
                ))
            })?;

        println!();
        println!("Open this URL in your browser and approve access:");
        println!("  {auth_url}");
        info!(port = self.port, "waiting for authorization redirect");

        let mut cancel = self.cancel_rx.clone();
        if *cancel.borrow_and_update() {
            return Err(Error::AcquisitionFailed(
                "authorization wait cancelled".to_string(),
            ));
        }
        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow_and_update() {
                        return Err(Error::AcquisitionFailed(
                            "authorization wait cancelled".to_string(),
                        ));
                    }
                }
                accepted = listener.accept() => {
                    let (stream, peer) = accepted.map_err(|e| {
                        Error::AcquisitionFailed(format!("callback accept failed: {e}"))
                    })?;
                    debug!(%peer, "callback connection");
                    match serve_redirect(stream).await? {
                        Some(code) => return Ok(code),
                        // Not the redirect (favicon and friends), keep waiting
                        None => continue,
                    }
                }
            }
        }
    }
}

/// Serve one connection on the callback port. Returns the authorization
/// code if this request was the redirect, `None` for unrelated requests.
async fn serve_redirect(stream: TcpStream) -> Result<Option<String>> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .await
        .map_err(|e| Error::AcquisitionFailed(format!("reading callback request: {e}")))?;

    let outcome = redirect_outcome(&request_line);

    let (status, page) = match &outcome {
        Ok(Some(_)) => (
            "200 OK",
            "Authorization received. You can close this window.",
        ),
        Ok(None) => ("404 Not Found", "Not found."),
        Err(_) => ("200 OK", "Authorization was denied. You can close this window."),
    };
    let body = format!(
        "<html><body><h3>{page}</h3></body></html>"
    );
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let mut stream = reader.into_inner();
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        warn!("failed to answer callback request: {e}");
    }
    let _ = stream.shutdown().await;

    outcome
}

/// Extract the authorization outcome from an HTTP request line like
/// `GET /?code=abc&scope=... HTTP/1.1`.
fn redirect_outcome(request_line: &str) -> Result<Option<String>> {
    let path = match request_line.split_whitespace().nth(1) {
        Some(path) => path,
        None => return Ok(None),
    };
    let url = match Url::parse(&format!("http://localhost{path}")) {
        Ok(url) => url,
        Err(_) => return Ok(None),
    };
    if url.path() != "/" {
        return Ok(None);
    }

    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => {
                return Err(Error::AcquisitionFailed(format!(
                    "authorization denied: {value}"
                )))
            }
            _ => {}
        }
    }
    Ok(code)
}

/// Interactive OAuth strategy.
pub struct DelegatedStrategy {
    client_secrets_path: PathBuf,
    scopes: Vec<String>,
    platform: Arc<dyn VideoPlatform>,
    consent: Arc<dyn ConsentBroker>,
}

impl DelegatedStrategy {
    pub fn new(
        client_secrets_path: PathBuf,
        scopes: Vec<String>,
        platform: Arc<dyn VideoPlatform>,
        consent: Arc<dyn ConsentBroker>,
    ) -> Self {
        Self {
            client_secrets_path,
            scopes,
            platform,
            consent,
        }
    }

    fn load_app(&self) -> Result<OAuthApp> {
        let bytes = std::fs::read(&self.client_secrets_path).map_err(|e| {
            Error::ConfigurationMissing(format!(
                "client secrets at {}: {e}",
                self.client_secrets_path.display()
            ))
        })?;
        OAuthApp::from_client_secrets(&bytes)
    }

    fn consent_url(&self, app: &OAuthApp, redirect_uri: &str) -> Result<String> {
        let scope = self.scopes.join(" ");
        let url = Url::parse_with_params(
            &app.auth_uri,
            &[
                ("client_id", app.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| Error::Malformed(format!("authorization URI: {e}")))?;
        Ok(url.into())
    }

    /// Assemble a credential from a token grant, preserving refresh
    /// material across refreshes that do not re-issue it. The grant's
    /// scope list wins when present; `fallback_scopes` covers endpoints
    /// that omit it.
    fn credential_from_grant(
        &self,
        grant: TokenGrant,
        previous_refresh: Option<String>,
        fallback_scopes: BTreeSet<String>,
    ) -> Credential {
        let granted_scopes: BTreeSet<String> = match grant.scope.as_deref() {
            Some(scope) if !scope.trim().is_empty() => {
                scope.split_whitespace().map(str::to_string).collect()
            }
            _ => fallback_scopes,
        };
        let expiry = grant.expiry();
        Credential {
            strategy: StrategyKind::Delegated,
            access_material: grant.access_token,
            expiry,
            refresh_material: grant.refresh_token.or(previous_refresh),
            granted_scopes,
        }
    }
}

#[async_trait]
impl Strategy for DelegatedStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Delegated
    }

    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            kind: StrategyKind::Delegated,
            required_files: vec![self.client_secrets_path.clone()],
            capability_scopes: self.scopes.iter().cloned().collect(),
            interactive: true,
        }
    }

    fn is_attemptable(&self) -> bool {
        self.client_secrets_path.exists()
    }

    async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        let refresh_token = credential.refresh_material.as_deref().ok_or_else(|| {
            Error::RefreshDenied("credential carries no refresh material".to_string())
        })?;

        let app = self.load_app()?;
        let grant = self
            .platform
            .exchange_refresh_token(&app, refresh_token)
            .await?;

        info!("refreshed delegated credential");
        Ok(self.credential_from_grant(
            grant,
            credential.refresh_material.clone(),
            credential.granted_scopes.clone(),
        ))
    }

    async fn acquire(&self) -> Result<Credential> {
        let app = self.load_app()?;
        let redirect_uri = self.consent.redirect_uri();
        let auth_url = self.consent_url(&app, &redirect_uri)?;

        let code = self.consent.obtain_code(&auth_url).await?;
        debug!("exchanging authorization code");
        let grant = self
            .platform
            .exchange_authorization_code(&app, &code, &redirect_uri)
            .await?;

        info!("delegated authorization granted");
        let requested = self.scopes.iter().cloned().collect();
        Ok(self.credential_from_grant(grant, None, requested))
    }
}
