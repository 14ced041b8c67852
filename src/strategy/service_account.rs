//! Service-identity strategy.
//!
//! Acquisition is a pure local transformation of the service-account key
//! file: the private key signs a short-lived RS256 assertion, which then
//! authorizes requests as a bearer credential. No network, no prompt.
//! There is no refresh material; an expired assertion is simply discarded
//! and re-minted on the next resolution.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Strategy, StrategyDescriptor};
use crate::credential::{Credential, StrategyKind};
use crate::error::{Error, Result};

/// Assertion lifetime: one hour, the platform maximum.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// The relevant subset of a service-account key file.
#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    #[serde(rename = "type")]
    key_type: Option<String>,
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

pub struct ServiceIdentityStrategy {
    key_path: PathBuf,
    scopes: Vec<String>,
}

impl ServiceIdentityStrategy {
    pub fn new(key_path: PathBuf, scopes: Vec<String>) -> Self {
        Self { key_path, scopes }
    }

    fn load_key(&self) -> Result<ServiceAccountKey> {
        let bytes = std::fs::read(&self.key_path).map_err(|e| {
            Error::ConfigurationMissing(format!(
                "service-account key at {}: {e}",
                self.key_path.display()
            ))
        })?;
        let key: ServiceAccountKey = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Malformed(format!("service-account key: {e}")))?;
        if let Some(kind) = &key.key_type {
            if kind != "service_account" {
                return Err(Error::Malformed(format!(
                    "service-account key has type '{kind}'"
                )));
            }
        }
        Ok(key)
    }
}

#[async_trait]
impl Strategy for ServiceIdentityStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::ServiceIdentity
    }

    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            kind: StrategyKind::ServiceIdentity,
            required_files: vec![self.key_path.clone()],
            capability_scopes: self.scopes.iter().cloned().collect(),
            interactive: false,
        }
    }

    fn is_attemptable(&self) -> bool {
        self.key_path.exists()
    }

    async fn acquire(&self) -> Result<Credential> {
        let key = self.load_key()?;

        let now = Utc::now();
        let expiry = now + Duration::seconds(ASSERTION_LIFETIME_SECS);
        let claims = AssertionClaims {
            iss: &key.client_email,
            scope: self.scopes.join(" "),
            aud: &key.token_uri,
            iat: now.timestamp(),
            exp: expiry.timestamp(),
        };

        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| {
                Error::AcquisitionFailed(format!("service key is not a valid RSA PEM: {e}"))
            })?;
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| Error::AcquisitionFailed(format!("signing assertion: {e}")))?;

        info!(account = %key.client_email, "minted service-identity assertion");
        Ok(Credential {
            strategy: StrategyKind::ServiceIdentity,
            access_material: assertion,
            expiry: Some(expiry),
            refresh_material: None,
            granted_scopes: self.scopes.iter().cloned().collect(),
        })
    }
}
