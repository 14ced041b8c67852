//! Shared test doubles: a scripted platform with call counters and a
//! canned consent broker.

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use yt_session::credential::Credential;
use yt_session::error::{Error, Result};
use yt_session::platform::{
    ChannelIdentity, ChannelInfo, OAuthApp, Report, ReportQuery, TokenGrant, UploadReceipt,
    UploadRequest, VideoDetails, VideoPage, VideoPlatform, VideoSummary,
};
use yt_session::strategy::ConsentBroker;

/// Scripted platform: counts every call class and serves canned data.
pub struct MockPlatform {
    pub refresh_calls: AtomicUsize,
    pub code_calls: AtomicUsize,
    pub probe_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub report_calls: AtomicUsize,
    pub deny_refresh: bool,
    pub fail_probe: bool,
    pub uploads: Vec<VideoSummary>,
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            code_calls: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            report_calls: AtomicUsize::new(0),
            deny_refresh: false,
            fail_probe: false,
            uploads: Vec::new(),
        }
    }
}

impl MockPlatform {
    pub fn denying_refresh() -> Self {
        Self {
            deny_refresh: true,
            ..Self::default()
        }
    }

    pub fn with_uploads(count: usize) -> Self {
        let uploads = (0..count)
            .map(|i| VideoSummary {
                id: format!("vid-{i}"),
                title: format!("Video {i}"),
                description: String::new(),
                published_at: None,
            })
            .collect();
        Self {
            uploads,
            ..Self::default()
        }
    }

    fn grant(&self) -> TokenGrant {
        TokenGrant {
            access_token: "granted-token".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
            scope: None,
        }
    }
}

#[async_trait]
impl VideoPlatform for MockPlatform {
    async fn exchange_authorization_code(
        &self,
        _app: &OAuthApp,
        _code: &str,
        _redirect_uri: &str,
    ) -> Result<TokenGrant> {
        self.code_calls.fetch_add(1, Ordering::SeqCst);
        Ok(TokenGrant {
            refresh_token: Some("issued-refresh".to_string()),
            ..self.grant()
        })
    }

    async fn exchange_refresh_token(
        &self,
        _app: &OAuthApp,
        _refresh_token: &str,
    ) -> Result<TokenGrant> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny_refresh {
            return Err(Error::RefreshDenied("invalid_grant".to_string()));
        }
        Ok(TokenGrant {
            access_token: "refreshed-token".to_string(),
            ..self.grant()
        })
    }

    async fn identity_probe(&self, _credential: &Credential) -> Result<ChannelIdentity> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_probe {
            return Err(Error::Api {
                status: 401,
                message: "probe unsupported for this credential".to_string(),
            });
        }
        Ok(ChannelIdentity {
            id: "UC-mock".to_string(),
            title: Some("Mock Channel".to_string()),
        })
    }

    async fn channel_info(&self, _credential: &Credential) -> Result<ChannelInfo> {
        Ok(ChannelInfo {
            id: "UC-mock".to_string(),
            title: "Mock Channel".to_string(),
            uploads_playlist_id: Some("UU-mock".to_string()),
            ..ChannelInfo::default()
        })
    }

    async fn playlist_items(
        &self,
        _credential: &Credential,
        _playlist_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<VideoPage> {
        let start: usize = page_token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let end = (start + max_results as usize).min(self.uploads.len());
        let next_page_token = (end < self.uploads.len()).then(|| end.to_string());
        Ok(VideoPage {
            items: self.uploads[start..end].to_vec(),
            next_page_token,
        })
    }

    async fn search(
        &self,
        _credential: &Credential,
        _query: &str,
        _max_results: u32,
    ) -> Result<Vec<VideoSummary>> {
        Ok(self.uploads.clone())
    }

    async fn video_details(
        &self,
        _credential: &Credential,
        video_id: &str,
    ) -> Result<VideoDetails> {
        Ok(VideoDetails {
            id: video_id.to_string(),
            title: "Mock Video".to_string(),
            ..VideoDetails::default()
        })
    }

    async fn upload_video(
        &self,
        _credential: &Credential,
        _request: &UploadRequest,
        _media: Bytes,
    ) -> Result<UploadReceipt> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        Ok(UploadReceipt {
            video_id: "uploaded-1".to_string(),
        })
    }

    async fn query_report(
        &self,
        _credential: &Credential,
        query: &ReportQuery,
    ) -> Result<Report> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Report {
            column_headers: query.metrics.clone(),
            rows: vec![query.metrics.iter().map(|_| serde_json::json!(1)).collect()],
        })
    }
}

/// Consent broker that hands back a canned code and records the
/// authorization URL it was shown.
pub struct CannedConsent {
    pub code: String,
    pub seen_url: Mutex<Option<String>>,
}

impl CannedConsent {
    pub fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            seen_url: Mutex::new(None),
        }
    }
}

#[async_trait]
impl ConsentBroker for CannedConsent {
    fn redirect_uri(&self) -> String {
        "http://localhost:9999".to_string()
    }

    async fn obtain_code(&self, auth_url: &str) -> Result<String> {
        *self.seen_url.lock() = Some(auth_url.to_string());
        Ok(self.code.clone())
    }
}

/// Consent broker for flows that must never go interactive.
pub struct FailingConsent;

#[async_trait]
impl ConsentBroker for FailingConsent {
    fn redirect_uri(&self) -> String {
        "http://localhost:9999".to_string()
    }

    async fn obtain_code(&self, _auth_url: &str) -> Result<String> {
        Err(Error::AcquisitionFailed(
            "interactive consent not available in this test".to_string(),
        ))
    }
}

/// A minimal client-secrets payload for the delegated strategy.
pub fn write_client_secrets(dir: &std::path::Path) {
    std::fs::write(
        dir.join("client_secrets.json"),
        r#"{"installed":{"client_id":"test-client","client_secret":"test-secret",
            "auth_uri":"https://accounts.example.test/auth",
            "token_uri":"https://oauth2.example.test/token"}}"#,
    )
    .unwrap();
}
