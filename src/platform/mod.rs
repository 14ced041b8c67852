//! Remote video-platform abstraction.
//!
//! The platform is an opaque RPC capability: token exchanges, the identity
//! probe, and the content/analytics operations the session handles delegate
//! to. [`HttpPlatform`] is the production implementation; tests script their
//! own implementations of [`VideoPlatform`].

pub mod http;

use std::collections::BTreeMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

use crate::credential::Credential;
use crate::error::{Error, Result};

pub use http::HttpPlatform;

/// OAuth application descriptor, as distributed in `client_secrets.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    "https://accounts.google.com/o/oauth2/auth".to_string()
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// `client_secrets.json` wraps the descriptor in an `installed` or `web`
/// envelope depending on how the application was registered.
#[derive(Debug, Deserialize)]
struct AppEnvelope {
    installed: Option<OAuthApp>,
    web: Option<OAuthApp>,
}

impl OAuthApp {
    /// Parse a `client_secrets.json` payload, accepting either envelope.
    pub fn from_client_secrets(bytes: &[u8]) -> Result<Self> {
        let envelope: AppEnvelope = serde_json::from_slice(bytes)
            .map_err(|e| Error::Malformed(format!("client secrets: {e}")))?;
        envelope
            .installed
            .or(envelope.web)
            .ok_or_else(|| {
                Error::Malformed(
                    "client secrets: expected an 'installed' or 'web' section".to_string(),
                )
            })
    }
}

/// Result of a token-endpoint exchange.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds from now.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Space-separated scopes actually granted, when the endpoint reports
    /// them.
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenGrant {
    /// Absolute expiry derived from `expires_in`, if present.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs as i64))
    }
}

/// The authorized account/channel behind a credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelIdentity {
    pub id: String,
    pub title: Option<String>,
}

/// Channel description returned by the content surface.
#[derive(Debug, Clone, Default)]
pub struct ChannelInfo {
    pub id: String,
    pub title: String,
    pub description: String,
    pub subscriber_count: Option<u64>,
    pub video_count: Option<u64>,
    pub view_count: Option<u64>,
    /// Playlist holding the channel's uploads, used for listing.
    pub uploads_playlist_id: Option<String>,
}

/// One video in a listing or search result.
#[derive(Debug, Clone)]
pub struct VideoSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// One page of a playlist listing.
#[derive(Debug, Clone)]
pub struct VideoPage {
    pub items: Vec<VideoSummary>,
    pub next_page_token: Option<String>,
}

/// Full statistics for a single video.
#[derive(Debug, Clone, Default)]
pub struct VideoDetails {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    pub comment_count: Option<u64>,
}

/// Visibility of an uploaded video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivacyStatus {
    #[default]
    Private,
    Unlisted,
    Public,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Private => "private",
            PrivacyStatus::Unlisted => "unlisted",
            PrivacyStatus::Public => "public",
        }
    }
}

/// Metadata for a video upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category_id: String,
    pub privacy: PrivacyStatus,
}

impl UploadRequest {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            tags: Vec::new(),
            // "People & Blogs", the platform default used by the uploader
            category_id: "22".to_string(),
            privacy: PrivacyStatus::Private,
        }
    }
}

/// Confirmation of a completed upload.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub video_id: String,
}

/// A query against the analytics reporting surface.
#[derive(Debug, Clone)]
pub struct ReportQuery {
    pub channel_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub metrics: Vec<String>,
    pub dimensions: Option<String>,
    pub filters: Option<String>,
}

/// Tabular analytics result.
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub column_headers: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl Report {
    /// The first row keyed by column header, the shape most single-entity
    /// queries want.
    pub fn first_row_map(&self) -> Option<BTreeMap<String, serde_json::Value>> {
        let row = self.rows.first()?;
        Some(
            self.column_headers
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The remote platform as an opaque capability.
///
/// Implementations own the wire format; callers see typed inputs and
/// outputs only. All methods take the credential by reference — the
/// platform never stores authorization material.
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Exchange an authorization code obtained from user consent for a
    /// token grant.
    async fn exchange_authorization_code(
        &self,
        app: &OAuthApp,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant>;

    /// Exchange a refresh token for a fresh access token. A revoked or
    /// expired refresh token yields [`Error::RefreshDenied`].
    async fn exchange_refresh_token(
        &self,
        app: &OAuthApp,
        refresh_token: &str,
    ) -> Result<TokenGrant>;

    /// Resolve the authorized channel behind a credential.
    async fn identity_probe(&self, credential: &Credential) -> Result<ChannelIdentity>;

    /// Describe the authorized channel.
    async fn channel_info(&self, credential: &Credential) -> Result<ChannelInfo>;

    /// Fetch one page of a playlist.
    async fn playlist_items(
        &self,
        credential: &Credential,
        playlist_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<VideoPage>;

    /// Keyword search for videos.
    async fn search(
        &self,
        credential: &Credential,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<VideoSummary>>;

    /// Fetch details and statistics for one video.
    async fn video_details(&self, credential: &Credential, video_id: &str)
        -> Result<VideoDetails>;

    /// Upload a video: metadata first, then the media bytes.
    async fn upload_video(
        &self,
        credential: &Credential,
        request: &UploadRequest,
        media: Bytes,
    ) -> Result<UploadReceipt>;

    /// Run an analytics report query.
    async fn query_report(&self, credential: &Credential, query: &ReportQuery) -> Result<Report>;
}
