//! HTTP implementation of the platform capability.
//!
//! Owns the remote API's wire format: endpoint layout, query parameters,
//! response envelopes, and per-strategy request authorization (API keys go
//! in the query string, everything else is a bearer token).

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::RequestBuilder;
use serde::Deserialize;
use tracing::debug;

use super::{
    ChannelIdentity, ChannelInfo, OAuthApp, Report, ReportQuery, TokenGrant, UploadReceipt,
    UploadRequest, VideoDetails, VideoPage, VideoPlatform, VideoSummary,
};
use crate::credential::{Credential, StrategyKind};
use crate::error::{Error, Result};

const DATA_BASE: &str = "https://www.googleapis.com/youtube/v3";
const ANALYTICS_BASE: &str = "https://youtubeanalytics.googleapis.com/v2";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/youtube/v3";

/// Production platform adapter backed by `reqwest`.
pub struct HttpPlatform {
    client: reqwest::Client,
    data_base: String,
    analytics_base: String,
    upload_base: String,
}

impl Default for HttpPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpPlatform {
    /// Adapter against the platform's public endpoints.
    pub fn new() -> Self {
        Self::with_endpoints(DATA_BASE, ANALYTICS_BASE, UPLOAD_BASE)
    }

    /// Adapter applying endpoint overrides where present.
    pub fn with_overrides(
        data: Option<&str>,
        analytics: Option<&str>,
        upload: Option<&str>,
    ) -> Self {
        Self::with_endpoints(
            data.unwrap_or(DATA_BASE),
            analytics.unwrap_or(ANALYTICS_BASE),
            upload.unwrap_or(UPLOAD_BASE),
        )
    }

    /// Adapter with overridden endpoint bases (local fixtures, staging).
    pub fn with_endpoints(data: &str, analytics: &str, upload: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            data_base: data.trim_end_matches('/').to_string(),
            analytics_base: analytics.trim_end_matches('/').to_string(),
            upload_base: upload.trim_end_matches('/').to_string(),
        }
    }

    /// Attach the credential to a request. API keys authenticate via the
    /// `key` query parameter; all other material is a bearer token.
    fn authorize(&self, request: RequestBuilder, credential: &Credential) -> RequestBuilder {
        match credential.strategy {
            StrategyKind::StaticKey => {
                request.query(&[("key", credential.access_material.as_str())])
            }
            _ => request.bearer_auth(&credential.access_material),
        }
    }

    async fn send_checked(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response)
    }

    async fn token_request(
        &self,
        token_uri: &str,
        params: &[(&str, &str)],
        is_refresh: bool,
    ) -> Result<TokenGrant> {
        let response = self.client.post(token_uri).form(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // invalid_grant means the refresh token is revoked or expired;
            // the caller falls through to full acquisition
            if is_refresh && (status.as_u16() == 400 || status.as_u16() == 401) {
                return Err(Error::RefreshDenied(format!("{status}: {body}")));
            }
            return Err(Error::AcquisitionFailed(format!(
                "token endpoint returned {status}: {body}"
            )));
        }
        response
            .json::<TokenGrant>()
            .await
            .map_err(|e| Error::Malformed(format!("token response: {e}")))
    }
}

#[async_trait]
impl VideoPlatform for HttpPlatform {
    async fn exchange_authorization_code(
        &self,
        app: &OAuthApp,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant> {
        debug!("exchanging authorization code at {}", app.token_uri);
        self.token_request(
            &app.token_uri,
            &[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", app.client_id.as_str()),
                ("client_secret", app.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
            ],
            false,
        )
        .await
    }

    async fn exchange_refresh_token(
        &self,
        app: &OAuthApp,
        refresh_token: &str,
    ) -> Result<TokenGrant> {
        debug!("exchanging refresh token at {}", app.token_uri);
        self.token_request(
            &app.token_uri,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", app.client_id.as_str()),
                ("client_secret", app.client_secret.as_str()),
            ],
            true,
        )
        .await
    }

    async fn identity_probe(&self, credential: &Credential) -> Result<ChannelIdentity> {
        let request = self
            .client
            .get(format!("{}/channels", self.data_base))
            .query(&[("part", "id,snippet"), ("mine", "true")]);
        let response = self.send_checked(self.authorize(request, credential)).await?;

        let envelope: ListEnvelope<ChannelResource> = response
            .json()
            .await
            .map_err(|e| Error::Malformed(format!("channel list: {e}")))?;
        let channel = envelope
            .items
            .into_iter()
            .next()
            .ok_or_else(|| Error::Malformed("no channel for authorized account".to_string()))?;

        Ok(ChannelIdentity {
            id: channel.id,
            title: channel.snippet.and_then(|s| s.title),
        })
    }

    async fn channel_info(&self, credential: &Credential) -> Result<ChannelInfo> {
        let request = self
            .client
            .get(format!("{}/channels", self.data_base))
            .query(&[
                ("part", "snippet,statistics,contentDetails"),
                ("mine", "true"),
            ]);
        let response = self.send_checked(self.authorize(request, credential)).await?;

        let envelope: ListEnvelope<ChannelResource> = response
            .json()
            .await
            .map_err(|e| Error::Malformed(format!("channel list: {e}")))?;
        let channel = envelope
            .items
            .into_iter()
            .next()
            .ok_or_else(|| Error::Malformed("no channel for authorized account".to_string()))?;

        let snippet = channel.snippet.unwrap_or_default();
        let stats = channel.statistics.unwrap_or_default();
        Ok(ChannelInfo {
            id: channel.id,
            title: snippet.title.unwrap_or_default(),
            description: snippet.description.unwrap_or_default(),
            subscriber_count: parse_count(stats.subscriber_count),
            video_count: parse_count(stats.video_count),
            view_count: parse_count(stats.view_count),
            uploads_playlist_id: channel
                .content_details
                .and_then(|d| d.related_playlists)
                .and_then(|p| p.uploads),
        })
    }

    async fn playlist_items(
        &self,
        credential: &Credential,
        playlist_id: &str,
        page_token: Option<&str>,
        max_results: u32,
    ) -> Result<VideoPage> {
        let max = max_results.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("playlistId", playlist_id),
            ("maxResults", max.as_str()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        let request = self
            .client
            .get(format!("{}/playlistItems", self.data_base))
            .query(&query);
        let response = self.send_checked(self.authorize(request, credential)).await?;

        let envelope: ListEnvelope<PlaylistItemResource> = response
            .json()
            .await
            .map_err(|e| Error::Malformed(format!("playlist items: {e}")))?;

        let items = envelope
            .items
            .into_iter()
            .filter_map(|item| {
                let snippet = item.snippet?;
                let id = snippet.resource_id.and_then(|r| r.video_id)?;
                Some(VideoSummary {
                    id,
                    title: snippet.title.unwrap_or_default(),
                    description: snippet.description.unwrap_or_default(),
                    published_at: snippet.published_at,
                })
            })
            .collect();

        Ok(VideoPage {
            items,
            next_page_token: envelope.next_page_token,
        })
    }

    async fn search(
        &self,
        credential: &Credential,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<VideoSummary>> {
        let max = max_results.to_string();
        let request = self
            .client
            .get(format!("{}/search", self.data_base))
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", max.as_str()),
            ]);
        let response = self.send_checked(self.authorize(request, credential)).await?;

        let envelope: ListEnvelope<SearchResource> = response
            .json()
            .await
            .map_err(|e| Error::Malformed(format!("search results: {e}")))?;

        Ok(envelope
            .items
            .into_iter()
            .filter_map(|item| {
                let id = item.id.and_then(|i| i.video_id)?;
                let snippet = item.snippet.unwrap_or_default();
                Some(VideoSummary {
                    id,
                    title: snippet.title.unwrap_or_default(),
                    description: snippet.description.unwrap_or_default(),
                    published_at: snippet.published_at,
                })
            })
            .collect())
    }

    async fn video_details(
        &self,
        credential: &Credential,
        video_id: &str,
    ) -> Result<VideoDetails> {
        let request = self
            .client
            .get(format!("{}/videos", self.data_base))
            .query(&[("part", "snippet,statistics"), ("id", video_id)]);
        let response = self.send_checked(self.authorize(request, credential)).await?;

        let envelope: ListEnvelope<VideoResource> = response
            .json()
            .await
            .map_err(|e| Error::Malformed(format!("video list: {e}")))?;
        let video = envelope
            .items
            .into_iter()
            .next()
            .ok_or_else(|| Error::Malformed(format!("no video with id {video_id}")))?;

        let snippet = video.snippet.unwrap_or_default();
        let stats = video.statistics.unwrap_or_default();
        Ok(VideoDetails {
            id: video.id,
            title: snippet.title.unwrap_or_default(),
            description: snippet.description.unwrap_or_default(),
            tags: snippet.tags.unwrap_or_default(),
            view_count: parse_count(stats.view_count),
            like_count: parse_count(stats.like_count),
            comment_count: parse_count(stats.comment_count),
        })
    }

    async fn upload_video(
        &self,
        credential: &Credential,
        request: &UploadRequest,
        media: Bytes,
    ) -> Result<UploadReceipt> {
        // Resumable protocol: register the metadata, then PUT the media
        // bytes to the session URL the platform hands back.
        let body = serde_json::json!({
            "snippet": {
                "title": request.title,
                "description": request.description,
                "tags": request.tags,
                "categoryId": request.category_id,
            },
            "status": {
                "privacyStatus": request.privacy.as_str(),
            },
        });

        let initiate = self
            .client
            .post(format!("{}/videos", self.upload_base))
            .query(&[("uploadType", "resumable"), ("part", "snippet,status")])
            .json(&body);
        let response = self.send_checked(self.authorize(initiate, credential)).await?;

        let session_url = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                Error::Malformed("upload initiation returned no session URL".to_string())
            })?;

        debug!(bytes = media.len(), "uploading media");
        let put = self
            .client
            .put(&session_url)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(media);
        let response = self.send_checked(self.authorize(put, credential)).await?;

        let uploaded: UploadedResource = response
            .json()
            .await
            .map_err(|e| Error::Malformed(format!("upload response: {e}")))?;
        Ok(UploadReceipt {
            video_id: uploaded.id,
        })
    }

    async fn query_report(&self, credential: &Credential, query: &ReportQuery) -> Result<Report> {
        let ids = format!("channel=={}", query.channel_id);
        let start = query.start_date.format("%Y-%m-%d").to_string();
        let end = query.end_date.format("%Y-%m-%d").to_string();
        let metrics = query.metrics.join(",");

        let mut params = vec![
            ("ids", ids.as_str()),
            ("startDate", start.as_str()),
            ("endDate", end.as_str()),
            ("metrics", metrics.as_str()),
        ];
        if let Some(dimensions) = query.dimensions.as_deref() {
            params.push(("dimensions", dimensions));
        }
        if let Some(filters) = query.filters.as_deref() {
            params.push(("filters", filters));
        }

        let request = self
            .client
            .get(format!("{}/reports", self.analytics_base))
            .query(&params);
        let response = self.send_checked(self.authorize(request, credential)).await?;

        let raw: ReportResponse = response
            .json()
            .await
            .map_err(|e| Error::Malformed(format!("report response: {e}")))?;
        Ok(Report {
            column_headers: raw
                .column_headers
                .into_iter()
                .map(|h| h.name)
                .collect(),
            rows: raw.rows.unwrap_or_default(),
        })
    }
}

fn parse_count(value: Option<String>) -> Option<u64> {
    value.and_then(|v| v.parse().ok())
}

// ---------------------------------------------------------------------------
// Wire envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelResource {
    id: String,
    snippet: Option<ChannelSnippet>,
    statistics: Option<ChannelStatistics>,
    content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct ChannelSnippet {
    title: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelStatistics {
    subscriber_count: Option<String>,
    video_count: Option<String>,
    view_count: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelContentDetails {
    related_playlists: Option<RelatedPlaylists>,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemResource {
    snippet: Option<PlaylistItemSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlaylistItemSnippet {
    title: Option<String>,
    description: Option<String>,
    published_at: Option<DateTime<Utc>>,
    resource_id: Option<ResourceId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResource {
    id: Option<SearchId>,
    snippet: Option<SearchSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchSnippet {
    title: Option<String>,
    description: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
    snippet: Option<VideoSnippet>,
    statistics: Option<VideoStatistics>,
}

#[derive(Debug, Default, Deserialize)]
struct VideoSnippet {
    title: Option<String>,
    description: Option<String>,
    tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoStatistics {
    view_count: Option<String>,
    like_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadedResource {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportResponse {
    #[serde(default = "Vec::new")]
    column_headers: Vec<ColumnHeader>,
    rows: Option<Vec<Vec<serde_json::Value>>>,
}

#[derive(Debug, Deserialize)]
struct ColumnHeader {
    name: String,
}
