//! Content-surface operations: channel data, listings, search, upload.

use std::pin::Pin;

use async_stream::try_stream;
use bytes::Bytes;
use futures::Stream;
use tracing::info;

use crate::credential::Capability;
use crate::error::{Error, Result};
use crate::platform::{ChannelInfo, UploadReceipt, UploadRequest, VideoDetails, VideoSummary};
use crate::session::Session;

/// Page size for playlist walks, the platform maximum.
const LIST_PAGE_SIZE: usize = 50;

/// Stream of videos across playlist pages.
pub type VideoStream<'a> = Pin<Box<dyn Stream<Item = Result<VideoSummary>> + Send + 'a>>;

/// Handle for the content API surface. Borrows the session's credential.
pub struct ContentApi<'a> {
    session: &'a Session,
}

impl<'a> ContentApi<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Describe the authorized channel.
    pub async fn channel_info(&self) -> Result<ChannelInfo> {
        self.session
            .require_capability("channel_info", Capability::ContentRead)?;
        self.session
            .platform()
            .channel_info(self.session.credential())
            .await
    }

    /// Recent uploads, newest first, walking playlist pages as the stream
    /// is consumed. At most `limit` videos are yielded.
    pub fn recent_uploads(&self, limit: usize) -> VideoStream<'a> {
        let session = self.session;
        Box::pin(try_stream! {
            session.require_capability("recent_uploads", Capability::ContentRead)?;

            let info = session.platform().channel_info(session.credential()).await?;
            let playlist = info.uploads_playlist_id.ok_or_else(|| {
                Error::Malformed("channel has no uploads playlist".to_string())
            })?;

            let mut remaining = limit;
            let mut page_token: Option<String> = None;
            while remaining > 0 {
                let batch = remaining.min(LIST_PAGE_SIZE) as u32;
                let page = session
                    .platform()
                    .playlist_items(
                        session.credential(),
                        &playlist,
                        page_token.as_deref(),
                        batch,
                    )
                    .await?;

                for video in page.items {
                    if remaining == 0 {
                        break;
                    }
                    remaining -= 1;
                    yield video;
                }

                match page.next_page_token {
                    Some(token) if remaining > 0 => page_token = Some(token),
                    _ => break,
                }
            }
        })
    }

    /// Keyword search for videos.
    pub async fn search(&self, query: &str, limit: u32) -> Result<Vec<VideoSummary>> {
        self.session
            .require_capability("search", Capability::ContentRead)?;
        self.session
            .platform()
            .search(self.session.credential(), query, limit)
            .await
    }

    /// Details and statistics for one video.
    pub async fn video_details(&self, video_id: &str) -> Result<VideoDetails> {
        self.session
            .require_capability("video_details", Capability::ContentRead)?;
        self.session
            .platform()
            .video_details(self.session.credential(), video_id)
            .await
    }

    /// Upload a video: metadata plus media bytes.
    pub async fn upload(&self, request: &UploadRequest, media: Bytes) -> Result<UploadReceipt> {
        self.session
            .require_capability("upload", Capability::ContentWrite)?;
        info!(title = %request.title, bytes = media.len(), "uploading video");
        let receipt = self
            .session
            .platform()
            .upload_video(self.session.credential(), request, media)
            .await?;
        info!(video_id = %receipt.video_id, "upload complete");
        Ok(receipt)
    }
}
