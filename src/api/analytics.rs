//! Analytics-surface operations: channel, video, and revenue reports.

use chrono::{Duration, Utc};

use crate::credential::Capability;
use crate::error::Result;
use crate::platform::{Report, ReportQuery};
use crate::session::Session;

/// Metric sets preserved from the reporting clients this crate replaces.
const CHANNEL_METRICS: &[&str] = &[
    "views",
    "likes",
    "dislikes",
    "comments",
    "shares",
    "estimatedMinutesWatched",
    "averageViewDuration",
    "subscribersGained",
    "subscribersLost",
];

const VIDEO_METRICS: &[&str] = &[
    "views",
    "likes",
    "dislikes",
    "comments",
    "shares",
    "estimatedMinutesWatched",
    "averageViewDuration",
];

const REVENUE_METRICS: &[&str] = &[
    "estimatedRevenue",
    "estimatedAdRevenue",
    "estimatedRedPartnerRevenue",
    "grossRevenue",
    "cpm",
    "playbackBasedCpm",
];

/// Handle for the analytics API surface. Borrows the session's
/// credential; every report needs the channel identity.
pub struct AnalyticsApi<'a> {
    session: &'a Session,
}

impl<'a> AnalyticsApi<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    fn build_query(
        &self,
        metrics: &[&str],
        days: u32,
        dimensions: Option<&str>,
        filters: Option<String>,
    ) -> Result<ReportQuery> {
        let channel = self.session.require_channel()?;
        let end_date = Utc::now().date_naive();
        let start_date = end_date - Duration::days(days as i64);
        Ok(ReportQuery {
            channel_id: channel.id.clone(),
            start_date,
            end_date,
            metrics: metrics.iter().map(|m| m.to_string()).collect(),
            dimensions: dimensions.map(str::to_string),
            filters,
        })
    }

    /// Channel-wide report over the trailing `days`.
    pub async fn channel_report(&self, days: u32) -> Result<Report> {
        self.session
            .require_capability("channel_report", Capability::AnalyticsRead)?;
        let query = self.build_query(CHANNEL_METRICS, days, None, None)?;
        self.session
            .platform()
            .query_report(self.session.credential(), &query)
            .await
    }

    /// Per-video report over the trailing `days`.
    pub async fn video_report(&self, video_id: &str, days: u32) -> Result<Report> {
        self.session
            .require_capability("video_report", Capability::AnalyticsRead)?;
        let query = self.build_query(
            VIDEO_METRICS,
            days,
            Some("video"),
            Some(format!("video=={video_id}")),
        )?;
        self.session
            .platform()
            .query_report(self.session.credential(), &query)
            .await
    }

    /// Revenue report over the trailing `days`. Empty for channels
    /// without monetization.
    pub async fn revenue_report(&self, days: u32) -> Result<Report> {
        self.session
            .require_capability("revenue_report", Capability::AnalyticsRead)?;
        let query = self.build_query(REVENUE_METRICS, days, None, None)?;
        self.session
            .platform()
            .query_report(self.session.credential(), &query)
            .await
    }
}
