//! Credential material, strategy kinds, and capability semantics.
//!
//! A [`Credential`] is the opaque authorization material produced by one
//! strategy: an access token or signed assertion, an optional expiry, an
//! optional refresh token, and the scope set the remote platform granted.
//! Capabilities are derived from scopes through a static mapping so the
//! session layer can gate operations without interpreting scope strings
//! everywhere.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Leeway applied before the recorded expiry when judging freshness
/// (60 seconds). A token about to expire mid-request is treated as
/// already expired.
pub const EXPIRY_LEEWAY_SECS: i64 = 60;

/// OAuth scope strings understood by the capability mapping.
pub mod scopes {
    pub const READONLY: &str = "https://www.googleapis.com/auth/youtube.readonly";
    pub const MANAGE: &str = "https://www.googleapis.com/auth/youtube";
    pub const UPLOAD: &str = "https://www.googleapis.com/auth/youtube.upload";
    pub const ANALYTICS: &str = "https://www.googleapis.com/auth/yt-analytics.readonly";
    pub const ANALYTICS_MONETARY: &str =
        "https://www.googleapis.com/auth/yt-analytics-monetary.readonly";

    /// Full scope set requested by default for strategies that can grant
    /// any subset.
    pub fn full() -> Vec<String> {
        vec![
            READONLY.to_string(),
            MANAGE.to_string(),
            UPLOAD.to_string(),
            ANALYTICS.to_string(),
            ANALYTICS_MONETARY.to_string(),
        ]
    }
}

/// One method of obtaining authorization.
///
/// Declaration order is the default preference order for automatic
/// resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Interactive user-consent OAuth flow; refresh-token capable.
    Delegated,
    /// Static API key; non-interactive, read-only.
    StaticKey,
    /// Service-account key file; non-interactive, full capability.
    ServiceIdentity,
}

impl StrategyKind {
    /// Default preference order for automatic resolution.
    pub const AUTO_ORDER: [StrategyKind; 3] = [
        StrategyKind::Delegated,
        StrategyKind::StaticKey,
        StrategyKind::ServiceIdentity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Delegated => "delegated",
            StrategyKind::StaticKey => "static_key",
            StrategyKind::ServiceIdentity => "service_identity",
        }
    }

    /// Well-known file name of the persisted credential blob for this
    /// strategy, relative to the credentials directory.
    pub fn token_file_name(&self) -> &'static str {
        match self {
            StrategyKind::Delegated => "token.json",
            StrategyKind::StaticKey => "token.api_key.json",
            StrategyKind::ServiceIdentity => "token.service_account.json",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of local credential validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// Usable as-is.
    Valid,
    /// Past expiry (or inside the leeway window); may be refreshable.
    Expired,
    /// Structurally unusable; must be re-acquired.
    Invalid,
}

/// Opaque authorization material for one strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    /// Strategy that produced this credential.
    pub strategy: StrategyKind,
    /// Access token, API key, or signed assertion.
    pub access_material: String,
    /// Expiry timestamp; absent for material without a local lifetime
    /// (validity is then assumed until a downstream call fails).
    pub expiry: Option<DateTime<Utc>>,
    /// Refresh token; present only for delegated authorization.
    pub refresh_material: Option<String>,
    /// Scopes the platform actually granted.
    pub granted_scopes: BTreeSet<String>,
}

impl Credential {
    /// True when the expiry (minus leeway) is still in the future, or when
    /// there is no local expiry to check.
    pub fn is_fresh(&self) -> bool {
        match self.expiry {
            Some(expiry) => Utc::now() + Duration::seconds(EXPIRY_LEEWAY_SECS) < expiry,
            None => true,
        }
    }

    /// Local validation: expiry and structural well-formedness only.
    pub fn validation(&self) -> Validation {
        if self.access_material.is_empty() {
            return Validation::Invalid;
        }
        if self.is_fresh() {
            Validation::Valid
        } else {
            Validation::Expired
        }
    }

    /// Capability set derived from the granted scopes.
    pub fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::from_scopes(self.granted_scopes.iter().map(String::as_str))
    }

    /// Serialize for the credential store.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| Error::Store(e.to_string()))
    }

    /// Deserialize a credential store blob.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::Malformed(format!("credential blob: {e}")))
    }
}

/// A named permission granted by a credential's scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ContentRead,
    ContentWrite,
    AnalyticsRead,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::ContentRead => "content-read",
            Capability::ContentWrite => "content-write",
            Capability::AnalyticsRead => "analytics-read",
        };
        f.write_str(name)
    }
}

/// Capabilities granted by the active credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    /// Can read channel and video data.
    pub content_read: bool,
    /// Can mutate channel content (uploads, metadata edits).
    pub content_write: bool,
    /// Can query the analytics reporting surface.
    pub analytics_read: bool,
}

impl CapabilitySet {
    /// Full capabilities.
    pub fn full() -> Self {
        Self {
            content_read: true,
            content_write: true,
            analytics_read: true,
        }
    }

    /// Read-only capabilities (the static-key grant).
    pub fn read_only() -> Self {
        Self {
            content_read: true,
            content_write: false,
            analytics_read: false,
        }
    }

    /// Derive capabilities from scope strings. Unknown scopes are ignored.
    pub fn from_scopes<'a>(scopes: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = Self::default();
        for scope in scopes {
            match scope {
                scopes::READONLY => set.content_read = true,
                scopes::MANAGE => {
                    set.content_read = true;
                    set.content_write = true;
                }
                scopes::UPLOAD => set.content_write = true,
                scopes::ANALYTICS | scopes::ANALYTICS_MONETARY => set.analytics_read = true,
                _ => {}
            }
        }
        set
    }

    pub fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::ContentRead => self.content_read,
            Capability::ContentWrite => self.content_write,
            Capability::AnalyticsRead => self.analytics_read,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.content_read || self.content_write || self.analytics_read)
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.content_read {
            names.push("content-read");
        }
        if self.content_write {
            names.push("content-write");
        }
        if self.analytics_read {
            names.push("analytics-read");
        }
        if names.is_empty() {
            f.write_str("(none)")
        } else {
            f.write_str(&names.join(", "))
        }
    }
}
