//! Resolved sessions and capability gating.
//!
//! A session exclusively owns the credential the resolver produced. The
//! service handles hand out borrows of it — they cannot outlive the
//! session — and every capability-specific operation is gated on the
//! granted scope set before anything touches the network.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::api::{AnalyticsApi, ContentApi};
use crate::credential::{Capability, CapabilitySet, Credential, StrategyKind};
use crate::error::{Error, Result};
use crate::platform::{ChannelIdentity, VideoPlatform};

pub struct Session {
    strategy: StrategyKind,
    credential: Credential,
    capabilities: CapabilitySet,
    channel: Option<ChannelIdentity>,
    platform: Arc<dyn VideoPlatform>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("strategy", &self.strategy)
            .field("credential", &self.credential)
            .field("capabilities", &self.capabilities)
            .field("channel", &self.channel)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Build a session from a resolved credential: derive the capability
    /// set and run the one identity probe. Probe failure is not fatal —
    /// the session comes back identity-less and operations that need the
    /// channel fail with [`Error::IdentityUnavailable`] at first use.
    pub async fn establish(
        credential: Credential,
        strategy: StrategyKind,
        platform: Arc<dyn VideoPlatform>,
    ) -> Session {
        let capabilities = credential.capabilities();
        let channel = match platform.identity_probe(&credential).await {
            Ok(identity) => {
                debug!(channel = %identity.id, "resolved channel identity");
                Some(identity)
            }
            Err(e) => {
                warn!(error = %e, "identity probe failed, continuing without channel identity");
                None
            }
        };

        Session {
            strategy,
            credential,
            capabilities,
            channel,
            platform,
        }
    }

    /// The strategy that produced this session's credential.
    pub fn active_strategy(&self) -> StrategyKind {
        self.strategy
    }

    pub fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// The authorized channel, when the identity probe succeeded.
    pub fn channel_identity(&self) -> Option<&ChannelIdentity> {
        self.channel.as_ref()
    }

    /// Content-surface handle, constructed on access.
    pub fn content(&self) -> ContentApi<'_> {
        ContentApi::new(self)
    }

    /// Analytics-surface handle, constructed on access.
    pub fn analytics(&self) -> AnalyticsApi<'_> {
        AnalyticsApi::new(self)
    }

    pub(crate) fn credential(&self) -> &Credential {
        &self.credential
    }

    pub(crate) fn platform(&self) -> &dyn VideoPlatform {
        self.platform.as_ref()
    }

    pub(crate) fn require_capability(
        &self,
        operation: &str,
        capability: Capability,
    ) -> Result<()> {
        if self.capabilities.contains(capability) {
            Ok(())
        } else {
            Err(Error::CapabilityDenied {
                operation: operation.to_string(),
                capability,
            })
        }
    }

    pub(crate) fn require_channel(&self) -> Result<&ChannelIdentity> {
        self.channel.as_ref().ok_or(Error::IdentityUnavailable)
    }
}
