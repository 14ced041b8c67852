//! Authentication strategies.
//!
//! Each strategy knows how to produce a fresh credential and how to judge
//! an existing one. The resolver drives the shared restore → validate →
//! refresh → acquire ladder; strategies only supply the per-kind pieces.

pub mod api_key;
pub mod oauth;
pub mod service_account;

use std::collections::BTreeSet;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::credential::{Credential, StrategyKind, Validation};
use crate::error::{Error, Result};
use crate::store::CredentialStore;

pub use api_key::StaticKeyStrategy;
pub use oauth::{CallbackConsent, CancelHandle, ConsentBroker, DelegatedStrategy, ManualConsent};
pub use service_account::ServiceIdentityStrategy;

/// Static description of one strategy's configuration needs.
#[derive(Debug, Clone)]
pub struct StrategyDescriptor {
    pub kind: StrategyKind,
    /// Paths that must exist for the strategy to be attemptable.
    pub required_files: Vec<PathBuf>,
    /// Scopes granted when this strategy succeeds.
    pub capability_scopes: BTreeSet<String>,
    /// Whether acquisition may block on human input.
    pub interactive: bool,
}

/// One method of producing and maintaining a credential.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn descriptor(&self) -> StrategyDescriptor;

    /// Whether the strategy's static inputs are present. Existence checks
    /// only; no reads, no network.
    fn is_attemptable(&self) -> bool;

    /// Load a previously persisted credential. Never blocks on input,
    /// never prompts. Mismatched or undecodable blobs read as absent.
    fn restore(&self, store: &CredentialStore) -> Result<Option<Credential>> {
        restore_credential(store, self.kind())
    }

    /// Local validation: expiry and structural well-formedness.
    fn validate(&self, credential: &Credential) -> Validation {
        credential.validation()
    }

    /// Exchange refresh material for fresh access material. One network
    /// round trip; strategies without refresh material deny.
    async fn refresh(&self, _credential: &Credential) -> Result<Credential> {
        Err(Error::RefreshDenied(format!(
            "{} credentials cannot be refreshed",
            self.kind()
        )))
    }

    /// Produce a brand-new credential. May suspend on user consent for
    /// interactive strategies.
    async fn acquire(&self) -> Result<Credential>;
}

/// Decode the persisted blob for `kind`. Blobs that fail to decode or
/// belong to a different strategy are treated as absent, not as errors.
pub(crate) fn restore_credential(
    store: &CredentialStore,
    kind: StrategyKind,
) -> Result<Option<Credential>> {
    let Some(bytes) = store.load(kind)? else {
        return Ok(None);
    };
    match Credential::decode(&bytes) {
        Ok(credential) if credential.strategy == kind => Ok(Some(credential)),
        Ok(credential) => {
            debug!(
                expected = %kind,
                found = %credential.strategy,
                "stored blob belongs to another strategy, ignoring"
            );
            Ok(None)
        }
        Err(e) => {
            debug!(strategy = %kind, error = %e, "discarding undecodable credential blob");
            Ok(None)
        }
    }
}
