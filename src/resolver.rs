//! Strategy resolution.
//!
//! One resolver replaces the per-strategy control flow the original
//! clients each carried: an ordered strategy list, a shared
//! restore → validate → refresh-once → acquire ladder, and a per-strategy
//! failure ledger. The first strategy producing a valid credential wins;
//! later strategies are never attempted, even if they would grant broader
//! capability.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::credential::{Credential, StrategyKind, Validation};
use crate::error::{Error, Result, StrategyFailure};
use crate::platform::VideoPlatform;
use crate::session::Session;
use crate::store::CredentialStore;
use crate::strategy::{
    ConsentBroker, DelegatedStrategy, ServiceIdentityStrategy, StaticKeyStrategy, Strategy,
    StrategyDescriptor,
};

pub struct SessionResolver {
    strategies: Vec<Box<dyn Strategy>>,
    store: CredentialStore,
    platform: Arc<dyn VideoPlatform>,
}

impl SessionResolver {
    /// Build the resolver from configuration. `consent` is the suspension
    /// point interactive acquisition blocks on; non-interactive setups can
    /// pass a broker that simply fails.
    pub fn from_config(
        config: &Config,
        platform: Arc<dyn VideoPlatform>,
        consent: Arc<dyn ConsentBroker>,
    ) -> Self {
        let strategies = config
            .auth
            .method
            .strategy_order()
            .into_iter()
            .map(|kind| -> Box<dyn Strategy> {
                match kind {
                    StrategyKind::Delegated => Box::new(DelegatedStrategy::new(
                        config.client_secrets_path(),
                        config.auth.scopes.clone(),
                        platform.clone(),
                        consent.clone(),
                    )),
                    StrategyKind::StaticKey => Box::new(StaticKeyStrategy::new(
                        config.api_key_path(),
                        config.auth.api_key.clone(),
                    )),
                    StrategyKind::ServiceIdentity => Box::new(ServiceIdentityStrategy::new(
                        config.service_account_path(),
                        config.auth.scopes.clone(),
                    )),
                }
            })
            .collect();

        Self {
            strategies,
            store: CredentialStore::new(&config.credentials_dir),
            platform,
        }
    }

    /// Resolver over an explicit strategy list (embedders, tests).
    pub fn new(
        strategies: Vec<Box<dyn Strategy>>,
        store: CredentialStore,
        platform: Arc<dyn VideoPlatform>,
    ) -> Self {
        Self {
            strategies,
            store,
            platform,
        }
    }

    /// The store this resolver persists credentials into.
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Produce an authorized session, or fail with the per-strategy cause
    /// list once every strategy is exhausted.
    pub async fn resolve(&self) -> Result<Session> {
        let mut failures = Vec::new();

        for strategy in &self.strategies {
            let kind = strategy.kind();
            if !strategy.is_attemptable() {
                debug!(strategy = %kind, "strategy not attemptable, skipping");
                failures.push(StrategyFailure {
                    strategy: kind,
                    error: Error::ConfigurationMissing(describe_missing(&strategy.descriptor())),
                });
                continue;
            }

            match self.attempt(strategy.as_ref()).await {
                Ok(credential) => {
                    info!(strategy = %kind, "authentication strategy succeeded");
                    return Ok(Session::establish(credential, kind, self.platform.clone()).await);
                }
                Err(error) => {
                    warn!(strategy = %kind, %error, "authentication strategy failed");
                    failures.push(StrategyFailure {
                        strategy: kind,
                        error,
                    });
                }
            }
        }

        Err(Error::NoStrategySucceeded(failures))
    }

    /// The restore → validate → refresh-once → acquire ladder for one
    /// strategy.
    async fn attempt(&self, strategy: &dyn Strategy) -> Result<Credential> {
        if let Some(existing) = strategy.restore(&self.store)? {
            match strategy.validate(&existing) {
                Validation::Valid => {
                    debug!(strategy = %strategy.kind(), "restored credential is valid");
                    return Ok(existing);
                }
                Validation::Expired if existing.refresh_material.is_some() => {
                    debug!(strategy = %strategy.kind(), "restored credential expired, refreshing");
                    match strategy.refresh(&existing).await {
                        Ok(refreshed) => {
                            self.persist(&refreshed);
                            return Ok(refreshed);
                        }
                        Err(Error::RefreshDenied(reason)) => {
                            debug!(
                                strategy = %strategy.kind(),
                                %reason,
                                "refresh denied, falling back to acquisition"
                            );
                        }
                        // Refresh is attempted at most once; transient
                        // failures surface as this strategy's failure
                        Err(other) => return Err(other),
                    }
                }
                Validation::Expired | Validation::Invalid => {
                    debug!(
                        strategy = %strategy.kind(),
                        "discarding unusable stored credential"
                    );
                }
            }
        }

        let acquired = strategy.acquire().await?;
        self.persist(&acquired);
        Ok(acquired)
    }

    fn persist(&self, credential: &Credential) {
        let result = credential
            .encode()
            .and_then(|bytes| self.store.save(credential.strategy, &bytes));
        if let Err(e) = result {
            // A valid in-memory credential outlives a failed disk write;
            // the next resolution simply re-acquires
            warn!(
                strategy = %credential.strategy,
                error = %e,
                "failed to persist credential"
            );
        }
    }
}

fn describe_missing(descriptor: &StrategyDescriptor) -> String {
    if descriptor.required_files.is_empty() {
        return format!("{} strategy has no usable inputs", descriptor.kind);
    }
    let names: Vec<String> = descriptor
        .required_files
        .iter()
        .map(|p| p.display().to_string())
        .collect();
    format!("required file(s) not present: {}", names.join(", "))
}
