//! Static-key strategy.
//!
//! A pre-issued API key, read from `api_key.txt` or supplied inline
//! through configuration. Acquisition is a local read; the key has no
//! expiry and is assumed valid until a downstream call fails. The grant
//! is read-only: never analytics, never write.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use super::{Strategy, StrategyDescriptor};
use crate::credential::{scopes, Credential, StrategyKind};
use crate::error::{Error, Result};

pub struct StaticKeyStrategy {
    key_path: PathBuf,
    inline_key: Option<String>,
}

impl StaticKeyStrategy {
    pub fn new(key_path: PathBuf, inline_key: Option<String>) -> Self {
        Self {
            key_path,
            inline_key: inline_key.filter(|k| !k.trim().is_empty()),
        }
    }

    fn read_key(&self) -> Result<String> {
        if let Some(key) = &self.inline_key {
            return Ok(key.trim().to_string());
        }
        let raw = std::fs::read_to_string(&self.key_path).map_err(|e| {
            Error::ConfigurationMissing(format!(
                "API key at {}: {e}",
                self.key_path.display()
            ))
        })?;
        let key = raw.trim().to_string();
        if key.is_empty() {
            return Err(Error::AcquisitionFailed(format!(
                "API key file {} is empty",
                self.key_path.display()
            )));
        }
        Ok(key)
    }
}

#[async_trait]
impl Strategy for StaticKeyStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::StaticKey
    }

    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            kind: StrategyKind::StaticKey,
            required_files: if self.inline_key.is_some() {
                Vec::new()
            } else {
                vec![self.key_path.clone()]
            },
            capability_scopes: [scopes::READONLY.to_string()].into_iter().collect(),
            interactive: false,
        }
    }

    fn is_attemptable(&self) -> bool {
        self.inline_key.is_some() || self.key_path.exists()
    }

    async fn acquire(&self) -> Result<Credential> {
        let key = self.read_key()?;
        info!("using static API key");
        Ok(Credential {
            strategy: StrategyKind::StaticKey,
            access_material: key,
            expiry: None,
            refresh_material: None,
            granted_scopes: [scopes::READONLY.to_string()].into_iter().collect(),
        })
    }
}
