//! End-to-end resolution flows against a scripted platform.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use common::{write_client_secrets, CannedConsent, FailingConsent, MockPlatform};
use yt_session::config::Config;
use yt_session::credential::{scopes, CapabilitySet, Credential, StrategyKind};
use yt_session::error::{Error, Result};
use yt_session::resolver::SessionResolver;
use yt_session::store::CredentialStore;
use yt_session::strategy::{Strategy, StrategyDescriptor};

fn config_for(dir: &std::path::Path) -> Config {
    let yaml = format!("credentials_dir: {}\n", dir.display());
    Config::from_str(&yaml).unwrap()
}

fn delegated_credential(expired: bool, refresh: Option<&str>) -> Credential {
    let offset = if expired {
        -Duration::hours(1)
    } else {
        Duration::hours(1)
    };
    Credential {
        strategy: StrategyKind::Delegated,
        access_material: "cached-token".to_string(),
        expiry: Some(Utc::now() + offset),
        refresh_material: refresh.map(str::to_string),
        granted_scopes: scopes::full().into_iter().collect(),
    }
}

#[tokio::test]
async fn test_empty_directory_exhausts_all_strategies() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_for(dir.path());
    let platform = Arc::new(MockPlatform::default());
    let resolver =
        SessionResolver::from_config(&config, platform.clone(), Arc::new(FailingConsent));

    let err = resolver.resolve().await.unwrap_err();
    match err {
        Error::NoStrategySucceeded(causes) => {
            assert_eq!(causes.len(), 3);
            assert!(causes.iter().all(|c| c.error.is_configuration_missing()));
            let kinds: Vec<_> = causes.iter().map(|c| c.strategy).collect();
            assert_eq!(
                kinds,
                vec![
                    StrategyKind::Delegated,
                    StrategyKind::StaticKey,
                    StrategyKind::ServiceIdentity,
                ]
            );
        }
        other => panic!("expected NoStrategySucceeded, got {other}"),
    }
    assert_eq!(platform.probe_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_static_key_only_directory_grants_read_only() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("api_key.txt"), "AIzaTestKey").unwrap();

    let config = config_for(dir.path());
    let platform = Arc::new(MockPlatform::default());
    let resolver =
        SessionResolver::from_config(&config, platform.clone(), Arc::new(FailingConsent));

    let session = resolver.resolve().await.unwrap();
    assert_eq!(session.active_strategy(), StrategyKind::StaticKey);
    assert_eq!(session.capabilities(), CapabilitySet::read_only());

    // Acquisition persisted the credential for the next run
    let store = CredentialStore::new(dir.path());
    let blob = store.load(StrategyKind::StaticKey).unwrap().unwrap();
    let credential = Credential::decode(&blob).unwrap();
    assert_eq!(credential.access_material, "AIzaTestKey");
    // The other strategies never produced anything
    assert!(store.load(StrategyKind::Delegated).unwrap().is_none());
    assert!(store.load(StrategyKind::ServiceIdentity).unwrap().is_none());
}

#[tokio::test]
async fn test_valid_cached_credential_makes_no_token_calls() {
    let dir = tempfile::tempdir().unwrap();
    write_client_secrets(dir.path());
    let store = CredentialStore::new(dir.path());
    let credential = delegated_credential(false, Some("refresh-1"));
    store
        .save(StrategyKind::Delegated, &credential.encode().unwrap())
        .unwrap();

    let config = config_for(dir.path());
    let platform = Arc::new(MockPlatform::default());
    let resolver =
        SessionResolver::from_config(&config, platform.clone(), Arc::new(FailingConsent));

    let session = resolver.resolve().await.unwrap();
    assert_eq!(session.active_strategy(), StrategyKind::Delegated);
    assert_eq!(platform.refresh_calls.load(Ordering::SeqCst), 0);
    assert_eq!(platform.code_calls.load(Ordering::SeqCst), 0);

    // A second resolution restores the same credential; still no
    // token-endpoint traffic
    let session = resolver.resolve().await.unwrap();
    assert_eq!(session.active_strategy(), StrategyKind::Delegated);
    assert_eq!(platform.refresh_calls.load(Ordering::SeqCst), 0);
    assert_eq!(platform.code_calls.load(Ordering::SeqCst), 0);
    // The identity probe runs once per session build
    assert_eq!(platform.probe_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_expired_credential_refreshes_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    write_client_secrets(dir.path());
    let store = CredentialStore::new(dir.path());
    let credential = delegated_credential(true, Some("refresh-1"));
    store
        .save(StrategyKind::Delegated, &credential.encode().unwrap())
        .unwrap();

    let config = config_for(dir.path());
    let platform = Arc::new(MockPlatform::default());
    let resolver =
        SessionResolver::from_config(&config, platform.clone(), Arc::new(FailingConsent));

    let session = resolver.resolve().await.unwrap();
    assert_eq!(session.active_strategy(), StrategyKind::Delegated);
    assert_eq!(platform.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(platform.code_calls.load(Ordering::SeqCst), 0);

    // The store now holds the refreshed blob, refresh material preserved
    let blob = store.load(StrategyKind::Delegated).unwrap().unwrap();
    let refreshed = Credential::decode(&blob).unwrap();
    assert_eq!(refreshed.access_material, "refreshed-token");
    assert_eq!(refreshed.refresh_material, Some("refresh-1".to_string()));
    assert!(refreshed.expiry.unwrap() > Utc::now());
    assert_eq!(refreshed.granted_scopes, credential.granted_scopes);
}

#[tokio::test]
async fn test_refresh_denial_falls_through_to_acquisition() {
    let dir = tempfile::tempdir().unwrap();
    write_client_secrets(dir.path());
    let store = CredentialStore::new(dir.path());
    let credential = delegated_credential(true, Some("revoked-refresh"));
    store
        .save(StrategyKind::Delegated, &credential.encode().unwrap())
        .unwrap();

    let config = config_for(dir.path());
    let platform = Arc::new(MockPlatform::denying_refresh());
    let consent = Arc::new(CannedConsent::new("the-auth-code"));
    let resolver = SessionResolver::from_config(&config, platform.clone(), consent.clone());

    let session = resolver.resolve().await.unwrap();
    assert_eq!(session.active_strategy(), StrategyKind::Delegated);
    assert_eq!(platform.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(platform.code_calls.load(Ordering::SeqCst), 1);

    // The consent URL carried the app identity and requested scopes
    let url = consent.seen_url.lock().clone().unwrap();
    assert!(url.starts_with("https://accounts.example.test/auth?"));
    assert!(url.contains("client_id=test-client"));
    assert!(url.contains("scope="));
    assert!(url.contains("access_type=offline"));

    // The newly acquired grant replaced the stale blob
    let blob = store.load(StrategyKind::Delegated).unwrap().unwrap();
    let acquired = Credential::decode(&blob).unwrap();
    assert_eq!(acquired.access_material, "granted-token");
    assert_eq!(acquired.refresh_material, Some("issued-refresh".to_string()));
}

#[tokio::test]
async fn test_failed_interactive_flow_falls_through_to_next_strategy() {
    let dir = tempfile::tempdir().unwrap();
    write_client_secrets(dir.path());
    std::fs::write(dir.path().join("api_key.txt"), "fallback-key").unwrap();

    let config = config_for(dir.path());
    let platform = Arc::new(MockPlatform::default());
    let resolver =
        SessionResolver::from_config(&config, platform.clone(), Arc::new(FailingConsent));

    // Delegated acquisition aborts (no consent available); static key
    // takes over
    let session = resolver.resolve().await.unwrap();
    assert_eq!(session.active_strategy(), StrategyKind::StaticKey);
}

#[tokio::test]
async fn test_auto_order_prefers_delegated() {
    let dir = tempfile::tempdir().unwrap();
    write_client_secrets(dir.path());
    std::fs::write(dir.path().join("api_key.txt"), "also-present").unwrap();
    let store = CredentialStore::new(dir.path());
    store
        .save(
            StrategyKind::Delegated,
            &delegated_credential(false, Some("r")).encode().unwrap(),
        )
        .unwrap();

    let config = config_for(dir.path());
    let platform = Arc::new(MockPlatform::default());
    let resolver =
        SessionResolver::from_config(&config, platform.clone(), Arc::new(FailingConsent));

    let session = resolver.resolve().await.unwrap();
    assert_eq!(session.active_strategy(), StrategyKind::Delegated);
}

#[tokio::test]
async fn test_explicit_method_skips_other_strategies() {
    let dir = tempfile::tempdir().unwrap();
    write_client_secrets(dir.path());
    std::fs::write(dir.path().join("api_key.txt"), "only-me").unwrap();

    let yaml = format!(
        "credentials_dir: {}\nauth:\n  method: static_key\n",
        dir.path().display()
    );
    let config = Config::from_str(&yaml).unwrap();
    let platform = Arc::new(MockPlatform::default());
    let resolver =
        SessionResolver::from_config(&config, platform.clone(), Arc::new(FailingConsent));

    let session = resolver.resolve().await.unwrap();
    assert_eq!(session.active_strategy(), StrategyKind::StaticKey);
    assert_eq!(platform.code_calls.load(Ordering::SeqCst), 0);
    assert_eq!(platform.refresh_calls.load(Ordering::SeqCst), 0);
}

/// Strategy double that counts acquisition attempts.
struct CountingStrategy {
    kind: StrategyKind,
    attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl Strategy for CountingStrategy {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn descriptor(&self) -> StrategyDescriptor {
        StrategyDescriptor {
            kind: self.kind,
            required_files: Vec::new(),
            capability_scopes: [scopes::READONLY.to_string()].into_iter().collect(),
            interactive: false,
        }
    }

    fn is_attemptable(&self) -> bool {
        true
    }

    async fn acquire(&self) -> Result<Credential> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Ok(Credential {
            strategy: self.kind,
            access_material: "material".to_string(),
            expiry: None,
            refresh_material: None,
            granted_scopes: [scopes::READONLY.to_string()].into_iter().collect(),
        })
    }
}

#[tokio::test]
async fn test_no_strategy_attempted_after_success() {
    let dir = tempfile::tempdir().unwrap();
    let first_attempts = Arc::new(AtomicUsize::new(0));
    let second_attempts = Arc::new(AtomicUsize::new(0));

    let strategies: Vec<Box<dyn Strategy>> = vec![
        Box::new(CountingStrategy {
            kind: StrategyKind::StaticKey,
            attempts: first_attempts.clone(),
        }),
        Box::new(CountingStrategy {
            kind: StrategyKind::ServiceIdentity,
            attempts: second_attempts.clone(),
        }),
    ];

    let platform = Arc::new(MockPlatform::default());
    let resolver = SessionResolver::new(
        strategies,
        CredentialStore::new(dir.path()),
        platform.clone(),
    );

    let session = resolver.resolve().await.unwrap();
    assert_eq!(session.active_strategy(), StrategyKind::StaticKey);
    assert_eq!(first_attempts.load(Ordering::SeqCst), 1);
    assert_eq!(second_attempts.load(Ordering::SeqCst), 0);
}
