//! yt-session: strategy-based credential resolution and capability-tagged
//! sessions for the YouTube APIs
//!
//! This library unifies the credential lifecycle behind a family of
//! video-platform clients: selecting an authentication strategy, restoring
//! or acquiring credentials, refreshing them when they expire, persisting
//! them, and handing out typed service handles gated by what the active
//! credential actually grants.
//!
//! # Architecture
//!
//! - **Strategies**: Delegated authorization (interactive OAuth),
//!   static API key, and service identity, each implementing the
//!   `Strategy` trait for restore/validate/refresh/acquire.
//! - **Resolver**: Tries strategies in preference order, short-circuits
//!   on the first valid credential, and records per-strategy failures.
//! - **Credential Store**: Durable per-strategy blobs under the
//!   credentials directory, overwritten atomically.
//! - **Session**: Owns the resolved credential, carries the derived
//!   capability set and channel identity, and builds content/analytics
//!   handles on access.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use yt_session::config::Config;
//! use yt_session::platform::HttpPlatform;
//! use yt_session::resolver::SessionResolver;
//! use yt_session::strategy::ManualConsent;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Load configuration
//! let config = Config::from_file(&"config.yaml".into())?;
//!
//! // Resolve an authorized session
//! let resolver = SessionResolver::from_config(
//!     &config,
//!     Arc::new(HttpPlatform::new()),
//!     Arc::new(ManualConsent),
//! );
//! let session = resolver.resolve().await?;
//! println!("capabilities: {}", session.capabilities());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod credential;
pub mod env;
pub mod error;
pub mod platform;
pub mod resolver;
pub mod session;
pub mod store;
pub mod strategy;

pub use error::{Error, Result};
