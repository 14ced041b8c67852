//! yt-session CLI entry point: resolve a session and report what it can do

use std::path::PathBuf;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use yt_session::config::{Config, ConsentMode};
use yt_session::credential::Capability;
use yt_session::platform::HttpPlatform;
use yt_session::resolver::SessionResolver;
use yt_session::strategy::{CallbackConsent, ConsentBroker, ManualConsent};
use yt_session::Error;

/// Print usage information
fn print_usage() {
    eprintln!("Usage: yt-session <config.yaml>");
    eprintln!();
    eprintln!("yt-session - credential resolution and sessions for the YouTube APIs");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  config.yaml    Path to configuration file");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  yt-session /etc/yt-session/config.yaml");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 2 {
        print_usage();
        std::process::exit(1);
    }

    let config_path = PathBuf::from(&args[1]);

    // Load configuration
    let config = match Config::from_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    }

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("yt-session starting");
    info!("Loaded configuration from {:?}", config_path);

    let platform = Arc::new(HttpPlatform::with_overrides(
        config.api.data.as_deref(),
        config.api.analytics.as_deref(),
        config.api.upload.as_deref(),
    ));

    // Interactive consent: Ctrl-C aborts a pending authorization wait
    // instead of killing the process mid-flow
    let consent: Arc<dyn ConsentBroker> = match config.auth.consent {
        ConsentMode::Callback => {
            let callback = CallbackConsent::new(config.auth.callback_port);
            let cancel = callback.cancel_handle();
            ctrlc::set_handler(move || {
                info!("Received shutdown signal, cancelling authorization wait");
                cancel.cancel();
            })?;
            Arc::new(callback)
        }
        ConsentMode::Manual => Arc::new(ManualConsent),
    };

    let resolver = SessionResolver::from_config(&config, platform, consent);

    let resolved = match config.auth.resolve_timeout {
        Some(deadline) => match tokio::time::timeout(deadline, resolver.resolve()).await {
            Ok(result) => result,
            Err(_) => Err(Error::AcquisitionFailed(format!(
                "resolution deadline of {deadline:?} exceeded"
            ))),
        },
        None => resolver.resolve().await,
    };

    let session = match resolved {
        Ok(session) => session,
        Err(Error::NoStrategySucceeded(causes)) => {
            error!("Authentication failed; per-strategy causes:");
            for cause in &causes {
                error!("  {}", cause);
            }
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    println!("Authenticated via: {}", session.active_strategy());
    println!("Capabilities:      {}", session.capabilities());
    match session.channel_identity() {
        Some(channel) => println!(
            "Channel:           {} ({})",
            channel.title.as_deref().unwrap_or("unnamed"),
            channel.id
        ),
        None => println!("Channel:           unavailable (identity probe failed)"),
    }

    // A quick listing exercises the content surface the way the original
    // self-tests did; skipped for identity-less sessions, whose listing
    // would need a channel to walk
    if session.has_capability(Capability::ContentRead) && session.channel_identity().is_some() {
        let content = session.content();
        let mut uploads = content.recent_uploads(5);
        println!("Recent uploads:");
        let mut any = false;
        while let Some(video) = uploads.next().await {
            match video {
                Ok(video) => {
                    any = true;
                    println!("  - {} ({})", video.title, video.id);
                }
                Err(e) => {
                    error!("Failed to list uploads: {}", e);
                    break;
                }
            }
        }
        if !any {
            println!("  (none)");
        }
    }

    Ok(())
}
