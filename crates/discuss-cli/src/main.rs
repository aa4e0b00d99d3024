//! discuss-sync: follows a discuss channel over the real-time broker.
//!
//! Keeps an in-memory message cache in sync with server pushes and logs
//! every event, invalidation and notification until interrupted.

mod cli;

use std::process::ExitCode;
use std::time::Duration;

use discuss_common::{ConfigError, Notification, NotificationLevel, TransportError};
use discuss_config::{load_config, load_config_from, DiscussConfig, LogLevel};
use discuss_sync::{DiscussSession, QueryCache};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(level: LogLevel) {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = level.directive().parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn log_notification(n: &Notification) {
    match n.level {
        NotificationLevel::Info => info!(title = %n.title, code = ?n.code, "{}", n.body),
        NotificationLevel::Warning => warn!(title = %n.title, code = ?n.code, "{}", n.body),
        NotificationLevel::Error => error!(title = %n.title, code = ?n.code, "{}", n.body),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let config = match &args.config {
        Some(path) => load_config_from(path),
        None => load_config(),
    };
    let level = args.log_level.unwrap_or_else(|| {
        config
            .as_ref()
            .map(|c| c.logging.level)
            .unwrap_or_default()
    });
    init_logging(level);

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "discuss-sync failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    args: cli::Args,
    config: Result<DiscussConfig, ConfigError>,
) -> discuss_common::Result<()> {
    let config = config?;
    let token = args
        .token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .ok_or(TransportError::MissingCredential)?;

    let cache = QueryCache::new().shared();
    let mut invalidations = cache.read().await.subscribe_invalidations();
    let session = DiscussSession::start(&config, Some(token), cache);

    let callbacks = session.callbacks();
    callbacks.set_on_message(|m| {
        info!(message_id = %m.id, channel_id = ?m.channel_id, kind = ?m.kind, "New message: {}", m.content);
    });
    callbacks.set_on_typing_update(|u| {
        info!(channel_id = %u.channel_id, user_id = %u.user_id, typing = u.is_typing, "Typing update");
    });
    callbacks.set_on_user_status_update(|u| {
        info!(user_id = %u.user_id, online = u.is_online, "Presence update");
    });
    callbacks.set_on_error(|e| {
        warn!(code = ?e.code, channel_id = ?e.channel_id, "Server error: {}", e.message);
    });

    if let Some(channel) = args.channel.as_deref() {
        session.set_active_channel(Some(channel)).await;
    }

    let mut state = session.watch_state();
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            changed = state.changed() => {
                if changed.is_err() {
                    warn!("Connection task stopped, exiting");
                    break;
                }
                let current = *state.borrow_and_update();
                info!(state = %current, "Connection state");
            }
            tag = invalidations.recv() => match tag {
                Ok(tag) => info!(%tag, "Cache region invalidated"),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed invalidations"),
                Err(RecvError::Closed) => break,
            },
            _ = tick.tick() => {
                for n in session.take_notifications() {
                    log_notification(&n);
                }
            }
        }
    }

    session.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use discuss_common::SyncError;

    use super::*;

    #[tokio::test]
    async fn blank_token_fails_before_connecting() {
        let args = cli::Args::try_parse_from(["discuss-sync", "--token", " "]).unwrap();
        let err = run(args, Ok(DiscussConfig::default())).await.unwrap_err();
        assert!(matches!(
            err,
            SyncError::Transport(TransportError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn config_errors_surface_as_sync_errors() {
        let args = cli::Args::try_parse_from(["discuss-sync", "--token", "abc"]).unwrap();
        let err = run(args, Err(ConfigError::ParseError("bad toml".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Config(_)));
    }
}
