//! sg-updater — security group ingress synchronizer
//!
//! Responsibilities:
//! - Find security groups opted in through the enabled tag
//! - Resolve each group's trusted DNS name to a /32 range
//! - Authorize the ingress rules its port spec asks for and revoke the rest
//! - Report an aggregate failure when any group could not be updated
//!
//! Runs a single cycle by default; with `schedule.interval_seconds` set it
//! keeps running a cycle on that interval until interrupted.

use anyhow::{Context, Result};
use sg_updater_rules::SystemResolver;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod firewall;
mod http_api;
mod reconcile;
mod tags;

use reconcile::{CycleError, Reconciler, ReconciliationOutcome};

/// Invocation context handed over by the trigger; only used for logging
#[derive(Debug, Default, Clone)]
pub struct InvocationContext {
    pub request_id: Option<String>,
}

/// Entry point for one triggered cycle.
///
/// The trigger payload is accepted for the scheduler's contract and ignored;
/// the context only feeds logging. Returns the aggregate error when any group
/// failed.
pub async fn handle(
    reconciler: &Reconciler,
    _event: serde_json::Value,
    context: InvocationContext,
) -> Result<ReconciliationOutcome, CycleError> {
    info!("SecurityGroupUpdater running");
    if let Some(request_id) = &context.request_id {
        debug!("Invocation {request_id}");
    }
    let started = chrono::Utc::now();

    let outcome = reconciler.run_cycle().await?;

    for change in outcome.changes.iter().filter(|c| c.added + c.removed > 0) {
        info!(
            "Group {} now allows {}: +{} -{}",
            change.group_id, change.source_range, change.added, change.removed
        );
    }

    let added: usize = outcome.changes.iter().map(|c| c.added).sum();
    let removed: usize = outcome.changes.iter().map(|c| c.removed).sum();
    info!(
        "SecurityGroupUpdater finished running successfully: {} groups, +{} -{} rules, {} skipped, {}ms",
        outcome.changes.len(),
        added,
        removed,
        outcome.skipped,
        (chrono::Utc::now() - started).num_milliseconds()
    );
    Ok(outcome)
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("FATAL: sg-updater failed: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config_path = config::config_path();
    let config = config::load_config_from(&config_path)?;
    init_logging(&config.logging)?;

    if !config_path.exists() {
        warn!(
            "Config file not found at {}, using defaults",
            config_path.display()
        );
    }

    let api = http_api::HttpFirewallClient::new(&config.api)?;
    info!("Firewall API endpoint: {}", config.api.base_url);

    let reconciler = Reconciler::new(
        Arc::new(api),
        Arc::new(SystemResolver),
        config.tags.clone(),
    );

    if config.schedule.interval_seconds == 0 {
        handle(&reconciler, serde_json::Value::Null, InvocationContext::default()).await?;
        return Ok(());
    }

    let cancel = CancellationToken::new();
    spawn_signal_listener(cancel.clone());
    run_periodic(
        &reconciler,
        Duration::from_secs(config.schedule.interval_seconds),
        cancel,
    )
    .await;
    Ok(())
}

/// Run a cycle immediately and then once per interval until cancelled.
///
/// Cycle failures are logged and the loop carries on; the next cycle is the
/// retry.
async fn run_periodic(
    reconciler: &Reconciler,
    interval: Duration,
    cancel: CancellationToken,
) {
    info!("Running a cycle every {}s", interval.as_secs());
    loop {
        let context = InvocationContext {
            request_id: Some(chrono::Utc::now().to_rfc3339()),
        };
        if let Err(e) = handle(reconciler, serde_json::Value::Null, context).await {
            error!("Cycle failed: {e}");
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("sg-updater shutting down");
                break;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {e}");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }
        cancel.cancel();
    });
}

fn init_logging(logging: &config::LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_level(true);

    if logging.json {
        tracing::subscriber::set_global_default(builder.json().finish())
            .context("Failed to set tracing subscriber")?;
    } else {
        tracing::subscriber::set_global_default(builder.compact().finish())
            .context("Failed to set tracing subscriber")?;
    }
    Ok(())
}
