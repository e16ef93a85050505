//! `fanout run` - the watch-and-sync daemon loop
//!
//! Wires the watcher, scheduler and engine together:
//!
//! ```text
//! FileWatcher ──→ SyncScheduler ──→ sync_requested flag
//!                                         │
//!                 run loop ──(flag set or interval elapsed)──→ ReconcileEngine
//! ```
//!
//! Cycles also run on a fixed interval so changes missed by the watcher
//! (channel overflow, unwatchable paths) are picked up eventually. Ctrl-C
//! cancels the shared token; an in-flight cycle stops at the next path
//! boundary and state stays consistent.

use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use fanout_store::JsonStateStore;
use fanout_sync::{FileWatcher, ReconcileEngine, SyncScheduler};

use super::{build_registry, load_config};

/// How often the run loop checks the sync-requested flag.
const FLAG_POLL: Duration = Duration::from_millis(500);

/// Watch the local tree and reconcile continuously
#[derive(Debug, Parser)]
pub struct RunCommand {}

impl RunCommand {
    pub async fn execute(&self, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path)?;
        let registry = build_registry(&config)?;
        let store = Arc::new(JsonStateStore::open(&config.state.path).await?);
        let cancel = CancellationToken::new();

        let engine = ReconcileEngine::new(
            registry,
            store,
            config.watch.root.clone(),
            config.limits.max_file_size_bytes(),
            config.state.path.clone(),
            cancel.clone(),
        );

        // Watcher must outlive the loop; dropping it closes the scheduler's
        // channel.
        let (mut watcher, change_rx) = FileWatcher::new()?;
        watcher.watch(&config.watch.root)?;

        let (mut scheduler, sync_requested) = SyncScheduler::new(
            change_rx,
            Duration::from_secs(config.watch.debounce_delay),
            FLAG_POLL,
        );
        let scheduler_task = tokio::spawn(async move { scheduler.run().await });

        // Dedicated signal listener, registered for the whole daemon
        // lifetime: a Ctrl-C arriving while a cycle is in flight cancels
        // the shared token, and the engine stops at the next path boundary.
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Shutdown requested");
                    signal_cancel.cancel();
                }
                Err(e) => error!(error = %e, "Cannot listen for shutdown signal"),
            }
        });

        info!(
            root = %config.watch.root.display(),
            interval_s = config.watch.poll_interval,
            "Fanout daemon started"
        );

        let mut forced = tokio::time::interval(Duration::from_secs(config.watch.poll_interval));
        let mut flag_poll = tokio::time::interval(FLAG_POLL);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                // Periodic full cycle, independent of watcher events. The
                // first tick fires immediately and covers startup catch-up.
                _ = forced.tick() => {
                    sync_requested.store(false, Ordering::Release);
                    run_one(&engine).await;
                }

                _ = flag_poll.tick() => {
                    if sync_requested.swap(false, Ordering::AcqRel) {
                        run_one(&engine).await;
                    }
                }
            }
        }

        drop(watcher);
        let _ = scheduler_task.await;
        info!("Fanout daemon stopped");
        Ok(())
    }
}

/// Runs one cycle; failures are logged and the daemon keeps going.
async fn run_one(engine: &ReconcileEngine) {
    match engine.run_cycle().await {
        Ok(report) => info!(%report, "Cycle finished"),
        Err(e) => error!(error = %e, "Cycle aborted"),
    }
}
