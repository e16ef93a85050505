//! `fanout sync` - one reconciliation cycle, then exit

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use fanout_store::JsonStateStore;
use fanout_sync::ReconcileEngine;

use super::{build_registry, load_config};

/// Run one reconciliation cycle and report the outcome
#[derive(Debug, Parser)]
pub struct SyncCommand {}

impl SyncCommand {
    pub async fn execute(&self, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path)?;
        let registry = build_registry(&config)?;
        let store = Arc::new(JsonStateStore::open(&config.state.path).await?);

        let engine = ReconcileEngine::new(
            registry,
            store,
            config.watch.root.clone(),
            config.limits.max_file_size_bytes(),
            config.state.path.clone(),
            CancellationToken::new(),
        );

        let report = engine.run_cycle().await?;
        println!("{report}");

        if report.errors > 0 {
            std::process::exit(1);
        }
        Ok(())
    }
}
