//! `fanout status` - inspect the tracked state

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use clap::Parser;

use fanout_core::config::Config;
use fanout_core::domain::tracked_entry::EntryKind;
use fanout_core::ports::IStateStore;
use fanout_store::JsonStateStore;

/// Show tracked state and per-transport coverage
#[derive(Debug, Parser)]
pub struct StatusCommand {
    /// List every tracked path
    #[arg(long)]
    all: bool,
}

impl StatusCommand {
    pub async fn execute(&self, config_path: Option<&Path>) -> Result<()> {
        // Status works even when the watch root is gone, so skip validation
        // and only need the state file location.
        let path = config_path.map_or_else(Config::default_path, Path::to_path_buf);
        let config = Config::load_or_default(&path);

        let store = JsonStateStore::open(&config.state.path).await?;
        let entries = store.all().await?;

        let files = entries
            .iter()
            .filter(|e| e.kind == EntryKind::File)
            .count();
        let folders = entries.len() - files;

        println!("State file: {}", store.path().display());
        println!("Tracked: {} files, {} folders", files, folders);

        let mut per_transport: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &entries {
            for name in entry.remote_refs.keys() {
                *per_transport.entry(name.to_string()).or_default() += 1;
            }
        }
        for (name, count) in &per_transport {
            println!("  {name}: {count} refs");
        }

        if self.all {
            for entry in &entries {
                let transports: Vec<String> = entry
                    .remote_refs
                    .keys()
                    .map(ToString::to_string)
                    .collect();
                println!(
                    "{} [{}] {}",
                    entry.path,
                    transports.join(", "),
                    entry.last_synced_at.format("%Y-%m-%d %H:%M:%S"),
                );
            }
        }

        Ok(())
    }
}
