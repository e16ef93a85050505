//! CLI command implementations and shared wiring

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use fanout_core::config::{Config, TransportConfig};
use fanout_core::domain::newtypes::TransportName;
use fanout_core::ports::{ITransport, TransportRegistry};
use fanout_http::HttpApiTransport;

pub mod run;
pub mod status;
pub mod sync;

/// Loads and validates the configuration from `path` or the default location
pub(crate) fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.map_or_else(Config::default_path, Path::to_path_buf);
    let config = Config::load(&path)
        .with_context(|| format!("loading configuration from {}", path.display()))?;

    let errors = config.validate();
    if !errors.is_empty() {
        let listing: Vec<String> = errors.iter().map(ToString::to_string).collect();
        bail!("invalid configuration:\n  {}", listing.join("\n  "));
    }

    Ok(config)
}

/// Builds the transport registry from the configured destinations
pub(crate) fn build_registry(config: &Config) -> Result<Arc<TransportRegistry>> {
    let mut transports: Vec<Arc<dyn ITransport>> = Vec::new();

    for transport in &config.transports {
        match transport {
            TransportConfig::Http { name, url, token } => {
                let transport = HttpApiTransport::new(
                    TransportName::new(name.clone())?,
                    url.clone(),
                    token.clone(),
                )?;
                transports.push(Arc::new(transport));
            }
        }
    }

    Ok(Arc::new(TransportRegistry::new(transports)))
}
