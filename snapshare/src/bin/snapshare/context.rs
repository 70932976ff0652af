use std::path::Path;

use anyhow::{Context, Result};
use snapshare::{App, AppConfig, StoreBackend};

use crate::output::OutputManager;

/// The app wired from the loaded configuration.
pub struct CliContext {
    pub app: App,
}

impl CliContext {
    pub async fn load(config_path: Option<&Path>, output: &OutputManager) -> Result<Self> {
        let config = AppConfig::load(config_path).context("Failed to load configuration")?;
        if config.store.backend == StoreBackend::Memory {
            output.warning("Using an empty in-memory store; set [store] backend = \"redis\" to inspect real data.");
        }
        output.verbose(&format!(
            "store backend: {:?}, prefix: {}",
            config.store.backend, config.store.prefix
        ));
        let app = App::from_config(&config)
            .await
            .context("Failed to connect to the document store")?;
        Ok(Self { app })
    }
}
