//! Command implementations for the Keepsake CLI.

pub mod chat;
pub mod definitions;
pub mod log;
pub mod seed;
pub mod values;

use std::sync::Arc;

use keepsake_config::AppConfig;
use keepsake_core::Gateway;
use keepsake_llm::{OllamaGateway, ScriptedGateway};
use keepsake_store::SqliteStore;
use tracing::debug;

/// Open the configured SQLite store, creating the database on first use.
pub(crate) async fn open_store(
    config: &AppConfig,
) -> Result<Arc<SqliteStore>, Box<dyn std::error::Error>> {
    let store = SqliteStore::new(&config.db_path)
        .await
        .map_err(|e| format!("Failed to open database at {}: {e}", config.db_path))?;
    Ok(Arc::new(store))
}

/// Build the configured gateway. Every backend call it makes is recorded
/// in the store's generation log.
pub(crate) fn build_gateway(config: &AppConfig, store: Arc<SqliteStore>) -> Arc<dyn Gateway> {
    debug!(provider = %config.provider, "Building gateway");
    match config.provider.as_str() {
        "ollama" => Arc::new(
            OllamaGateway::new(&config.ollama.url, &config.ollama.model)
                .with_generation_log(store),
        ),
        _ => Arc::new(ScriptedGateway::new().with_generation_log(store)),
    }
}
