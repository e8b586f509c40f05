//! `keepsake seed` — Insert the default attribute definitions.

use keepsake_config::AppConfig;
use keepsake_core::AttributeStore;
use keepsake_store::seed_default_definitions;

use super::open_store;

pub async fn run(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config).await?;

    let existing = store.list_definitions().await?;
    if !existing.is_empty() && !force {
        println!(
            "  {} definition(s) already present — nothing to do.",
            existing.len()
        );
        println!("  Use --force to insert the defaults anyway.");
        return Ok(());
    }

    let inserted = seed_default_definitions(store.as_ref()).await?;
    println!("🌱 Seeded {inserted} attribute definitions:");
    for definition in store.list_definitions().await? {
        println!("  {:>3}. {}", definition.id, definition.name);
    }

    Ok(())
}
