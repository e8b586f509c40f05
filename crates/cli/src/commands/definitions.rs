//! `keepsake definitions` — Attribute definition management.

use keepsake_config::AppConfig;
use keepsake_core::{AttributeDefinition, AttributeStore};

use super::open_store;

pub async fn list() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config).await?;

    let definitions = store.list_definitions().await?;
    if definitions.is_empty() {
        println!("  No attribute definitions. Run `keepsake seed` to install the defaults.");
        return Ok(());
    }

    println!("📋 Attribute definitions");
    println!("========================");
    for definition in &definitions {
        println!("  {:>3}. {}", definition.id, definition.name);
        println!("       judgment:   {}", definition.judgment_prompt);
        println!("       extraction: {}", definition.extraction_prompt);
    }

    Ok(())
}

pub async fn add(
    name: &str,
    extraction: &str,
    judgment: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config).await?;

    let definition = AttributeDefinition::new(name, extraction, judgment)?;
    let id = store.insert_definition(&definition).await?;
    println!("✅ Added definition {id}: {name}");

    Ok(())
}

pub async fn edit(
    id: i64,
    name: Option<&str>,
    extraction: Option<&str>,
    judgment: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    if name.is_none() && extraction.is_none() && judgment.is_none() {
        println!("  Nothing to change — pass --name, --extraction, or --judgment.");
        return Ok(());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config).await?;

    let Some(current) = store.get_definition(id).await? else {
        return Err(format!("No definition with id {id}").into());
    };

    // Rebuilding through the constructor keeps edits under the same
    // validation as fresh definitions.
    let mut updated = AttributeDefinition::new(
        name.unwrap_or(&current.name),
        extraction.unwrap_or(&current.extraction_prompt),
        judgment.unwrap_or(&current.judgment_prompt),
    )?;
    updated.id = id;

    if store.update_definition(&updated).await? {
        println!("✅ Updated definition {id}: {}", updated.name);
    } else {
        println!("  Definition {id} disappeared before the update.");
    }

    Ok(())
}

pub async fn remove(id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config).await?;

    if store.delete_definition(id).await? {
        println!("🗑️  Removed definition {id} and its stored values.");
    } else {
        println!("  No definition with id {id}.");
    }

    Ok(())
}
