//! `keepsake values` — Stored attribute value management.

use keepsake_config::AppConfig;
use keepsake_core::{AttributeStore, ValidationError};

use super::open_store;

pub async fn list(definition: Option<i64>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config).await?;

    let values = match definition {
        Some(id) => store.values_for_definition(id).await?,
        None => store.list_values().await?,
    };
    if values.is_empty() {
        println!("  No stored values.");
        return Ok(());
    }

    let definitions = store.list_definitions().await?;
    let name_of = |id: i64| {
        definitions
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.name.as_str())
            .unwrap_or("?")
    };

    println!("🗃️  Stored values (newest first)");
    println!("================================");
    for value in &values {
        println!(
            "  {:>3}. [{}] {} ({})",
            value.sequence_id,
            name_of(value.definition_id),
            value.content,
            value.updated_at.format("%Y-%m-%d %H:%M"),
        );
    }

    Ok(())
}

pub async fn add(definition: i64, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent.into());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config).await?;

    let id = store.insert_value(definition, content).await?;
    println!("✅ Stored value {id}.");

    Ok(())
}

pub async fn edit(id: i64, content: &str) -> Result<(), Box<dyn std::error::Error>> {
    if content.trim().is_empty() {
        return Err(ValidationError::EmptyContent.into());
    }

    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config).await?;

    if store.update_value(id, content).await? {
        println!("✅ Updated value {id}.");
    } else {
        println!("  No value with id {id}.");
    }

    Ok(())
}

pub async fn remove(id: i64) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config).await?;

    if store.delete_value(id).await? {
        println!("🗑️  Removed value {id}.");
    } else {
        println!("  No value with id {id}.");
    }

    Ok(())
}
