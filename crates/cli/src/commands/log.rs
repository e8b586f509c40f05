//! `keepsake log` — Generation audit log inspection.

use keepsake_config::AppConfig;

use super::open_store;

pub async fn recent(limit: i64) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config).await?;

    let entries = store.recent_generations(limit).await?;
    if entries.is_empty() {
        println!("  Generation log is empty.");
        return Ok(());
    }

    println!("📜 Last {} generation(s)", entries.len());
    println!("=========================");
    for entry in &entries {
        println!(
            "  {:>4}. {}  {}  task={}  attribute={}",
            entry.log_id,
            entry.logged_at.format("%Y-%m-%d %H:%M:%S"),
            entry.model,
            entry.task,
            entry.attribute.as_deref().unwrap_or("-"),
        );
        println!("        prompt:   {}", truncate(&entry.prompt, 96));
        println!("        response: {}", truncate(&entry.response, 96));
    }

    Ok(())
}

pub async fn clear() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config).await?;

    let removed = store.clear_generation_log().await?;
    println!(
        "🗑️  Cleared {removed} log entr{}.",
        if removed == 1 { "y" } else { "ies" }
    );

    Ok(())
}

/// First `max` characters with newlines flattened, for one-line display.
fn truncate(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    let mut out: String = flat.chars().take(max).collect();
    if flat.chars().count() > max {
        out.push('…');
    }
    out
}
