//! `keepsake chat` — Interactive or single-message chat mode.

use keepsake_config::AppConfig;
use keepsake_core::{AttributeStore, StepKind, StepState};
use keepsake_llm::Translator;
use keepsake_pipeline::TurnPipeline;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::{build_gateway, open_store};

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let store = open_store(&config).await?;
    let gateway = build_gateway(&config, store.clone());

    let mut pipeline = TurnPipeline::new(gateway.clone(), store.clone());
    if config.translation.enabled {
        pipeline = pipeline.with_translator(Translator::with_languages(
            gateway,
            config.translation.display_language.clone(),
            config.translation.pivot_language.clone(),
        ));
    }

    if let Some(text) = message {
        // Single message mode: just the reply on stdout
        eprint!("  Thinking...");
        let result = pipeline.process(&text).await?;
        eprint!("\r             \r");
        println!("{}", result.reply_text);
        return Ok(());
    }

    let definitions = store.list_definitions().await?;

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          Keepsake — Interactive Chat         ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:     {}", config.provider);
    if config.provider == "ollama" {
        println!("  Model:        {}", config.ollama.model);
    }
    println!("  Database:     {}", config.db_path);
    println!(
        "  Translation:  {}",
        if config.translation.enabled {
            "on"
        } else {
            "off"
        }
    );
    println!("  Definitions:  {}", definitions.len());
    if definitions.is_empty() {
        println!();
        println!("  ⚠️  No attribute definitions yet — run `keepsake seed` first.");
    }
    println!();
    println!("  Type your message and press Enter.");
    println!("  Slash commands: /history, /clear, /exit");
    println!();

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "/exit" | "/quit" | "exit" => break,
            "/history" => show_history(&pipeline).await,
            "/clear" => {
                pipeline.clear_history().await;
                println!("  History cleared.");
            }
            _ => {
                if let Err(e) = stream_turn(&pipeline, input).await {
                    eprintln!("  [Error] {e}");
                    println!();
                }
            }
        }
        prompt()?;
    }

    println!();
    println!("  Goodbye! 👋");
    println!();

    Ok(())
}

fn prompt() -> std::io::Result<()> {
    use std::io::Write;
    print!("  You > ");
    std::io::stdout().flush()
}

async fn show_history(pipeline: &TurnPipeline) {
    let history = pipeline.history().await;
    if history.is_empty() {
        println!("  (no turns yet)");
        return;
    }
    for turn in &history {
        println!("  {} > {}", turn.role.label(), turn.content);
    }
}

/// Drives one streaming turn: step progress to stderr as it happens, the
/// reply to stdout the moment it is announced. Extraction keeps running
/// after the reply, so a few progress lines follow it.
async fn stream_turn(
    pipeline: &TurnPipeline,
    text: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stream = pipeline.process_streaming(text);
    while let Some(status) = stream.next_status().await {
        if status.kind == StepKind::ReplyReady {
            println!();
            if let Some(reply) = &status.reply {
                for line in reply.lines() {
                    println!("  Assistant > {line}");
                }
            }
            if let Some(used) = status.used_attributes.as_ref().filter(|u| !u.is_empty()) {
                let names: Vec<&str> = used.iter().map(|(name, _)| name.as_str()).collect();
                println!("  [recalled: {}]", names.join(", "));
            }
            println!();
        } else if status.state == StepState::Processing {
            eprintln!("  · {}", status.display_line());
        }
    }
    stream.finish().await?;
    Ok(())
}
