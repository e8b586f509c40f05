//! Keepsake CLI — the main entry point.
//!
//! Commands:
//! - `chat`        — Interactive chat or single-message mode
//! - `seed`        — Insert the default attribute definitions
//! - `definitions` — Manage attribute definitions
//! - `values`      — Manage stored attribute values
//! - `log`         — Inspect the generation audit log

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "keepsake",
    about = "Keepsake — an assistant that remembers who it talks to",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Insert the default attribute definitions
    Seed {
        /// Insert them even if definitions already exist
        #[arg(long)]
        force: bool,
    },

    /// Manage attribute definitions
    Definitions {
        #[command(subcommand)]
        action: DefinitionsAction,
    },

    /// Manage stored attribute values
    Values {
        #[command(subcommand)]
        action: ValuesAction,
    },

    /// Inspect the generation audit log
    Log {
        #[command(subcommand)]
        action: LogAction,
    },
}

#[derive(Subcommand)]
enum DefinitionsAction {
    /// List all attribute definitions
    List,

    /// Add a new attribute definition
    Add {
        /// Display name of the attribute
        name: String,

        /// Prompt used to extract values from user input
        #[arg(long)]
        extraction: String,

        /// Prompt used to judge whether the attribute matters for a reply
        #[arg(long)]
        judgment: String,
    },

    /// Update fields of an existing definition
    Edit {
        /// Definition id
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        extraction: Option<String>,

        #[arg(long)]
        judgment: Option<String>,
    },

    /// Delete a definition and all its stored values
    Remove {
        /// Definition id
        id: i64,
    },
}

#[derive(Subcommand)]
enum ValuesAction {
    /// List stored values, newest first
    List {
        /// Only show values of this definition
        #[arg(short, long)]
        definition: Option<i64>,
    },

    /// Store a new value for a definition
    Add {
        /// Definition id
        definition: i64,

        /// Value content
        content: String,
    },

    /// Overwrite a stored value
    Edit {
        /// Value sequence id
        id: i64,

        /// New content
        content: String,
    },

    /// Delete a stored value
    Remove {
        /// Value sequence id
        id: i64,
    },
}

#[derive(Subcommand)]
enum LogAction {
    /// Show the most recent entries
    Recent {
        /// How many entries to show
        #[arg(short, long, default_value_t = 20)]
        limit: i64,
    },

    /// Delete all entries
    Clear,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Chat { message } => commands::chat::run(message).await?,
        Commands::Seed { force } => commands::seed::run(force).await?,
        Commands::Definitions { action } => match action {
            DefinitionsAction::List => commands::definitions::list().await?,
            DefinitionsAction::Add {
                name,
                extraction,
                judgment,
            } => commands::definitions::add(&name, &extraction, &judgment).await?,
            DefinitionsAction::Edit {
                id,
                name,
                extraction,
                judgment,
            } => {
                commands::definitions::edit(
                    id,
                    name.as_deref(),
                    extraction.as_deref(),
                    judgment.as_deref(),
                )
                .await?
            }
            DefinitionsAction::Remove { id } => commands::definitions::remove(id).await?,
        },
        Commands::Values { action } => match action {
            ValuesAction::List { definition } => commands::values::list(definition).await?,
            ValuesAction::Add {
                definition,
                content,
            } => commands::values::add(definition, &content).await?,
            ValuesAction::Edit { id, content } => commands::values::edit(id, &content).await?,
            ValuesAction::Remove { id } => commands::values::remove(id).await?,
        },
        Commands::Log { action } => match action {
            LogAction::Recent { limit } => commands::log::recent(limit).await?,
            LogAction::Clear => commands::log::clear().await?,
        },
    }

    Ok(())
}
