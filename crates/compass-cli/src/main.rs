// ============================================================================
// compass-memory - CLI for inspecting and driving Career Compass memory
// ============================================================================
// Usage:
//   compass-memory show                         Print the stored profile as JSON
//   compass-memory summary                      Career field and set sizes
//   compass-memory set <KEY> <JSON>             Save one preference field
//   compass-memory query <TEXT>                 Record a query and extract facts
//   compass-memory turn <MESSAGE> --reply TEXT  Run a full conversation turn
//   compass-memory similar <TEXT> [--limit N]   Rank stored interactions
//   compass-memory stats                        Show database statistics
//   compass-memory clear                        Forget everything
// ============================================================================

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use compass_core::memory::{AssistantReply, MemoryManager, Preference, Profile, Responder};
use compass_core::{BackendKind, MemoryConfig, ProfileDb};
use std::path::PathBuf;
use tracing::debug;

/// Career Compass memory tool
#[derive(Parser)]
#[command(name = "compass-memory", version, about = "Inspect and manage Career Compass user memory")]
struct Cli {
    /// Path to the database file (default: ~/.compass/memory.redb)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Storage backend: local, semantic, ephemeral, qdrant
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the stored profile as JSON
    Show,

    /// Career field plus skill and location counts
    Summary,

    /// Save one preference field, e.g. `set skills '["rust"]'`
    Set {
        /// Field name: careerField, preferredLocations, skills, jobPreferences, ...
        key: String,
        /// JSON value for the field
        value: String,
    },

    /// Record a query and extract facts from it
    Query { text: String },

    /// Run a full conversation turn with a fixed assistant reply
    Turn {
        message: String,

        /// Assistant reply to record
        #[arg(long, default_value = "Noted.")]
        reply: String,
    },

    /// Show stored interactions ranked by similarity to TEXT
    Similar {
        text: String,

        #[arg(long, default_value = "3")]
        limit: usize,
    },

    /// Show database statistics
    Stats,

    /// Delete the stored profile
    Clear,
}

/// Replies with a fixed text
struct FixedResponder {
    reply: String,
}

#[async_trait]
impl Responder for FixedResponder {
    async fn respond(&self, _message: &str, _profile: &Profile) -> AssistantReply {
        AssistantReply::text(self.reply.clone())
    }
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max.saturating_sub(3)).collect();
    short.push_str("...");
    short
}

fn init_logging() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("compass_core=warn".parse()?)
                .add_directive("compass_memory=info".parse()?),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();

    let mut config = MemoryConfig::from_env()?;
    if let Some(path) = cli.db_path {
        config.db_path = Some(path);
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    debug!("Resolved configuration: {:?}", config);

    // Stats reads the database directly; opening a manager would lock it first
    if let Commands::Stats = cli.command {
        return cmd_stats(&config);
    }

    let manager = config.build_manager().await?;

    match cli.command {
        Commands::Show => cmd_show(&manager).await,
        Commands::Summary => cmd_summary(&manager).await,
        Commands::Set { key, value } => cmd_set(&manager, &key, &value).await,
        Commands::Query { text } => cmd_query(&manager, &text).await,
        Commands::Turn { message, reply } => cmd_turn(&manager, &message, reply).await,
        Commands::Similar { text, limit } => cmd_similar(&manager, &text, limit).await,
        Commands::Clear => cmd_clear(&manager).await,
        Commands::Stats => Ok(()),
    }
}

async fn cmd_show(manager: &MemoryManager) -> Result<()> {
    let profile = manager.get_profile().await;
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

async fn cmd_summary(manager: &MemoryManager) -> Result<()> {
    let summary = manager.summary().await;
    let profile = manager.get_profile().await;

    println!("=== Career Compass Memory ===");
    println!(
        "Career field:     {}",
        summary.career_field.as_deref().unwrap_or("-")
    );
    println!("Skills:           {}", summary.skills);
    println!("Locations:        {}", summary.preferred_locations);
    println!("Queries:          {}", profile.previous_queries.len());
    println!("Interactions:     {}", profile.conversation_history.len());
    println!(
        "Last interaction: {}",
        format_timestamp(profile.last_interaction_date)
    );
    Ok(())
}

async fn cmd_set(manager: &MemoryManager, key: &str, raw: &str) -> Result<()> {
    let value: serde_json::Value =
        serde_json::from_str(raw).with_context(|| format!("Value for {} is not valid JSON", key))?;
    let preference = Preference::from_json(key, value)?;
    let description = preference.describe();

    manager.save_preference(preference).await;
    println!("Saved {}", description);
    Ok(())
}

async fn cmd_query(manager: &MemoryManager, text: &str) -> Result<()> {
    manager.record_query(text).await;
    let facts = manager.extract_facts(text).await;

    if facts.is_empty() {
        println!("No facts found.");
        return Ok(());
    }
    if let Some(field) = &facts.career_field {
        println!("Career field: {}", field);
    }
    if !facts.locations.is_empty() {
        let locations: Vec<&str> = facts.locations.iter().map(String::as_str).collect();
        println!("Locations:    {}", locations.join(", "));
    }
    if !facts.skills.is_empty() {
        let skills: Vec<&str> = facts.skills.iter().map(String::as_str).collect();
        println!("Skills:       {}", skills.join(", "));
    }
    Ok(())
}

async fn cmd_turn(manager: &MemoryManager, message: &str, reply: String) -> Result<()> {
    let responder = FixedResponder { reply };
    let reply = manager.process_turn(message, &responder).await;
    println!("{}", reply.content);
    Ok(())
}

async fn cmd_similar(manager: &MemoryManager, text: &str, limit: usize) -> Result<()> {
    let results = manager.find_similar_scored(text, limit).await;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    println!("{:<8}  {:<22}  {}", "SCORE", "WHEN", "CONTENT");
    println!("{}", "-".repeat(80));

    for result in &results {
        let content = match result.profile.conversation_history.as_slice() {
            [interaction] if result.profile.previous_queries.is_empty() => format!(
                "{} -> {}",
                interaction.user_message, interaction.assistant_response
            ),
            _ => "(current profile)".to_string(),
        };
        println!(
            "{:<8.4}  {:<22}  {}",
            result.score,
            format_timestamp(result.profile.last_interaction_date),
            truncate(&content, 46)
        );
    }
    Ok(())
}

fn cmd_stats(config: &MemoryConfig) -> Result<()> {
    if matches!(config.backend, BackendKind::Ephemeral | BackendKind::Qdrant) {
        println!("Stats are only available for the local database.");
        return Ok(());
    }

    let db = ProfileDb::open(config.db_path.as_deref())?;
    let stats = db.stats()?;

    println!("=== Career Compass Memory Stats ===");
    println!("Database: {}", stats.path.display());
    println!("Records:  {}", stats.records);
    println!("Size:     {} bytes", stats.total_bytes);
    Ok(())
}

async fn cmd_clear(manager: &MemoryManager) -> Result<()> {
    manager.clear().await;
    println!("Memory cleared.");
    Ok(())
}
