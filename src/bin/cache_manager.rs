use anyhow::Result;
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use yt_ai_transcript::{Config, VideoCache};

#[derive(Parser)]
#[command(name = "cache-manager")]
#[command(about = "Video transcript cache management utility")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Cache directory (defaults to the configured one)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List cached videos, most recently used first
    List,
    /// Get cache statistics
    Stats,
    /// Remove one video from the cache
    Remove {
        /// Video ID to remove
        video_id: String,
    },
    /// Clear all cached videos
    Clear,
    /// Clear all chat histories
    ClearChat,
}

fn format_millis(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }),
    };

    let cache = match cli.cache_dir {
        Some(dir) => VideoCache::new(dir, config.cache.max_entries),
        None => VideoCache::from_config(&config.cache),
    };
    info!("📁 Cache file: {}", cache.path().display());

    match cli.command {
        Commands::List => {
            let entries = cache.list().await?;

            if entries.is_empty() {
                info!("📭 No cached videos found");
                return Ok(());
            }

            info!("📚 Found {} cached videos:", entries.len());
            for entry in entries {
                let transcript = if entry.has_transcript {
                    format!("{} segments", entry.segment_count)
                } else {
                    "no transcript".to_string()
                };
                let summary = if entry.has_summary { "✅ summary" } else { "❌ no summary" };
                info!("  {} - {}, {}", entry.video_id, transcript, summary);
                info!(
                    "    cached {}, last used {}",
                    format_millis(entry.cached_at),
                    format_millis(entry.last_accessed)
                );
            }
        }

        Commands::Stats => {
            let stats = cache.stats().await?;
            info!("📊 Cache Statistics:");
            info!("  Cached videos: {}", stats.video_count);
            info!("  Chat histories: {}", stats.chat_count);
            info!("  Size on disk: {}", stats.size_human);
        }

        Commands::Remove { video_id } => {
            if cache.remove(&video_id).await? {
                info!("✅ Removed {} from the cache", video_id);
            } else {
                warn!("⚠️ Video not in cache: {}", video_id);
            }
        }

        Commands::Clear => {
            let removed = cache.clear().await?;
            info!("🧹 Cleared {} cached videos", removed);
        }

        Commands::ClearChat => {
            let removed = cache.clear_chat_history().await?;
            info!("🧹 Cleared {} chat histories", removed);
        }
    }

    Ok(())
}
