use std::path::PathBuf;
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use game_image_cache::{CacheConfig, GameImageCache, DEFAULT_SOURCE};

#[derive(Parser)]
#[command(name = "game-image-cache")]
#[command(about = "Inspect and maintain a game image cache snapshot", long_about = None)]
struct Cli {
    /// Snapshot file (defaults to GAME_IMAGE_CACHE_FILE or cache/image-cache.json)
    #[arg(short, long)]
    cache_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print cache statistics as JSON
    Stats,

    /// Print the cached images for a game
    Get {
        /// Game name
        game: String,

        /// Provider tag
        #[arg(short, long, default_value = DEFAULT_SOURCE)]
        source: String,
    },

    /// List resident keys with their source and expiry
    Keys,

    /// Remove one game's entry
    Invalidate {
        /// Game name
        game: String,

        /// Provider tag
        #[arg(short, long, default_value = DEFAULT_SOURCE)]
        source: String,
    },

    /// Drop expired entries and rewrite the snapshot
    Cleanup,

    /// Remove every entry
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "game_image_cache=info".into())
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = CacheConfig::from_env().context("Invalid cache configuration")?;
    if let Some(path) = cli.cache_file {
        config.cache_file = path;
    }
    let cache = GameImageCache::for_game_images(config).await?;

    match cli.command {
        Commands::Stats => {
            let stats = cache.stats().await;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Commands::Get { ref game, ref source } => {
            match cache.get(game, source).await {
                Some(images) => println!("{}", serde_json::to_string_pretty(&images)?),
                None => bail!("No cached images for {:?} ({})", game, source),
            }
        }

        Commands::Keys => {
            let entries = cache.entries().await;
            if entries.is_empty() {
                println!("Cache is empty: {}", cache.snapshot_path().display());
            }
            for (key, entry) in entries {
                let remaining = match entry.time_until_expiration() {
                    Some(left) => format!("{}s left", left.as_secs()),
                    None => "expired".to_string(),
                };
                println!(
                    "{}  {}  expires {} ({})  hits {}",
                    key,
                    entry.source,
                    entry.expires_at.format("%Y-%m-%d %H:%M:%S"),
                    remaining,
                    entry.access_count
                );
            }
        }

        Commands::Invalidate { ref game, ref source } => {
            if cache.invalidate(game, source).await {
                println!("Invalidated {:?} ({})", game, source);
            } else {
                println!("Nothing cached for {:?} ({})", game, source);
            }
        }

        Commands::Cleanup => {
            let removed = cache.cleanup().await;
            // A non-zero cleanup has already rewritten the snapshot
            if removed == 0 && !cache.flush().await {
                bail!("Could not write snapshot {}", cache.snapshot_path().display());
            }
            println!(
                "Removed {} expired entries, {} remain",
                removed,
                cache.len().await
            );
        }

        Commands::Clear => {
            let count = cache.len().await;
            cache.clear().await;
            println!("Cleared {} entries", count);
        }
    }

    Ok(())
}
