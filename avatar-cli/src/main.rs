//! # avatar-sync
//!
//! CLI tool for inspecting and demonstrating Rooh Avatar phone/watch sync.
//!
//! ## Commands
//!
//! - `avatars`: List the selectable avatars
//! - `encode`: Encode a character into a wire envelope
//! - `decode`: Decode a hex envelope back into a character
//! - `demo`: Sync a character between two in-process devices
//!
//! ## Example
//!
//! ```bash
//! # Encode a character and keep the envelope hex
//! avatar-sync encode --avatar avatar_3 --age 30 --height 170 --weight 70
//!
//! # Decode it again
//! avatar-sync decode 81ae63686172...
//!
//! # Watch a phone push to its watch
//! RUST_LOG=avatar_client=debug avatar-sync demo
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;

use commands::{avatars, decode, demo, encode};
use config::CliConfig;

/// CLI tool for inspecting and demonstrating phone/watch avatar sync.
#[derive(Parser, Debug)]
#[command(name = "avatar-sync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the selectable avatars
    Avatars,

    /// Encode a character into a wire envelope
    Encode {
        /// Avatar image identifier
        #[arg(long)]
        avatar: Option<String>,

        /// Age
        #[arg(long, allow_negative_numbers = true)]
        age: Option<i64>,

        /// Height
        #[arg(long, allow_negative_numbers = true)]
        height: Option<i64>,

        /// Weight
        #[arg(long, allow_negative_numbers = true)]
        weight: Option<i64>,
    },

    /// Decode a hex envelope back into a character
    Decode {
        /// MessagePack envelope as hex
        envelope: String,
    },

    /// Sync a character between two in-process devices
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Logs go to stderr so command output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log.filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Avatars => {
            avatars::run(&config)?;
        }
        Commands::Encode {
            avatar,
            age,
            height,
            weight,
        } => {
            let overrides = encode::Overrides {
                avatar,
                age,
                height,
                weight,
            };
            encode::run(&config, overrides)?;
        }
        Commands::Decode { envelope } => {
            decode::run(&envelope)?;
        }
        Commands::Demo => {
            demo::run(&config).await?;
        }
    }

    Ok(())
}
