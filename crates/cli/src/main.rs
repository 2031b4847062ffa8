//! Doki CLI: the main entry point.
//!
//! Commands:
//! - `onboard`  : write the default config
//! - `chat`     : interactive or single-message study session
//! - `classify` : show which subject and topic a message belongs to
//! - `moderate` : run the safety gate on a message
//! - `profile`  : mastery overview and leaderboard for a learner
//! - `health`   : check the language backend

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "doki",
    about = "Doki, an educational study assistant",
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
    /// Write the default configuration
    Onboard,

    /// Study with Doki
    Chat {
        /// Learner id used for mastery and recall
        #[arg(short, long, default_value = "local_user", env = "DOKI_USER")]
        user: String,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Detect the subject and topic of a message
    Classify {
        text: String,

        /// Print the detection as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a message with the safety gate
    Moderate {
        text: String,

        /// Print the verdict as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a learner's mastery profile
    Profile {
        #[arg(short, long, default_value = "local_user", env = "DOKI_USER")]
        user: String,

        /// Print the overview as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that the language backend is reachable
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Chat { user, message } => commands::chat::run(&user, message).await?,
        Commands::Classify { text, json } => commands::classify::run(&text, json)?,
        Commands::Moderate { text, json } => commands::moderate::run(&text, json)?,
        Commands::Profile { user, json } => commands::profile::run(&user, json).await?,
        Commands::Health => commands::health::run().await?,
    }

    Ok(())
}
