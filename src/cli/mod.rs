use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::ai::chat::SessionMode;
use crate::core::AppConfig;

pub mod chat;
pub mod generate;
pub mod serve;

#[derive(Subcommand)]
enum Command {
    /// Run the chat API server for the website widget
    Serve {
        /// Set the server host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Set the server port
        #[arg(long, default_value = "2222")]
        port: String,
    },
    /// Start an interactive chat with the assistant
    Chat {
        /// Send every message in a fresh session with no memory of
        /// earlier turns
        #[arg(long, action, default_value = "false")]
        per_message: bool,
    },
    /// Generate a still image from a prompt
    Image {
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = "image.png")]
        out: String,
    },
    /// Generate a short video from a prompt
    Video {
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = "video.mp4")]
        out: String,
    },
    /// Generate spoken audio (raw PCM) from text
    Speech {
        #[arg(long)]
        text: String,
        #[arg(long, default_value = "speech.pcm")]
        out: String,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run() -> Result<()> {
    let args = Cli::parse();

    let Some(command) = args.command else {
        return Ok(());
    };

    match &command {
        // tower_http logs each request at debug
        Command::Serve { .. } => init_tracing(&format!(
            "{}=debug,tower_http=debug,axum::rejection=trace",
            env!("CARGO_CRATE_NAME")
        )),
        // Keep the terminal quiet unless something goes wrong
        _ => init_tracing(&format!("{}=warn", env!("CARGO_CRATE_NAME"))),
    }

    // Fails here, before any request, when the API key is missing
    let mut config = AppConfig::from_env()?;

    match command {
        Command::Serve { host, port } => {
            serve::run(host, port, config).await?;
        }
        Command::Chat { per_message } => {
            if per_message {
                config.session_mode = SessionMode::PerMessage;
            }
            chat::run(config).await?;
        }
        Command::Image { prompt, out } => {
            generate::image(&config, &prompt, &out).await?;
        }
        Command::Video { prompt, out } => {
            generate::video(&config, &prompt, &out).await?;
        }
        Command::Speech { text, out } => {
            generate::speech(&config, &text, &out).await?;
        }
    }

    Ok(())
}
