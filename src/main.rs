// ABOUTME: Main entry point for the lmgram Telegram relay
// ABOUTME: Parses the CLI, loads config, sets up logging and metrics, then runs the poll loop

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lmgram::logging;
use lmgram::platform::TelegramPlatform;
use lmgram_core::commands::command_hints;
use lmgram_core::config::Config;
use lmgram_core::{ChatClient, Dispatcher, HttpInferenceClient, InferenceClient, SessionStore, Turn};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_stream::StreamExt;

#[derive(Parser)]
#[command(name = "lmgram")]
#[command(about = "Relay Telegram chats to a locally hosted language model", long_about = None)]
struct Cli {
    /// Path to config.toml (overrides the default search)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot (default)
    Run,
    /// Print the effective configuration with secrets redacted
    Config,
    /// Send one test prompt to the inference endpoint
    Ping {
        /// Prompt to send
        #[arg(default_value = "Say hello in one short sentence.")]
        prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up panic hook to log panics before they crash the process
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\nPANIC! lmgram crashed with the following error:\n");
        eprintln!("{}", panic_info);
        eprintln!("\nBacktrace:");
        eprintln!("{:?}", std::backtrace::Backtrace::force_capture());
    }));

    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    let config = Config::load_from(cli.config.as_deref())?;
    let _log_guard = logging::init(&config.logging)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config).await,
        Commands::Config => {
            println!("{:#?}", config);
            Ok(())
        }
        Commands::Ping { prompt } => ping(config, &prompt).await,
    }
}

async fn run(config: Config) -> Result<()> {
    tracing::info!(
        inference_url = %config.inference.url,
        model = %config.inference.model,
        transcript_format = ?config.inference.transcript_format,
        "Starting lmgram"
    );

    if let Some(addr) = config.metrics.listen {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        tracing::info!(listen = %addr, "Prometheus metrics endpoint enabled");
    }

    let inference: Arc<dyn InferenceClient> =
        Arc::new(HttpInferenceClient::new(config.inference.clone())?);
    let platform = Arc::new(TelegramPlatform::new(&config.telegram).await?);

    if let Err(e) = platform.register_commands(&command_hints()).await {
        tracing::warn!(error = %e, "Could not register command menu, continuing without it");
    }

    let chat: Arc<dyn ChatClient> = platform.clone();
    let dispatcher = Arc::new(Dispatcher::new(SessionStore::new(), chat, inference));

    let mut events = platform.event_stream();
    tracing::info!(bot_username = %platform.bot_username(), "Bot ready, polling for messages");

    loop {
        tokio::select! {
            event = events.next() => {
                let Some(msg) = event else {
                    tracing::warn!("Event stream ended");
                    break;
                };
                let dispatcher = Arc::clone(&dispatcher);
                tokio::spawn(async move {
                    dispatcher.dispatch(msg).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!(
                    users = dispatcher.sessions().user_count(),
                    "Shutdown requested, stopping"
                );
                break;
            }
        }
    }

    Ok(())
}

async fn ping(config: Config, prompt: &str) -> Result<()> {
    let client = HttpInferenceClient::new(config.inference)?;
    let started = std::time::Instant::now();

    match client.complete(&[Turn::user(prompt)]).await {
        Ok(reply) => {
            println!("{}", reply);
            tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "Ping succeeded");
            Ok(())
        }
        Err(e) => anyhow::bail!("Inference ping failed ({}): {}", e.kind(), e),
    }
}
