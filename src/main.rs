mod api;
mod callback;
mod commands;
mod dialogue;
mod gateway;
mod keyboards;
mod render;
mod timeparse;

use clap::{Parser, Subcommand};
use nudge_channels::telegram::TelegramChannel;
use nudge_core::config::{self, shellexpand, Config};
use nudge_store::Store;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "nudge", version, about = "Reminders in your Telegram chat")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Print the configuration summary and reminder counts.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut cfg = config::load(&cli.config)?;
    cfg.apply_env(|name| std::env::var(name).ok())?;

    let _guard = init_tracing(&cfg);

    match cli.command {
        Commands::Start => {
            let Some(tg) = cfg.telegram() else {
                anyhow::bail!(
                    "Telegram is not configured. Set bot_token under [channel.telegram] \
                     in {} or the TELEGRAM_BOT_TOKEN env var.",
                    cli.config
                );
            };
            let channel = Arc::new(TelegramChannel::new(tg.clone()));
            let store = Store::new(&cfg.store).await?;

            println!("nudge: starting bot...");
            let gw = Arc::new(gateway::Gateway::new(channel, store, &cfg));
            gw.run().await?;
        }
        Commands::Status => {
            println!("nudge status\n");
            println!("Config: {}", cli.config);
            println!(
                "  telegram: {}",
                match &cfg.channel.telegram {
                    Some(tg) if tg.enabled && !tg.bot_token.is_empty() => "configured",
                    Some(tg) if tg.enabled => "enabled but missing bot_token",
                    Some(_) => "disabled",
                    None => "not configured",
                }
            );
            println!(
                "  scheduler: {}",
                if cfg.scheduler.enabled {
                    format!("every {}s", cfg.scheduler.poll_interval_secs)
                } else {
                    "disabled".to_string()
                }
            );
            println!(
                "  health: {}",
                if cfg.health.enabled {
                    format!("{}:{}", cfg.health.host, cfg.health.port)
                } else {
                    "disabled".to_string()
                }
            );
            println!();

            let store = Store::new(&cfg.store).await?;
            let (active, pending, total) = store.counts().await?;
            println!("Database: {}", shellexpand(&cfg.store.db_path));
            println!("  size: {} bytes", store.db_size().await?);
            println!("  reminders: {total} total, {active} active, {pending} pending");
        }
    }

    Ok(())
}

/// Console logging, plus a daily rotated file under `{data_dir}/logs` when enabled.
///
/// `RUST_LOG` overrides the configured level. The returned guard flushes the
/// file writer on drop.
fn init_tracing(cfg: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cfg.bot.log_level));

    let (file_layer, guard) = if cfg.bot.log_to_file {
        let dir = PathBuf::from(shellexpand(&cfg.bot.data_dir)).join("logs");
        let appender = tracing_appender::rolling::daily(dir, "nudge.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}
