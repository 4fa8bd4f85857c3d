use std::sync::Arc;

use futures::StreamExt;

use chat_sentinel::channels::TelegramSession;
use chat_sentinel::config::Config;
use chat_sentinel::pipeline::types::EventSource;
use chat_sentinel::pipeline::{MessageProcessor, RuleEngine};
use chat_sentinel::store::{LibSqlStore, MessageStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = Config::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export TELEGRAM_BOT_TOKEN=123456:ABC-...");
        std::process::exit(1);
    });

    eprintln!("🛡  Chat Sentinel v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Database: {}", config.db_path.display());

    // ── Database ─────────────────────────────────────────────────────────
    let store = LibSqlStore::open_local(&config.db_path)
        .await
        .unwrap_or_else(|e| {
            eprintln!(
                "Error: Failed to open database at {}: {}",
                config.db_path.display(),
                e
            );
            std::process::exit(1);
        });
    let store: Arc<dyn MessageStore> = Arc::new(store);

    match store.count().await {
        Ok(n) => eprintln!("   Stored messages: {n}"),
        Err(e) => tracing::warn!("Could not count stored messages: {e}"),
    }

    // ── Telegram session ─────────────────────────────────────────────────
    let session = TelegramSession::new(config.bot_token);
    session.health_check().await?;
    eprintln!("   Telegram: connected\n");

    let mut events = session.start().await?;

    // ── Ingest loop ──────────────────────────────────────────────────────
    let processor = MessageProcessor::new(Arc::clone(&store), RuleEngine::default_rules());

    let (tx, rx) = tokio::sync::mpsc::channel(256);
    tokio::spawn(async move {
        while let Some(event) = events.next().await {
            if tx.send(event).await.is_err() {
                break;
            }
        }
    });

    tokio::select! {
        _ = processor.run(rx) => {
            tracing::info!("Event stream ended");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
