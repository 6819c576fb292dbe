use clap::Parser;
use std::sync::Arc;
use tokio::time::Duration;
use xcpbot::{
    arguments::Args,
    config::Config,
    ledger::CounterpartyClient,
    logger::{self, LogTag},
    monitor::{self, TransactionMonitor},
    notifications::{NotificationFanout, TelegramApi},
    shutdown::Shutdown,
    store::{self, TransactionStore},
};

/// Main entry point for xcpbot
///
/// Resolves the dependency graph once, leaves first: config → store →
/// ledger client → notification fan-out → monitor. Any failure here is
/// fatal; nothing downstream is usable without its dependencies.
#[tokio::main]
async fn main() {
    logger::init();
    let args = Args::parse();

    let mut config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            logger::error(
                LogTag::System,
                &format!("failed to load config '{}': {}", args.config, e),
            );
            std::process::exit(1);
        }
    };

    if let Some(db) = &args.db {
        config.database_path = db.clone();
    }

    if let Err(e) = config.validate() {
        logger::error(LogTag::System, &format!("invalid configuration: {}", e));
        std::process::exit(1);
    }

    logger::info(LogTag::System, "🚀 xcpbot starting up...");

    let store = match TransactionStore::open(&config.database_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            logger::error(
                LogTag::Store,
                &format!("failed to open database '{}': {}", config.database_path, e),
            );
            std::process::exit(1);
        }
    };

    match store.stats() {
        Ok(stats) => logger::info(
            LogTag::Store,
            &format!(
                "database ready: {} transactions ({} sales, {} listings)",
                stats.total, stats.sales, stats.listings
            ),
        ),
        Err(e) => logger::warn(LogTag::Store, &format!("could not read stats: {}", e)),
    }

    let client = match CounterpartyClient::new(&config.api_base) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            logger::error(LogTag::Ledger, &format!("failed to build client: {}", e));
            std::process::exit(1);
        }
    };

    let chat_api = match TelegramApi::new(&config.bot_token) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            logger::error(LogTag::Notify, &format!("failed to build Telegram API: {}", e));
            std::process::exit(1);
        }
    };

    let chat_ids = config.chat_ids().unwrap_or_default();
    let fanout = Arc::new(NotificationFanout::new(
        chat_api,
        chat_ids,
        config.sale_attachment_id.clone(),
        store.clone(),
    ));

    let allow_asset = if config.watched_assets.is_empty() {
        monitor::allow_all()
    } else {
        monitor::allow_list(config.watched_assets.clone())
    };

    let mut tx_monitor = TransactionMonitor::new(
        client,
        store.clone(),
        fanout,
        allow_asset,
        Duration::from_secs(config.poll_interval_secs),
    );

    if args.once {
        if let Err(e) = tx_monitor.init_cursor().await {
            logger::error(LogTag::Monitor, &format!("failed to resolve height: {}", e));
            std::process::exit(1);
        }
        match tx_monitor.run_cycle().await {
            Ok(stats) => logger::success(
                LogTag::Monitor,
                &format!(
                    "single cycle: {} fetched, {} new, cursor {}",
                    stats.fetched, stats.inserted, stats.cursor
                ),
            ),
            Err(e) => {
                logger::error(LogTag::Monitor, &format!("single cycle failed: {}", e));
                std::process::exit(1);
            }
        }
        return;
    }

    let shutdown = Arc::new(Shutdown::new());
    let purge_handle = store::spawn_purge_task(store, shutdown.clone());

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                logger::info(LogTag::System, "shutdown requested");
                shutdown.trigger();
            }
        });
    }

    tx_monitor.run(shutdown).await;
    let _ = purge_handle.await;

    logger::info(LogTag::System, "xcpbot stopped");
}
