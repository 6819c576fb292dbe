//! Transaction monitor
//!
//! Drives the poll cycle: fetch sales and listings since the cursor,
//! admit final/open events, dedup against the store, resolve sale prices
//! through the open-listing set, insert, notify, advance the cursor.
//!
//! The cursor lives in memory only. A restart resets it to the current
//! chain height, so history from before process start is never replayed.

use crate::errors::BotResult;
use crate::ledger::{LedgerClient, ListingEvent, SaleEvent, Venue};
use crate::logger::{self, LogTag};
use crate::notifications::Notifier;
use crate::shutdown::Shutdown;
use crate::store::TransactionStore;
use crate::types::{Transaction, TransactionType};
use chrono::Utc;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

/// Asset admission predicate; accept-all by default
pub type AssetFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

pub fn allow_all() -> AssetFilter {
    Arc::new(|_| true)
}

pub fn allow_list(assets: Vec<String>) -> AssetFilter {
    Arc::new(move |asset| assets.iter().any(|a| a == asset))
}

/// Outcome of one poll cycle, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleStats {
    pub fetched: usize,
    pub inserted: usize,
    pub cursor: i64,
}

pub struct TransactionMonitor {
    client: Arc<dyn LedgerClient>,
    store: Arc<TransactionStore>,
    notifier: Arc<dyn Notifier>,
    allow_asset: AssetFilter,
    poll_interval: Duration,
    cursor: i64,
}

impl TransactionMonitor {
    const STARTUP_RETRY_SECS: u64 = 5;

    pub fn new(
        client: Arc<dyn LedgerClient>,
        store: Arc<TransactionStore>,
        notifier: Arc<dyn Notifier>,
        allow_asset: AssetFilter,
        poll_interval: Duration,
    ) -> Self {
        Self {
            client,
            store,
            notifier,
            allow_asset,
            poll_interval,
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    /// Point the cursor at the current chain height. No historical backfill:
    /// only events confirmed at or after this height are ever considered.
    pub async fn init_cursor(&mut self) -> BotResult<()> {
        self.cursor = self.client.current_height().await?;
        Ok(())
    }

    /// Recurring poll until shutdown. The first cycle runs immediately; a
    /// failed cycle is logged and retried on the next tick. An in-flight
    /// cycle always finishes before shutdown is honored.
    pub async fn run(mut self, shutdown: Arc<Shutdown>) {
        while self.cursor == 0 {
            match self.init_cursor().await {
                Ok(()) => break,
                Err(e) => {
                    logger::warn(
                        LogTag::Monitor,
                        &format!("waiting for ledger: {}", e),
                    );
                    tokio::select! {
                        _ = shutdown.wait() => return,
                        _ = sleep(Duration::from_secs(Self::STARTUP_RETRY_SECS)) => {}
                    }
                }
            }
        }

        logger::info(
            LogTag::Monitor,
            &format!("watching from block {}", self.cursor),
        );

        loop {
            if shutdown.is_triggered() {
                break;
            }

            match self.run_cycle().await {
                Ok(stats) if stats.inserted > 0 => logger::success(
                    LogTag::Monitor,
                    &format!(
                        "cycle done: {} fetched, {} new, cursor {}",
                        stats.fetched, stats.inserted, stats.cursor
                    ),
                ),
                Ok(stats) => logger::debug(
                    LogTag::Monitor,
                    &format!("cycle done: {} fetched, cursor {}", stats.fetched, stats.cursor),
                ),
                // Transient by policy: resume from the committed cursor next tick
                Err(e) => logger::error(LogTag::Monitor, &format!("poll cycle failed: {}", e)),
            }

            tokio::select! {
                _ = shutdown.wait() => break,
                _ = sleep(self.poll_interval) => {}
            }
        }

        logger::info(LogTag::Monitor, "monitor stopped");
    }

    /// One poll cycle. On error the cursor stays at its last committed
    /// value; already-inserted events are protected by the dedup guard.
    pub async fn run_cycle(&mut self) -> BotResult<CycleStats> {
        let (sales, listings) = tokio::join!(
            self.client.sales_since(self.cursor),
            self.client.listings_since(Some(self.cursor))
        );
        let sales = sales?;
        let listings = listings?;

        let fetched = sales.len() + listings.len();
        // Progress is driven by every fetched event, admitted or not, so a
        // block full of rejected events is never re-scanned forever
        let max_block = sales
            .iter()
            .map(|s| s.block_index)
            .chain(listings.iter().map(|l| l.block_index))
            .max();

        let mut inserted = 0;
        // Open listings for sale price resolution, fetched at most once
        let mut open_listings: Option<Vec<ListingEvent>> = None;

        for listing in &listings {
            if self.admit_listing(listing)? {
                let tx = self.map_listing(listing);
                if self.store.insert(&tx)? {
                    inserted += 1;
                    self.notifier.notify(&tx).await;
                }
            }
        }

        for sale in &sales {
            if !self.admit_sale(sale)? {
                continue;
            }
            if open_listings.is_none() {
                open_listings = Some(self.client.listings_since(None).await?);
            }
            let tx = self.map_sale(sale, open_listings.as_deref().unwrap_or(&[]));
            if self.store.insert(&tx)? {
                inserted += 1;
                self.notifier.notify(&tx).await;
            }
        }

        if let Some(max_block) = max_block {
            if max_block >= self.cursor {
                self.cursor = max_block + 1;
            }
        }

        Ok(CycleStats {
            fetched,
            inserted,
            cursor: self.cursor,
        })
    }

    fn admit_listing(&self, listing: &ListingEvent) -> BotResult<bool> {
        if !listing.is_open() || !(self.allow_asset)(&listing.asset) {
            return Ok(false);
        }
        // Cheap guard before the heavier mapping and insert path
        Ok(!self.store.exists(&listing.tx_hash)?)
    }

    fn admit_sale(&self, sale: &SaleEvent) -> BotResult<bool> {
        if !sale.is_final() || !(self.allow_asset)(&sale.asset) {
            return Ok(false);
        }
        Ok(!self.store.exists(&sale.tx_hash)?)
    }

    fn map_listing(&self, listing: &ListingEvent) -> Transaction {
        Transaction {
            tx_hash: listing.tx_hash.clone(),
            tx_type: match listing.venue {
                Venue::Dispenser => TransactionType::DispenserListing,
                Venue::Dex => TransactionType::DexListing,
            },
            asset: listing.asset.clone(),
            amount: listing.give_quantity,
            price: listing.unit_price,
            payment_asset: listing.payment_asset.clone(),
            timestamp: listing.timestamp,
            block_index: listing.block_index,
            notified: false,
            created_at: Utc::now().timestamp(),
        }
    }

    /// Sales carry no price of their own; it comes from the open listing
    /// they executed against. An unresolved price degrades to zero and
    /// never blocks ingestion.
    fn map_sale(&self, sale: &SaleEvent, open_listings: &[ListingEvent]) -> Transaction {
        let origin = open_listings
            .iter()
            .find(|l| l.tx_hash == sale.listing_hash);

        let (price, payment_asset) = match origin {
            Some(listing) => (
                listing.unit_price.saturating_mul(sale.quantity),
                listing.payment_asset.clone(),
            ),
            None => {
                logger::warn(
                    LogTag::Monitor,
                    &format!(
                        "no open listing {} for sale {}, price unresolved",
                        sale.listing_hash, sale.tx_hash
                    ),
                );
                (0, String::new())
            }
        };

        Transaction {
            tx_hash: sale.tx_hash.clone(),
            tx_type: match sale.venue {
                Venue::Dispenser => TransactionType::DispenserSale,
                Venue::Dex => TransactionType::DexSale,
            },
            asset: sale.asset.clone(),
            amount: sale.quantity,
            price,
            payment_asset,
            timestamp: sale.timestamp,
            block_index: sale.block_index,
            notified: false,
            created_at: Utc::now().timestamp(),
        }
    }
}
