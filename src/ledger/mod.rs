//! Ledger indexer access
//!
//! The monitor and the dispenser query talk to the ledger through the
//! `LedgerClient` trait so they can run against fakes in tests. The HTTP
//! implementation lives in `counterparty.rs`.

pub mod counterparty;

use crate::errors::BotResult;
use async_trait::async_trait;

pub use counterparty::CounterpartyClient;

/// Marketplace venue a ledger event originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Dispenser,
    Dex,
}

/// A raw sale observation. Carries no price; the unit price and payment
/// asset come from the originating listing.
#[derive(Debug, Clone)]
pub struct SaleEvent {
    pub tx_hash: String,
    pub status: String,
    pub asset: String,
    pub quantity: i64,
    pub block_index: i64,
    pub timestamp: i64,
    /// Hash of the listing this sale executed against
    pub listing_hash: String,
    pub venue: Venue,
}

impl SaleEvent {
    /// Only ledger-final sales are admitted
    pub fn is_final(&self) -> bool {
        matches!(self.status.as_str(), "valid" | "completed")
    }
}

/// A raw listing observation
#[derive(Debug, Clone)]
pub struct ListingEvent {
    pub tx_hash: String,
    pub status: String,
    pub asset: String,
    pub give_quantity: i64,
    pub give_remaining: i64,
    /// Smallest payment unit per asset unit
    pub unit_price: i64,
    pub payment_asset: String,
    pub block_index: i64,
    pub timestamp: i64,
    pub source: String,
    pub escrow_quantity: i64,
    pub venue: Venue,
}

impl ListingEvent {
    pub fn is_open(&self) -> bool {
        self.status == "open"
    }
}

/// Read access to the ledger indexer
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Current chain height
    async fn current_height(&self) -> BotResult<i64>;

    /// Sales confirmed at or after the given block
    async fn sales_since(&self, block: i64) -> BotResult<Vec<SaleEvent>>;

    /// Listings confirmed at or after the given block; `None` returns the
    /// currently open listings regardless of age
    async fn listings_since(&self, block: Option<i64>) -> BotResult<Vec<ListingEvent>>;

    /// All listings for one asset, any status
    async fn listings_for_asset(&self, asset: &str) -> BotResult<Vec<ListingEvent>>;
}
