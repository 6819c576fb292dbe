//! Live dispenser snapshot query
//!
//! Stateless view of the open listings for one asset, straight from the
//! ledger. Nothing here touches the store.

use crate::errors::BotResult;
use crate::ledger::{LedgerClient, ListingEvent};
use crate::logger::{self, LogTag};
use crate::types::DispenserSnapshot;
use std::sync::Arc;

pub const DEFAULT_LIMIT: usize = 10;

pub struct DispenserQuery {
    client: Arc<dyn LedgerClient>,
}

impl DispenserQuery {
    pub fn new(client: Arc<dyn LedgerClient>) -> Self {
        Self { client }
    }

    /// Open listings for `asset` with stock remaining, cheapest first,
    /// capped at `limit` (default 10). Upstream errors propagate.
    pub async fn query(
        &self,
        asset: &str,
        limit: Option<usize>,
    ) -> BotResult<Vec<DispenserSnapshot>> {
        let cap = limit.unwrap_or(DEFAULT_LIMIT);
        let listings = self.client.listings_for_asset(asset).await?;

        let mut open: Vec<DispenserSnapshot> = listings
            .into_iter()
            .filter(|l| l.is_open() && l.give_remaining > 0)
            .map(snapshot)
            .collect();
        open.sort_by_key(|s| s.unit_price);
        open.truncate(cap);

        logger::debug(
            LogTag::Dispenser,
            &format!("{} open listings for {}", open.len(), asset),
        );
        Ok(open)
    }
}

fn snapshot(listing: ListingEvent) -> DispenserSnapshot {
    DispenserSnapshot {
        tx_hash: listing.tx_hash,
        source: listing.source,
        asset: listing.asset,
        escrow_quantity: listing.escrow_quantity,
        give_quantity: listing.give_quantity,
        give_remaining: listing.give_remaining,
        unit_price: listing.unit_price,
        block_index: listing.block_index,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{BotError, BotResult};
    use crate::ledger::{SaleEvent, Venue};
    use async_trait::async_trait;

    struct FakeLedger {
        listings: Vec<ListingEvent>,
        fail: bool,
    }

    #[async_trait]
    impl LedgerClient for FakeLedger {
        async fn current_height(&self) -> BotResult<i64> {
            Ok(0)
        }

        async fn sales_since(&self, _block: i64) -> BotResult<Vec<SaleEvent>> {
            Ok(Vec::new())
        }

        async fn listings_since(&self, _block: Option<i64>) -> BotResult<Vec<ListingEvent>> {
            Ok(Vec::new())
        }

        async fn listings_for_asset(&self, asset: &str) -> BotResult<Vec<ListingEvent>> {
            if self.fail {
                return Err(BotError::Ledger("indexer down".to_string()));
            }
            Ok(self
                .listings
                .iter()
                .filter(|l| l.asset == asset)
                .cloned()
                .collect())
        }
    }

    fn listing(hash: &str, status: &str, remaining: i64, unit_price: i64) -> ListingEvent {
        ListingEvent {
            tx_hash: hash.to_string(),
            status: status.to_string(),
            asset: "FAKERARE".to_string(),
            give_quantity: 10,
            give_remaining: remaining,
            unit_price,
            payment_asset: "BTC".to_string(),
            block_index: 820_000,
            timestamp: 1_700_000_000,
            source: "1PepeAddr".to_string(),
            escrow_quantity: 10,
            venue: Venue::Dispenser,
        }
    }

    #[tokio::test]
    async fn filters_sorts_and_caps() {
        let query = DispenserQuery::new(Arc::new(FakeLedger {
            listings: vec![
                listing("a", "open", 5, 3_000_000),
                listing("b", "open", 5, 1_000_000),
                listing("c", "closed", 5, 500_000),
                listing("d", "open", 0, 100_000),
                listing("e", "open", 5, 2_000_000),
            ],
            fail: false,
        }));

        let snapshots = query.query("FAKERARE", Some(2)).await.unwrap();
        let hashes: Vec<&str> = snapshots.iter().map(|s| s.tx_hash.as_str()).collect();
        assert_eq!(hashes, vec!["b", "e"]);
    }

    #[tokio::test]
    async fn default_cap_is_ten() {
        let listings = (0..15)
            .map(|i| listing(&format!("d{}", i), "open", 1, 1_000 + i as i64))
            .collect();
        let query = DispenserQuery::new(Arc::new(FakeLedger {
            listings,
            fail: false,
        }));

        let snapshots = query.query("FAKERARE", None).await.unwrap();
        assert_eq!(snapshots.len(), 10);
    }

    #[tokio::test]
    async fn upstream_errors_propagate() {
        let query = DispenserQuery::new(Arc::new(FakeLedger {
            listings: Vec::new(),
            fail: true,
        }));
        assert!(query.query("FAKERARE", None).await.is_err());
    }
}
