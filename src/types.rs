//! Shared event and transaction types

use serde::{Deserialize, Serialize};

/// Closed set of market event categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    DispenserSale,
    DispenserListing,
    DexSale,
    DexListing,
}

impl TransactionType {
    /// Stable code stored in the database
    pub fn as_code(&self) -> &'static str {
        match self {
            TransactionType::DispenserSale => "dispenser_sale",
            TransactionType::DispenserListing => "dispenser_listing",
            TransactionType::DexSale => "dex_sale",
            TransactionType::DexListing => "dex_listing",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "dispenser_sale" => Some(TransactionType::DispenserSale),
            "dispenser_listing" => Some(TransactionType::DispenserListing),
            "dex_sale" => Some(TransactionType::DexSale),
            "dex_listing" => Some(TransactionType::DexListing),
            _ => None,
        }
    }

    pub fn is_sale(&self) -> bool {
        matches!(self, TransactionType::DispenserSale | TransactionType::DexSale)
    }

    pub fn is_listing(&self) -> bool {
        !self.is_sale()
    }
}

/// A ledger-confirmed market event. Immutable once stored, except the
/// `notified` flag which flips after delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub tx_hash: String,
    pub tx_type: TransactionType,
    pub asset: String,
    pub amount: i64,
    /// Smallest payment unit. For sales the total paid, for listings the unit price.
    pub price: i64,
    pub payment_asset: String,
    /// Unix seconds, ledger block time
    pub timestamp: i64,
    pub block_index: i64,
    pub notified: bool,
    /// Unix seconds, ingestion time
    pub created_at: i64,
}

impl Transaction {
    /// Block-explorer link for the confirming transaction
    pub fn explorer_link(&self) -> String {
        format!("https://www.xchain.io/tx/{}", self.tx_hash)
    }

    /// Market page for the listing venue, keyed by asset and quote asset
    pub fn market_link(&self) -> String {
        let venue = match self.tx_type {
            TransactionType::DispenserSale | TransactionType::DispenserListing => "dispensers",
            TransactionType::DexSale | TransactionType::DexListing => "trade",
        };
        format!(
            "https://www.xchain.io/{}/{}_{}",
            venue, self.asset, self.payment_asset
        )
    }
}

/// Live view of one open dispenser. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispenserSnapshot {
    pub tx_hash: String,
    pub source: String,
    pub asset: String,
    pub escrow_quantity: i64,
    pub give_quantity: i64,
    pub give_remaining: i64,
    pub unit_price: i64,
    pub block_index: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_codes_round_trip() {
        for t in [
            TransactionType::DispenserSale,
            TransactionType::DispenserListing,
            TransactionType::DexSale,
            TransactionType::DexListing,
        ] {
            assert_eq!(TransactionType::from_code(t.as_code()), Some(t));
        }
        assert_eq!(TransactionType::from_code("sale"), None);
    }

    #[test]
    fn sale_and_listing_classification() {
        assert!(TransactionType::DispenserSale.is_sale());
        assert!(TransactionType::DexSale.is_sale());
        assert!(TransactionType::DispenserListing.is_listing());
        assert!(TransactionType::DexListing.is_listing());
    }

    #[test]
    fn explorer_links() {
        let tx = Transaction {
            tx_hash: "abc123".to_string(),
            tx_type: TransactionType::DexListing,
            asset: "PEPECASH".to_string(),
            amount: 1,
            price: 100,
            payment_asset: "XCP".to_string(),
            timestamp: 0,
            block_index: 1,
            notified: false,
            created_at: 0,
        };
        assert_eq!(tx.explorer_link(), "https://www.xchain.io/tx/abc123");
        assert_eq!(tx.market_link(), "https://www.xchain.io/trade/PEPECASH_XCP");
    }
}
