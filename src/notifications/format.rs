//! Message rendering
//!
//! The rendered text is a parsing surface for humans: chat clients line up
//! these alerts visually, so the layout here is a contract and must not drift.

use crate::types::{Transaction, TransactionType};
use chrono::DateTime;
use num_format::{Locale, ToFormattedString};

const SALE_ICON: &str = "💰";
const LISTING_ICON: &str = "🏷️";
const DISPENSER_ICON: &str = "🎰";
const DEX_ICON: &str = "⚖️";

/// Smallest-unit integer to decimal string: divide by 10^8 and strip
/// trailing zeros. Zero renders as "0".
pub fn format_price(units: i64) -> String {
    if units == 0 {
        return "0".to_string();
    }

    let whole = units / 100_000_000;
    let frac = units % 100_000_000;
    if frac == 0 {
        whole.to_string()
    } else {
        let digits = format!("{:08}", frac);
        format!("{}.{}", whole, digits.trim_end_matches('0'))
    }
}

/// Integer quantity with thousands separators
pub fn format_quantity(value: i64) -> String {
    value.to_formatted_string(&Locale::en)
}

/// Unix seconds to `MMM DD HH:mm UTC`
pub fn format_timestamp(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.format("%b %d %H:%M UTC").to_string())
        .unwrap_or_default()
}

fn venue_icon(tx_type: TransactionType) -> &'static str {
    match tx_type {
        TransactionType::DispenserSale | TransactionType::DispenserListing => DISPENSER_ICON,
        TransactionType::DexSale | TransactionType::DexListing => DEX_ICON,
    }
}

/// Render a transaction to its two-line alert text
pub fn render(tx: &Transaction) -> String {
    let detail = format!(
        "{} | Block {} | {} {}",
        format_timestamp(tx.timestamp),
        tx.block_index,
        if tx.tx_type.is_sale() {
            tx.explorer_link()
        } else {
            tx.market_link()
        },
        venue_icon(tx.tx_type)
    );

    if tx.tx_type.is_sale() {
        format!(
            "{} SOLD: {} x{} | Paid: {} {}\n{}",
            SALE_ICON,
            tx.asset,
            format_quantity(tx.amount),
            format_price(tx.price),
            tx.payment_asset,
            detail
        )
    } else {
        format!(
            "{} LISTING: {} | Qty: {} | Price: {} {}\n{}",
            LISTING_ICON,
            tx.asset,
            format_quantity(tx.amount),
            format_price(tx.price),
            tx.payment_asset,
            detail
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale() -> Transaction {
        Transaction {
            tx_hash: "abcd".to_string(),
            tx_type: TransactionType::DispenserSale,
            asset: "FAKERARE".to_string(),
            amount: 1500,
            price: 150_000_000,
            payment_asset: "BTC".to_string(),
            timestamp: 1_700_000_000, // Nov 14 22:13 UTC
            block_index: 820_000,
            notified: false,
            created_at: 0,
        }
    }

    #[test]
    fn price_strips_trailing_zeros() {
        assert_eq!(format_price(150_000_000), "1.5");
        assert_eq!(format_price(100_000_000), "1");
        assert_eq!(format_price(0), "0");
        assert_eq!(format_price(1), "0.00000001");
        assert_eq!(format_price(2_000_000), "0.02");
        assert_eq!(format_price(123_456_789), "1.23456789");
    }

    #[test]
    fn quantities_use_thousands_separators() {
        assert_eq!(format_quantity(5), "5");
        assert_eq!(format_quantity(1500), "1,500");
        assert_eq!(format_quantity(1_000_000), "1,000,000");
    }

    #[test]
    fn timestamp_is_month_day_time_utc() {
        assert_eq!(format_timestamp(1_700_000_000), "Nov 14 22:13 UTC");
    }

    #[test]
    fn sale_rendering_is_exact() {
        let expected = "💰 SOLD: FAKERARE x1,500 | Paid: 1.5 BTC\n\
                        Nov 14 22:13 UTC | Block 820000 | https://www.xchain.io/tx/abcd 🎰";
        assert_eq!(render(&sale()), expected);
    }

    #[test]
    fn listing_rendering_is_exact() {
        let tx = Transaction {
            tx_type: TransactionType::DexListing,
            amount: 10,
            price: 2_000_000,
            payment_asset: "XCP".to_string(),
            ..sale()
        };
        let expected = "🏷️ LISTING: FAKERARE | Qty: 10 | Price: 0.02 XCP\n\
                        Nov 14 22:13 UTC | Block 820000 | https://www.xchain.io/trade/FAKERARE_XCP ⚖️";
        assert_eq!(render(&tx), expected);
    }
}
