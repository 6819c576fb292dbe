//! HTTP client for a Counterparty-style indexer REST API

use super::{ListingEvent, SaleEvent, Venue};
use crate::errors::{BotError, BotResult};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

const HTTP_TIMEOUT_SECS: u64 = 30;

pub struct CounterpartyClient {
    http: reqwest::Client,
    base: String,
}

impl CounterpartyClient {
    pub fn new(api_base: &str) -> BotResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json(&self, path: &str) -> BotResult<Value> {
        let url = format!("{}{}", self.base, path);
        let resp = self.http.get(&url).send().await?;

        if resp.status() != StatusCode::OK {
            return Err(BotError::Ledger(format!(
                "{} returned status {}",
                url,
                resp.status()
            )));
        }

        Ok(resp.json().await?)
    }

    /// Indexer responses wrap their payload in a `data` array
    fn rows(value: &Value) -> Vec<&Value> {
        match value {
            Value::Array(items) => items.iter().collect(),
            _ => value
                .get("data")
                .and_then(|d| d.as_array())
                .map(|arr| arr.iter().collect())
                .unwrap_or_default(),
        }
    }
}

fn str_field(row: &Value, key: &str) -> String {
    row.get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn int_field(row: &Value, key: &str) -> i64 {
    row.get(key).and_then(|v| v.as_i64()).unwrap_or(0)
}

/// Dispenser status arrives as the ledger's numeric code
fn dispenser_status(row: &Value) -> String {
    match row.get("status") {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(0) => "open".to_string(),
            _ => "closed".to_string(),
        },
        Some(Value::String(s)) => s.clone(),
        _ => "closed".to_string(),
    }
}

fn parse_dispense(row: &Value) -> SaleEvent {
    SaleEvent {
        tx_hash: str_field(row, "tx_hash"),
        status: match row.get("status").and_then(|v| v.as_str()) {
            Some(s) => s.to_string(),
            // The dispenses endpoint only returns confirmed dispenses
            None => "valid".to_string(),
        },
        asset: str_field(row, "asset"),
        quantity: int_field(row, "dispense_quantity"),
        block_index: int_field(row, "block_index"),
        timestamp: int_field(row, "block_time"),
        listing_hash: str_field(row, "dispenser_tx_hash"),
        venue: Venue::Dispenser,
    }
}

fn parse_order_match(row: &Value) -> SaleEvent {
    SaleEvent {
        tx_hash: str_field(row, "tx_hash"),
        status: str_field(row, "status"),
        asset: str_field(row, "forward_asset"),
        quantity: int_field(row, "forward_quantity"),
        block_index: int_field(row, "block_index"),
        timestamp: int_field(row, "block_time"),
        listing_hash: str_field(row, "tx0_hash"),
        venue: Venue::Dex,
    }
}

fn parse_dispenser(row: &Value) -> ListingEvent {
    ListingEvent {
        tx_hash: str_field(row, "tx_hash"),
        status: dispenser_status(row),
        asset: str_field(row, "asset"),
        give_quantity: int_field(row, "give_quantity"),
        give_remaining: int_field(row, "give_remaining"),
        unit_price: int_field(row, "satoshirate"),
        payment_asset: "BTC".to_string(),
        block_index: int_field(row, "block_index"),
        timestamp: int_field(row, "block_time"),
        source: str_field(row, "source"),
        escrow_quantity: int_field(row, "escrow_quantity"),
        venue: Venue::Dispenser,
    }
}

fn parse_order(row: &Value) -> ListingEvent {
    let give_quantity = int_field(row, "give_quantity");
    let get_quantity = int_field(row, "get_quantity");
    let unit_price = if give_quantity > 0 {
        ((get_quantity as i128 * 100_000_000) / give_quantity as i128) as i64
    } else {
        0
    };

    ListingEvent {
        tx_hash: str_field(row, "tx_hash"),
        status: str_field(row, "status"),
        asset: str_field(row, "give_asset"),
        give_quantity,
        give_remaining: int_field(row, "give_remaining"),
        unit_price,
        payment_asset: str_field(row, "get_asset"),
        block_index: int_field(row, "block_index"),
        timestamp: int_field(row, "block_time"),
        source: str_field(row, "source"),
        escrow_quantity: give_quantity,
        venue: Venue::Dex,
    }
}

#[async_trait]
impl super::LedgerClient for CounterpartyClient {
    async fn current_height(&self) -> BotResult<i64> {
        let value = self.get_json("/blocks/last").await?;
        let block = value
            .get("data")
            .unwrap_or(&value)
            .get("block_index")
            .and_then(|v| v.as_i64())
            .ok_or_else(|| BotError::Parse("missing block_index in /blocks/last".to_string()))?;
        Ok(block)
    }

    async fn sales_since(&self, block: i64) -> BotResult<Vec<SaleEvent>> {
        let dispenses = self
            .get_json(&format!("/dispenses?since_block={}", block))
            .await?;
        let matches = self
            .get_json(&format!("/order_matches?since_block={}", block))
            .await?;

        let mut sales: Vec<SaleEvent> =
            Self::rows(&dispenses).into_iter().map(parse_dispense).collect();
        sales.extend(Self::rows(&matches).into_iter().map(parse_order_match));
        Ok(sales)
    }

    async fn listings_since(&self, block: Option<i64>) -> BotResult<Vec<ListingEvent>> {
        let (dispensers_path, orders_path) = match block {
            Some(b) => (
                format!("/dispensers?since_block={}", b),
                format!("/orders?since_block={}", b),
            ),
            None => ("/dispensers?status=open".to_string(), "/orders?status=open".to_string()),
        };

        let dispensers = self.get_json(&dispensers_path).await?;
        let orders = self.get_json(&orders_path).await?;

        let mut listings: Vec<ListingEvent> = Self::rows(&dispensers)
            .into_iter()
            .map(parse_dispenser)
            .collect();
        listings.extend(Self::rows(&orders).into_iter().map(parse_order));
        Ok(listings)
    }

    async fn listings_for_asset(&self, asset: &str) -> BotResult<Vec<ListingEvent>> {
        let value = self.get_json(&format!("/dispensers?asset={}", asset)).await?;
        Ok(Self::rows(&value).into_iter().map(parse_dispenser).collect())
    }
}
