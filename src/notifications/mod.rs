//! Notification fan-out
//!
//! Renders a transaction once and delivers it to every configured chat
//! concurrently. A failing destination is logged and never blocks the
//! others; after the aggregate dispatch the transaction is marked notified
//! (at-least-once: a crash before the mark can cause redelivery).

pub mod format;
pub mod telegram;

use crate::errors::BotResult;
use crate::logger::{self, LogTag};
use crate::store::TransactionStore;
use crate::types::Transaction;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;

pub use telegram::TelegramApi;

/// Low-level chat delivery, injectable for tests
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> BotResult<()>;
    async fn send_attachment(&self, chat_id: i64, attachment_id: &str) -> BotResult<()>;
}

/// What the monitor hands freshly stored transactions to
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Never fails; per-destination errors are contained inside
    async fn notify(&self, tx: &Transaction);
}

pub struct NotificationFanout {
    api: Arc<dyn ChatApi>,
    chat_ids: Vec<i64>,
    sale_attachment_id: Option<String>,
    store: Arc<TransactionStore>,
}

impl NotificationFanout {
    pub fn new(
        api: Arc<dyn ChatApi>,
        chat_ids: Vec<i64>,
        sale_attachment_id: Option<String>,
        store: Arc<TransactionStore>,
    ) -> Self {
        Self {
            api,
            chat_ids,
            sale_attachment_id,
            store,
        }
    }

    async fn deliver(&self, chat_id: i64, text: &str, is_sale: bool) {
        if let Err(e) = self.api.send_text(chat_id, text).await {
            logger::error(
                LogTag::Notify,
                &format!("delivery to chat {} failed: {}", chat_id, e),
            );
            return;
        }

        if is_sale {
            if let Some(attachment_id) = &self.sale_attachment_id {
                if let Err(e) = self.api.send_attachment(chat_id, attachment_id).await {
                    logger::warn(
                        LogTag::Notify,
                        &format!("attachment to chat {} failed: {}", chat_id, e),
                    );
                }
            }
        }
    }
}

#[async_trait]
impl Notifier for NotificationFanout {
    async fn notify(&self, tx: &Transaction) {
        let text = format::render(tx);
        let is_sale = tx.tx_type.is_sale();

        join_all(
            self.chat_ids
                .iter()
                .map(|&chat_id| self.deliver(chat_id, &text, is_sale)),
        )
        .await;

        if let Err(e) = self.store.mark_notified(&tx.tx_hash) {
            logger::error(
                LogTag::Notify,
                &format!("failed to mark {} notified: {}", tx.tx_hash, e),
            );
        } else {
            logger::debug(
                LogTag::Notify,
                &format!(
                    "dispatched {} to {} chats",
                    tx.tx_hash,
                    self.chat_ids.len()
                ),
            );
        }
    }
}
