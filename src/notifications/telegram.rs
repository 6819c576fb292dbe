//! Telegram delivery via teloxide

use super::ChatApi;
use crate::errors::{BotError, BotResult};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, ParseMode};

pub struct TelegramApi {
    bot: Bot,
}

impl TelegramApi {
    pub fn new(bot_token: &str) -> BotResult<Self> {
        if bot_token.is_empty() {
            return Err(BotError::Config("bot token is empty".to_string()));
        }
        Ok(Self {
            bot: Bot::new(bot_token),
        })
    }
}

#[async_trait]
impl ChatApi for TelegramApi {
    async fn send_text(&self, chat_id: i64, text: &str) -> BotResult<()> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .parse_mode(ParseMode::Html)
            .disable_web_page_preview(true)
            .send()
            .await
            .map_err(|e| BotError::Notify(format!("send_message: {}", e)))?;
        Ok(())
    }

    async fn send_attachment(&self, chat_id: i64, attachment_id: &str) -> BotResult<()> {
        self.bot
            .send_animation(ChatId(chat_id), InputFile::file_id(attachment_id))
            .send()
            .await
            .map_err(|e| BotError::Notify(format!("send_animation: {}", e)))?;
        Ok(())
    }
}
