use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

/// Main bot configuration, loaded from a JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the ledger indexer API
    pub api_base: String,

    /// Telegram bot token (falls back to XCPBOT_TELEGRAM_TOKEN)
    pub bot_token: String,

    /// Comma-delimited Telegram chat ids to deliver to
    pub telegram_chat_ids: String,

    /// Optional celebratory attachment (Telegram file id), sales only
    pub sale_attachment_id: Option<String>,

    /// SQLite database location
    pub database_path: String,

    /// Poll interval in seconds
    pub poll_interval_secs: u64,

    /// Asset allow-list; empty means accept all assets
    pub watched_assets: Vec<String>,
}

impl Config {
    /// Load configuration from a JSON file, filling defaults for missing keys
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let raw: serde_json::Value = serde_json::from_str(&content)?;

        let bot_token = raw["bot_token"]
            .as_str()
            .map(|s| s.to_string())
            .or_else(|| std::env::var("XCPBOT_TELEGRAM_TOKEN").ok())
            .unwrap_or_default();

        Ok(Self {
            api_base: raw["api_base"]
                .as_str()
                .unwrap_or("https://api.counterparty.io:4000")
                .trim_end_matches('/')
                .to_string(),
            bot_token,
            telegram_chat_ids: raw["telegram_chat_ids"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            sale_attachment_id: raw["sale_attachment_id"].as_str().map(|s| s.to_string()),
            database_path: raw["database_path"]
                .as_str()
                .unwrap_or("./xcpbot.db")
                .to_string(),
            poll_interval_secs: raw["poll_interval_secs"].as_u64().unwrap_or(180),
            watched_assets: raw["watched_assets"]
                .as_array()
                .map(|arr| {
                    arr.iter()
                        .filter_map(|v| v.as_str().map(|s| s.to_string()))
                        .collect()
                })
                .unwrap_or_default(),
        })
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Parsed destination chat ids, in configured order
    pub fn chat_ids(&self) -> Result<Vec<i64>> {
        self.telegram_chat_ids
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<i64>()
                    .map_err(|e| anyhow::anyhow!("invalid chat id '{}': {}", s, e))
            })
            .collect()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.bot_token.is_empty() {
            return Err(anyhow::anyhow!("bot_token is required"));
        }

        if self.chat_ids()?.is_empty() {
            return Err(anyhow::anyhow!("telegram_chat_ids is required"));
        }

        if self.api_base.is_empty() {
            return Err(anyhow::anyhow!("api_base is required"));
        }

        if self.poll_interval_secs == 0 {
            return Err(anyhow::anyhow!("poll_interval_secs must be positive"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: "https://api.counterparty.io:4000".to_string(),
            bot_token: String::new(),
            telegram_chat_ids: String::new(),
            sale_attachment_id: None,
            database_path: "./xcpbot.db".to_string(),
            poll_interval_secs: 180,
            watched_assets: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bot_token": "t", "telegram_chat_ids": "-100123, 456"}}"#
        )
        .unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.poll_interval_secs, 180);
        assert_eq!(config.database_path, "./xcpbot.db");
        assert_eq!(config.chat_ids().unwrap(), vec![-100123, 456]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_destinations() {
        let config = Config {
            bot_token: "t".to_string(),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_chat_id_is_an_error() {
        let config = Config {
            telegram_chat_ids: "abc".to_string(),
            ..Config::default()
        };
        assert!(config.chat_ids().is_err());
    }
}
