pub mod arguments;
pub mod config;
pub mod dispenser;
pub mod errors;
pub mod ledger;
pub mod logger;
pub mod monitor;
pub mod notifications;
pub mod shutdown;
pub mod store;
pub mod types;
