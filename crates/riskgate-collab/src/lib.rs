//! Collaborator contracts consumed by the risk-gating engine.
//!
//! The engine never talks to databases, market-data feeds or notification
//! channels directly. It consumes the traits defined here:
//! - `Storage`: trades, accounts, peak values
//! - `MarketData`: volatility, liquidity, market hours, anomalies, correlation
//! - `ThreatFeed`: suspicious activity and anomaly records per account
//! - `AlertSink`: fire-and-forget alert publication
//!
//! Each trait ships with an in-memory implementation used for wiring tests
//! and local runs. Production implementations live outside this workspace.

pub mod alert_sink;
pub mod error;
pub mod market;
pub mod storage;
pub mod threat;

use std::pin::Pin;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub use alert_sink::{AlertSink, ChannelAlertSink, LogAlertSink, RecordingAlertSink};
pub use error::{CollabError, CollabResult};
pub use market::{InMemoryMarketData, MarketData, SymbolConditions};
pub use storage::{InMemoryStorage, Storage};
pub use threat::{InMemoryThreatFeed, ThreatFeed};
