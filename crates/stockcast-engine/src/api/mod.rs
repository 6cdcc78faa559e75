//! Collaborator interfaces and their implementations
//!
//! - [`MarketDataProvider`]: instrument metadata and daily price history
//! - [`DiscussionSource`] / [`DiscussionSession`]: community discussion threads
//!
//! Live clients talk to Yahoo Finance and Reddit; [`fixture`] holds
//! deterministic in-memory stand-ins.

pub mod fixture;
pub mod reddit;
pub mod yahoo;

pub use fixture::{FixtureDiscussionSource, FixtureMarketData, synthetic_bars};
pub use reddit::RedditClient;
pub use yahoo::YahooFinanceClient;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{InstrumentInfo, PriceBar};
use crate::sentiment::{CommentNode, Credentials, DiscussionThread};

/// Source of instrument metadata and daily bars
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Metadata for `symbol`. Fields the provider cannot supply are `None`.
    async fn instrument_info(&self, symbol: &str) -> Result<InstrumentInfo>;

    /// Daily bars covering the last `lookback_days` calendar days, oldest first
    async fn price_history(&self, symbol: &str, lookback_days: i64) -> Result<Vec<PriceBar>>;
}

/// Entry point to a discussion platform
#[async_trait]
pub trait DiscussionSource: Send + Sync {
    /// Open an authenticated session.
    ///
    /// Rejected credentials must surface as
    /// [`EngineError::Unauthorized`](crate::error::EngineError::Unauthorized).
    async fn authenticate(&self, credentials: &Credentials) -> Result<Box<dyn DiscussionSession>>;
}

/// An authenticated discussion session
#[async_trait]
pub trait DiscussionSession: Send + Sync {
    /// Threads matching `query`, most relevant first, at most `limit`
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<DiscussionThread>>;

    /// Top-level replies under `thread`, at most `limit` nodes
    async fn comments(&self, thread: &DiscussionThread, limit: usize) -> Result<Vec<CommentNode>>;
}
