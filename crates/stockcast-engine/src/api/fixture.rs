//! Deterministic in-memory collaborators for tests and offline runs

use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;

use super::{DiscussionSession, DiscussionSource, MarketDataProvider};
use crate::error::{EngineError, Result};
use crate::model::{InstrumentInfo, PriceBar};
use crate::sentiment::{CommentNode, Credentials, DiscussionThread};

/// Deterministic weekday-only daily bars starting on or after `start`.
///
/// Closes follow a seeded random walk with slight upward drift around
/// `base_price`, so every call with the same arguments returns the same bars.
pub fn synthetic_bars(start: NaiveDate, trading_days: usize, base_price: f64) -> Vec<PriceBar> {
    let mut rng = StdRng::seed_from_u64(base_price.to_bits());
    let mut bars = Vec::with_capacity(trading_days);
    let mut close = base_price;
    let mut date = start;

    while bars.len() < trading_days {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            let open = close;
            let step = 0.0004 + 0.015 * rng.gen_range(-1.0_f64..1.0);
            close = (open * (1.0 + step)).max(0.01);

            let spread = 0.004 + 0.006 * rng.gen_range(0.0_f64..1.0);
            bars.push(PriceBar {
                date,
                open,
                high: open.max(close) * (1.0 + spread),
                low: open.min(close) * (1.0 - spread),
                close,
                volume: rng.gen_range(1_000_000..5_000_000),
            });
        }

        match date.checked_add_days(Days::new(1)) {
            Some(next) => date = next,
            None => break,
        }
    }

    bars
}

/// Market data served from memory
#[derive(Debug, Clone, Default)]
pub struct FixtureMarketData {
    instruments: HashMap<String, (InstrumentInfo, Vec<PriceBar>)>,
}

impl FixtureMarketData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an instrument; the symbol is taken from `info`
    pub fn with_instrument(mut self, info: InstrumentInfo, bars: Vec<PriceBar>) -> Self {
        let key = info.symbol.clone().unwrap_or_default().to_uppercase();
        self.instruments.insert(key, (info, bars));
        self
    }

    /// Register `symbol` with a name and `trading_days` synthetic bars ending
    /// near 2024-12-31
    pub fn with_synthetic(
        self,
        symbol: &str,
        long_name: &str,
        trading_days: usize,
        base_price: f64,
    ) -> Self {
        // ~261 weekdays per year
        let years_back = trading_days.div_ceil(261) as i32;
        let start = NaiveDate::from_ymd_opt(2025 - years_back, 1, 1).unwrap_or_default();
        let bars = synthetic_bars(start, trading_days, base_price);
        let last = bars.last().copied();

        let info = InstrumentInfo {
            symbol: Some(symbol.to_uppercase()),
            long_name: Some(long_name.to_string()),
            long_business_summary: Some(format!("{long_name} is a fixture instrument.")),
            market_cap: Some(base_price * 1.0e9),
            day_high: last.map(|b| b.high),
            day_low: last.map(|b| b.low),
            trailing_pe: Some(25.0),
            dividend_yield: None,
            fifty_two_week_high: bars.iter().rev().take(261).map(|b| b.high).reduce(f64::max),
        };

        self.with_instrument(info, bars)
    }

    /// A few well-known symbols with five years of bars
    pub fn demo() -> Self {
        Self::new()
            .with_synthetic("AAPL", "Apple Inc.", 1305, 150.0)
            .with_synthetic("MSFT", "Microsoft Corporation", 1305, 300.0)
            .with_synthetic("TSLA", "Tesla, Inc.", 1305, 200.0)
    }
}

#[async_trait]
impl MarketDataProvider for FixtureMarketData {
    async fn instrument_info(&self, symbol: &str) -> Result<InstrumentInfo> {
        // Unknown symbols look like an upstream "not found": nothing populated
        Ok(self
            .instruments
            .get(&symbol.to_uppercase())
            .map(|(info, _)| info.clone())
            .unwrap_or_default())
    }

    async fn price_history(&self, symbol: &str, lookback_days: i64) -> Result<Vec<PriceBar>> {
        let Some((_, bars)) = self.instruments.get(&symbol.to_uppercase()) else {
            return Ok(Vec::new());
        };
        let Some(last) = bars.last() else {
            return Ok(Vec::new());
        };

        let cutoff = last
            .date
            .checked_sub_days(Days::new(lookback_days.max(0) as u64))
            .unwrap_or(NaiveDate::MIN);
        Ok(bars.iter().filter(|b| b.date >= cutoff).copied().collect())
    }
}

#[derive(Debug, Clone, Default)]
struct DiscussionData {
    threads: Vec<DiscussionThread>,
    comments: HashMap<String, Vec<CommentNode>>,
    failure: Option<String>,
}

/// Discussion source served from memory.
///
/// Only the configured credentials are accepted; anything else is
/// [`EngineError::Unauthorized`].
#[derive(Debug, Clone)]
pub struct FixtureDiscussionSource {
    accepted: Credentials,
    data: Arc<DiscussionData>,
}

impl FixtureDiscussionSource {
    pub fn new(accepted: Credentials) -> Self {
        Self {
            accepted,
            data: Arc::new(DiscussionData::default()),
        }
    }

    fn data_mut(&mut self) -> &mut DiscussionData {
        Arc::make_mut(&mut self.data)
    }

    /// Add a thread and its top-level replies
    pub fn with_thread(mut self, thread: DiscussionThread, comments: Vec<CommentNode>) -> Self {
        let data = self.data_mut();
        data.comments.insert(thread.id.clone(), comments);
        data.threads.push(thread);
        self
    }

    /// Make every search fail with a transient API error
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.data_mut().failure = Some(message.into());
        self
    }

    /// `per_ticker` threads for each ticker, each mentioning it in the title
    /// and carrying a mix of replies
    pub fn sample(accepted: Credentials, tickers: &[&str], per_ticker: usize) -> Self {
        const TITLES: &[&str] = &[
            "{T} looks very bullish after earnings",
            "Is {T} overvalued here?",
            "{T} breakout incoming, strong volume",
            "Loading up on {T} calls",
            "{T} guidance was solid",
        ];
        const REPLIES: &[&str] = &[
            "Great quarter, holding long",
            "Not sure, feels risky at these levels",
            "To the moon",
            "Took profits today",
            "This could drop hard on the next miss",
            "Strong buy for me",
        ];

        let mut source = Self::new(accepted);
        for ticker in tickers {
            for i in 0..per_ticker {
                let id = format!("{}{i:03}", ticker.to_lowercase());
                let title = TITLES[i % TITLES.len()].replace("{T}", ticker);
                let replies = (0..4)
                    .map(|j| CommentNode::Comment {
                        body: REPLIES[(i + j) % REPLIES.len()].to_string(),
                    })
                    .chain(std::iter::once(CommentNode::MoreChildren { count: 7 }))
                    .collect();

                let thread = DiscussionThread {
                    permalink: format!("/r/stocks/comments/{id}/"),
                    id,
                    title,
                    body: String::new(),
                    score: (i as i64 * 37) % 400,
                    num_comments: (i as u64 * 13) % 150,
                };
                source = source.with_thread(thread, replies);
            }
        }
        source
    }
}

#[async_trait]
impl DiscussionSource for FixtureDiscussionSource {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Box<dyn DiscussionSession>> {
        if *credentials != self.accepted {
            return Err(EngineError::Unauthorized {
                provider: "fixture".to_string(),
            });
        }
        Ok(Box::new(FixtureSession {
            data: Arc::clone(&self.data),
        }))
    }
}

struct FixtureSession {
    data: Arc<DiscussionData>,
}

#[async_trait]
impl DiscussionSession for FixtureSession {
    async fn search(&self, _query: &str, limit: usize) -> Result<Vec<DiscussionThread>> {
        if let Some(message) = &self.data.failure {
            return Err(EngineError::Api(message.clone()));
        }
        Ok(self.data.threads.iter().take(limit).cloned().collect())
    }

    async fn comments(&self, thread: &DiscussionThread, limit: usize) -> Result<Vec<CommentNode>> {
        let Some(nodes) = self.data.comments.get(&thread.id) else {
            return Ok(Vec::new());
        };

        // Placeholders ride along, only comments count toward the limit
        let mut taken = 0;
        Ok(nodes
            .iter()
            .filter(|node| match node {
                CommentNode::Comment { .. } => {
                    taken += 1;
                    taken <= limit
                }
                CommentNode::MoreChildren { .. } => true,
            })
            .cloned()
            .collect())
    }
}
