//! Yahoo Finance market data client

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use std::collections::BTreeMap;
use time::OffsetDateTime;
use tracing::debug;
use yahoo_finance_api as yahoo;

use super::MarketDataProvider;
use crate::error::{EngineError, Result};
use crate::model::{InstrumentInfo, PriceBar};

/// Window used to derive the 52-week high
const YEAR_DAYS: i64 = 365;

/// Yahoo Finance client
#[derive(Debug, Clone, Default)]
pub struct YahooFinanceClient {}

impl YahooFinanceClient {
    /// Create a new Yahoo Finance client
    pub fn new() -> Self {
        Self {}
    }

    fn connector() -> Result<yahoo::YahooConnector> {
        yahoo::YahooConnector::new().map_err(|e| EngineError::YahooFinance(e.to_string()))
    }

    /// Daily bars between now and `lookback_days` ago, one per date
    async fn fetch_bars(&self, symbol: &str, lookback_days: i64) -> Result<Vec<PriceBar>> {
        let provider = Self::connector()?;

        let end = OffsetDateTime::now_utc();
        let start = end - time::Duration::days(lookback_days);

        let response = provider
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| EngineError::YahooFinance(e.to_string()))?;

        let quotes = response
            .quotes()
            .map_err(|e| EngineError::YahooFinance(e.to_string()))?;

        // Intraday refreshes can repeat the current session; the later quote wins
        let by_date: BTreeMap<NaiveDate, PriceBar> = quotes
            .iter()
            .filter_map(|q| {
                let date = DateTime::from_timestamp(q.timestamp as i64, 0)?.date_naive();
                Some((
                    date,
                    PriceBar {
                        date,
                        open: q.open,
                        high: q.high,
                        low: q.low,
                        close: q.close,
                        volume: q.volume,
                    },
                ))
            })
            .collect();

        debug!(
            symbol,
            quotes = quotes.len(),
            bars = by_date.len(),
            "Fetched price history"
        );

        Ok(by_date.into_values().collect())
    }
}

/// Latest session range and trailing 52-week high
fn derived_ranges(bars: &[PriceBar]) -> (Option<f64>, Option<f64>, Option<f64>) {
    let last = bars.last();
    let year_high = bars
        .iter()
        .map(|b| b.high)
        .filter(|h| h.is_finite())
        .reduce(f64::max);
    (last.map(|b| b.high), last.map(|b| b.low), year_high)
}

#[async_trait]
impl MarketDataProvider for YahooFinanceClient {
    async fn instrument_info(&self, symbol: &str) -> Result<InstrumentInfo> {
        let mut provider = Self::connector()?;

        let summary = provider
            .get_ticker_info(symbol)
            .await
            .map_err(|e| EngineError::YahooFinance(e.to_string()))?;

        let Some(result) = summary
            .quote_summary
            .and_then(|qs| qs.result)
            .and_then(|r| r.into_iter().next())
        else {
            debug!(symbol, "No quote summary returned");
            return Ok(InstrumentInfo::default());
        };

        let detail = result.summary_detail.as_ref();
        let long_name = result
            .quote_type
            .as_ref()
            .and_then(|qt| qt.long_name.clone().or(qt.short_name.clone()));

        let recent = self.fetch_bars(symbol, YEAR_DAYS).await?;
        let (day_high, day_low, fifty_two_week_high) = derived_ranges(&recent);

        Ok(InstrumentInfo {
            symbol: Some(symbol.to_uppercase()),
            long_name,
            long_business_summary: None,
            market_cap: detail.and_then(|sd| sd.market_cap).map(|v| v as f64),
            day_high,
            day_low,
            trailing_pe: detail.and_then(|sd| sd.trailing_pe),
            dividend_yield: detail.and_then(|sd| sd.trailing_annual_dividend_yield),
            fifty_two_week_high,
        })
    }

    async fn price_history(&self, symbol: &str, lookback_days: i64) -> Result<Vec<PriceBar>> {
        self.fetch_bars(symbol, lookback_days).await
    }
}
