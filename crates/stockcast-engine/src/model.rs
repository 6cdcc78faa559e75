//! Price series and instrument metadata

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{EngineError, Result};

/// Sentinel rendered for any metadata field the provider did not supply
pub const UNAVAILABLE: &str = "N/A";

/// One daily OHLCV record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Chronologically ordered daily bars plus the derived moving-average columns.
///
/// Dates are unique and strictly increasing; [`PriceSeries::new`] refuses
/// anything else. The indicator columns are empty until
/// [`IndicatorCalculator::apply`](crate::indicators::IndicatorCalculator::apply)
/// fills them, after which they have the same length as `bars`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<PriceBar>,
    sma_50: Vec<Option<f64>>,
    sma_200: Vec<Option<f64>>,
}

impl PriceSeries {
    /// Build a series, validating ordering
    pub fn new(symbol: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self> {
        let symbol = symbol.into();

        if bars.is_empty() {
            return Err(EngineError::DataUnavailable {
                symbol,
                reason: "No historical data available".to_string(),
            });
        }

        if let Some(pair) = bars.windows(2).find(|w| w[0].date >= w[1].date) {
            return Err(EngineError::DataUnavailable {
                symbol,
                reason: format!(
                    "Price history out of order at {} -> {}",
                    pair[0].date, pair[1].date
                ),
            });
        }

        Ok(Self {
            symbol,
            bars,
            sma_50: Vec::new(),
            sma_200: Vec::new(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Closing prices in date order
    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// Date of the most recent bar
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// 50-period trailing mean of close, `None` until the window fills
    pub fn sma_50(&self) -> &[Option<f64>] {
        &self.sma_50
    }

    /// 200-period trailing mean of close, `None` until the window fills
    pub fn sma_200(&self) -> &[Option<f64>] {
        &self.sma_200
    }

    pub fn has_indicators(&self) -> bool {
        !self.bars.is_empty()
            && self.sma_50.len() == self.bars.len()
            && self.sma_200.len() == self.bars.len()
    }

    pub(crate) fn set_indicators(&mut self, sma_50: Vec<Option<f64>>, sma_200: Vec<Option<f64>>) {
        debug_assert_eq!(sma_50.len(), self.bars.len());
        debug_assert_eq!(sma_200.len(), self.bars.len());
        self.sma_50 = sma_50;
        self.sma_200 = sma_200;
    }
}

/// Raw instrument metadata as returned by a market data provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstrumentInfo {
    pub symbol: Option<String>,
    pub long_name: Option<String>,
    pub long_business_summary: Option<String>,
    pub market_cap: Option<f64>,
    pub day_high: Option<f64>,
    pub day_low: Option<f64>,
    pub trailing_pe: Option<f64>,
    pub dividend_yield: Option<f64>,
    pub fifty_two_week_high: Option<f64>,
}

impl InstrumentInfo {
    /// A provider answer counts as "found" only with a display name and a symbol
    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.long_name) && present(&self.symbol)
    }

    /// Display-safe copy with every missing field set to the sentinel
    pub fn to_display(&self) -> DisplayInfo {
        DisplayInfo {
            long_name: InfoValue::text(self.long_name.as_deref()),
            symbol: InfoValue::text(self.symbol.as_deref()),
            long_business_summary: InfoValue::text(self.long_business_summary.as_deref()),
            market_cap: InfoValue::number(self.market_cap),
            day_high: InfoValue::number(self.day_high),
            day_low: InfoValue::number(self.day_low),
            trailing_pe: InfoValue::number(self.trailing_pe),
            dividend_yield: InfoValue::number(self.dividend_yield),
            fifty_two_week_high: InfoValue::number(self.fifty_two_week_high),
        }
    }
}

/// A metadata value that is either present or explicitly unavailable
#[derive(Debug, Clone, PartialEq)]
pub enum InfoValue {
    Number(f64),
    Text(String),
    Unavailable,
}

impl InfoValue {
    fn text(value: Option<&str>) -> Self {
        match value {
            Some(s) if !s.trim().is_empty() => Self::Text(s.to_string()),
            _ => Self::Unavailable,
        }
    }

    fn number(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => Self::Number(v),
            _ => Self::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

impl std::fmt::Display for InfoValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Unavailable => f.write_str(UNAVAILABLE),
        }
    }
}

impl Serialize for InfoValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Number(v) => serializer.serialize_f64(*v),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Unavailable => serializer.serialize_str(UNAVAILABLE),
        }
    }
}

/// Instrument metadata ready for a renderer; no field is ever silently absent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    pub long_name: InfoValue,
    pub symbol: InfoValue,
    pub long_business_summary: InfoValue,
    pub market_cap: InfoValue,
    pub day_high: InfoValue,
    pub day_low: InfoValue,
    #[serde(rename = "trailingPE")]
    pub trailing_pe: InfoValue,
    pub dividend_yield: InfoValue,
    pub fifty_two_week_high: InfoValue,
}

impl DisplayInfo {
    /// Label/value pairs in display order
    pub fn fields(&self) -> [(&'static str, &InfoValue); 9] {
        [
            ("Name", &self.long_name),
            ("Symbol", &self.symbol),
            ("Summary", &self.long_business_summary),
            ("Market Cap", &self.market_cap),
            ("Day High", &self.day_high),
            ("Day Low", &self.day_low),
            ("Trailing P/E", &self.trailing_pe),
            ("Dividend Yield", &self.dividend_yield),
            ("52 Week High", &self.fifty_two_week_high),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(date: NaiveDate, close: f64) -> PriceBar {
        PriceBar {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_series_rejects_empty() {
        let err = PriceSeries::new("AAPL", Vec::new()).unwrap_err();
        assert!(matches!(err, EngineError::DataUnavailable { .. }));
    }

    #[test]
    fn test_series_rejects_duplicate_dates() {
        let bars = vec![bar(day(1), 1.0), bar(day(1), 2.0)];
        assert!(PriceSeries::new("AAPL", bars).is_err());
    }

    #[test]
    fn test_series_rejects_out_of_order_dates() {
        let bars = vec![bar(day(5), 1.0), bar(day(4), 2.0)];
        let err = PriceSeries::new("AAPL", bars).unwrap_err();
        assert!(err.to_string().contains("out of order"));
    }

    #[test]
    fn test_series_accessors() {
        let bars = vec![bar(day(1), 1.0), bar(day(4), 2.0), bar(day(5), 3.0)];
        let series = PriceSeries::new("AAPL", bars).unwrap();
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.last_date(), Some(day(5)));
        assert!(!series.has_indicators());
    }

    #[test]
    fn test_info_completeness() {
        let mut info = InstrumentInfo {
            symbol: Some("AAPL".to_string()),
            ..Default::default()
        };
        assert!(!info.is_complete());

        info.long_name = Some("Apple Inc.".to_string());
        assert!(info.is_complete());
    }

    #[test]
    fn test_display_info_sentinels() {
        let info = InstrumentInfo {
            symbol: Some("AAPL".to_string()),
            long_name: Some("Apple Inc.".to_string()),
            day_high: Some(191.5),
            trailing_pe: Some(f64::NAN),
            ..Default::default()
        };
        let display = info.to_display();
        let json = serde_json::to_value(&display).unwrap();

        assert_eq!(json["longName"], "Apple Inc.");
        assert_eq!(json["dayHigh"], 191.5);
        assert_eq!(json["marketCap"], UNAVAILABLE);
        assert_eq!(json["trailingPE"], UNAVAILABLE);
        assert_eq!(json["longBusinessSummary"], UNAVAILABLE);
        assert_eq!(display.fields().len(), 9);
    }
}
