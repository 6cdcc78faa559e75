//! Trailing moving averages over the close column

use ta::{Next, indicators::SimpleMovingAverage};

use crate::error::{EngineError, Result};
use crate::model::PriceSeries;

/// Trailing simple mean of `values` over `window` observations.
///
/// Position `i` holds the mean of `values[i + 1 - window..=i]`, or `None`
/// while fewer than `window` observations are available.
pub fn trailing_mean(values: &[f64], window: usize) -> Result<Vec<Option<f64>>> {
    let mut sma =
        SimpleMovingAverage::new(window).map_err(|e| EngineError::Indicator(e.to_string()))?;

    Ok(values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let mean = sma.next(value);
            (i + 1 >= window).then_some(mean)
        })
        .collect())
}

/// Derives the short and long moving-average columns of a [`PriceSeries`]
#[derive(Debug, Clone, Copy)]
pub struct IndicatorCalculator {
    short_window: usize,
    long_window: usize,
}

impl Default for IndicatorCalculator {
    fn default() -> Self {
        Self::new(50, 200)
    }
}

impl IndicatorCalculator {
    pub fn new(short_window: usize, long_window: usize) -> Self {
        Self {
            short_window,
            long_window,
        }
    }

    /// Fill the series' indicator columns in place
    pub fn apply(&self, series: &mut PriceSeries) -> Result<()> {
        let closes = series.closes();
        let short = trailing_mean(&closes, self.short_window)?;
        let long = trailing_mean(&closes, self.long_window)?;

        tracing::debug!(
            symbol = series.symbol(),
            bars = closes.len(),
            short_window = self.short_window,
            long_window = self.long_window,
            "Computed moving averages"
        );

        series.set_indicators(short, long);
        Ok(())
    }
}
