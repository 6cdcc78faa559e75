//! Sentiment-driven rescaling of a forecast

use crate::config::EngineConfig;
use crate::forecast::Forecast;

/// Multiplies a forecast by `1 + sentiment * strength` when sentiment is
/// outside the neutral dead zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastAdjuster {
    strength: f64,
    dead_zone: f64,
}

impl Default for ForecastAdjuster {
    fn default() -> Self {
        Self::new(0.5, 0.1)
    }
}

impl ForecastAdjuster {
    pub fn new(strength: f64, dead_zone: f64) -> Self {
        Self {
            strength,
            dead_zone,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.adjustment_strength, config.dead_zone)
    }

    /// Whether `sentiment` is strong enough to move the forecast
    pub fn applies(&self, sentiment: f64) -> bool {
        sentiment.abs() > self.dead_zone
    }

    /// Multiplier applied for `sentiment`; exactly 1 inside the dead zone
    pub fn factor(&self, sentiment: f64) -> f64 {
        if self.applies(sentiment) {
            1.0 + sentiment * self.strength
        } else {
            1.0
        }
    }

    /// Rescaled copy of `forecast`. Dates and length never change.
    pub fn adjust(&self, forecast: &Forecast, sentiment: f64) -> Forecast {
        if !self.applies(sentiment) {
            return forecast.clone();
        }
        let factor = self.factor(sentiment);
        tracing::debug!(sentiment, factor, "Adjusting forecast for sentiment");
        forecast.map_values(|v| v * factor)
    }
}
