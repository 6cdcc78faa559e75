//! ARIMA order search and price forecasting
//!
//! - [`arima`]: conditional-least-squares ARIMA(p, d, q) fitting
//! - [`selector`]: exhaustive AIC search over a bounded order grid
//! - [`forecaster`]: order selection with fallback plus date-aligned projection

pub mod arima;
pub mod forecaster;
pub mod selector;

pub use arima::{ArimaModel, FitError};
pub use forecaster::Forecaster;
pub use selector::{OrderSelector, pick_best};

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ARIMA structure: autoregressive lags, differencing degree, moving-average lags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ModelOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

impl fmt::Display for ModelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.p, self.d, self.q)
    }
}

/// Inclusive upper bounds of the order search grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBounds {
    pub p_max: usize,
    pub d_max: usize,
    pub q_max: usize,
}

impl Default for OrderBounds {
    fn default() -> Self {
        Self::new(2, 2, 2)
    }
}

impl OrderBounds {
    pub const fn new(p_max: usize, d_max: usize, q_max: usize) -> Self {
        Self { p_max, d_max, q_max }
    }

    /// Every order in the grid: p outermost, then d, then q
    pub fn orders(self) -> impl Iterator<Item = ModelOrder> {
        (0..=self.p_max).flat_map(move |p| {
            (0..=self.d_max)
                .flat_map(move |d| (0..=self.q_max).map(move |q| ModelOrder::new(p, d, q)))
        })
    }

    /// Number of candidate orders
    pub fn len(self) -> usize {
        (self.p_max + 1) * (self.d_max + 1) * (self.q_max + 1)
    }
}

/// A successfully fitted order and its information criterion (lower is better)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub order: ModelOrder,
    pub criterion: f64,
}

/// One projected close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Date-aligned point forecast. Either complete or empty, never partial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Attach consecutive calendar dates starting the day after `last_date`.
    ///
    /// Returns `None` if any value is non-finite or a date overflows.
    pub fn from_values(last_date: NaiveDate, values: &[f64]) -> Option<Self> {
        let points = values
            .iter()
            .zip(1u64..)
            .map(|(&value, offset)| {
                if !value.is_finite() {
                    return None;
                }
                let date = last_date.checked_add_days(Days::new(offset))?;
                Some(ForecastPoint { date, value })
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Self { points })
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Same dates, values transformed by `f`
    pub fn map_values(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            points: self
                .points
                .iter()
                .map(|p| ForecastPoint {
                    date: p.date,
                    value: f(p.value),
                })
                .collect(),
        }
    }
}

/// How a forecast was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRun {
    pub forecast: Forecast,
    /// Order actually used for the projection
    pub order: Option<ModelOrder>,
    /// AIC of the model behind the projection
    pub criterion: Option<f64>,
    /// True when the grid search found nothing and the fallback order was used
    pub used_fallback: bool,
}

impl ForecastRun {
    pub fn failed(order: Option<ModelOrder>, used_fallback: bool) -> Self {
        Self {
            forecast: Forecast::empty(),
            order,
            criterion: None,
            used_fallback,
        }
    }
}
