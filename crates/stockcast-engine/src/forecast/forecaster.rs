//! Order selection with fallback, followed by a date-aligned projection

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::arima::ArimaModel;
use super::selector::OrderSelector;
use super::{FitResult, Forecast, ForecastRun, ModelOrder, OrderBounds};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::model::PriceSeries;

/// Fits the best grid order (or the fallback) to the close series and
/// projects `horizon` calendar days past the last bar
#[derive(Debug, Clone, Copy)]
pub struct Forecaster {
    selector: OrderSelector,
    fallback: ModelOrder,
    horizon: usize,
    concurrent: bool,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::new(OrderBounds::default(), ModelOrder::new(5, 1, 0), 30)
    }
}

impl Forecaster {
    pub fn new(bounds: OrderBounds, fallback: ModelOrder, horizon: usize) -> Self {
        Self {
            selector: OrderSelector::new(bounds),
            fallback,
            horizon,
            concurrent: false,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.order_bounds, config.fallback_order, config.horizon)
            .concurrent(config.concurrent_order_search)
    }

    /// Fit grid candidates in parallel on the blocking pool
    pub fn concurrent(mut self, enabled: bool) -> Self {
        self.concurrent = enabled;
        self
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// Produce the forecast for `series`.
    ///
    /// Never fails: any problem yields a run whose forecast is empty.
    pub async fn run(&self, series: &PriceSeries) -> ForecastRun {
        let Some(last_date) = series.last_date() else {
            return ForecastRun::failed(None, false);
        };
        let closes: Arc<[f64]> = series.closes().into();

        let selected = if self.concurrent {
            self.selector.select_concurrent(Arc::clone(&closes)).await
        } else {
            let selector = self.selector;
            let data = Arc::clone(&closes);
            match tokio::task::spawn_blocking(move || selector.select(&data)).await {
                Ok(selected) => selected,
                Err(e) => {
                    warn!(error = %e, "Order search task did not complete");
                    None
                }
            }
        };

        let (order, used_fallback) = self.resolve_order(selected);

        match self.project(&closes, last_date, order) {
            Ok((forecast, criterion)) => ForecastRun {
                forecast,
                order: Some(order),
                criterion: Some(criterion),
                used_fallback,
            },
            Err(e) => {
                warn!(error = %e, "No forecast produced");
                ForecastRun::failed(Some(order), used_fallback)
            }
        }
    }

    fn resolve_order(&self, selected: Option<FitResult>) -> (ModelOrder, bool) {
        match selected {
            Some(FitResult { order, criterion }) => {
                info!(order = %order, aic = criterion, "Selected ARIMA order");
                (order, false)
            }
            None => {
                warn!(
                    fallback = %self.fallback,
                    "No order in the search grid could be fitted, using fallback"
                );
                (self.fallback, true)
            }
        }
    }

    /// Fit `order` to `closes` and project `horizon` points dated from the
    /// day after `last_date`. Returns the forecast with the model's AIC, or
    /// [`EngineError::ModelFit`] when the order cannot be fitted.
    pub fn project(
        &self,
        closes: &[f64],
        last_date: NaiveDate,
        order: ModelOrder,
    ) -> Result<(Forecast, f64)> {
        let model = ArimaModel::fit(closes, order)
            .map_err(|e| EngineError::ModelFit(format!("ARIMA{order}: {e}")))?;

        let values = model.forecast(self.horizon);
        let forecast = Forecast::from_values(last_date, &values).ok_or_else(|| {
            EngineError::ModelFit(format!("ARIMA{order} projected non-finite values"))
        })?;

        debug!(
            order = %order,
            steps = forecast.len(),
            nobs = model.nobs(),
            sigma2 = model.sigma2(),
            log_likelihood = model.log_likelihood(),
            "Projected forecast"
        );
        Ok((forecast, model.aic()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fixture::synthetic_bars;
    use crate::model::PriceBar;

    fn series(len: usize) -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        PriceSeries::new("TEST", synthetic_bars(start, len, 150.0)).unwrap()
    }

    #[tokio::test]
    async fn test_run_produces_full_horizon() {
        let series = series(400);
        let run = Forecaster::default().run(&series).await;

        assert_eq!(run.forecast.len(), 30);
        assert!(!run.used_fallback);
        assert!(run.order.is_some());
        assert!(run.criterion.is_some_and(f64::is_finite));

        let last = series.last_date().unwrap();
        let dates = run.forecast.dates();
        assert_eq!(dates[0], last.succ_opt().unwrap());
        for pair in dates.windows(2) {
            assert_eq!(pair[1], pair[0].succ_opt().unwrap());
        }
    }

    #[tokio::test]
    async fn test_concurrent_run_matches_sequential() {
        let series = series(300);
        let sequential = Forecaster::default().run(&series).await;
        let concurrent = Forecaster::default().concurrent(true).run(&series).await;
        assert_eq!(sequential, concurrent);
    }

    #[test]
    fn test_fallback_used_when_nothing_selected() {
        let forecaster = Forecaster::new(OrderBounds::default(), ModelOrder::new(0, 1, 0), 5);

        let (order, used_fallback) = forecaster.resolve_order(None);
        assert_eq!(order, ModelOrder::new(0, 1, 0));
        assert!(used_fallback);

        let selected = FitResult {
            order: ModelOrder::new(1, 1, 0),
            criterion: 12.5,
        };
        let (order, used_fallback) = forecaster.resolve_order(Some(selected));
        assert_eq!(order, ModelOrder::new(1, 1, 0));
        assert!(!used_fallback);
    }

    #[test]
    fn test_project_with_fallback_order() {
        let series = series(120);
        let forecaster = Forecaster::new(OrderBounds::default(), ModelOrder::new(0, 1, 0), 5);
        let (forecast, criterion) = forecaster
            .project(&series.closes(), series.last_date().unwrap(), ModelOrder::new(0, 1, 0))
            .unwrap();

        assert_eq!(forecast.len(), 5);
        assert!(criterion.is_finite());
    }

    #[test]
    fn test_project_reports_model_fit_error() {
        let last = NaiveDate::from_ymd_opt(2024, 6, 28).unwrap();
        let err = Forecaster::default()
            .project(&[50.0; 120], last, ModelOrder::new(5, 1, 0))
            .unwrap_err();

        assert!(matches!(err, EngineError::ModelFit(_)));
        assert!(err.to_string().contains("ARIMA(5,1,0)"));
    }

    #[tokio::test]
    async fn test_failed_fallback_yields_empty_forecast() {
        let start = NaiveDate::from_ymd_opt(2021, 1, 4).unwrap();
        let bars: Vec<PriceBar> = (0..150)
            .map(|i| PriceBar {
                date: start + chrono::Days::new(i),
                open: 50.0,
                high: 50.0,
                low: 50.0,
                close: 50.0,
                volume: 0,
            })
            .collect();
        let series = PriceSeries::new("FLAT", bars).unwrap();
        let run = Forecaster::default().run(&series).await;

        assert!(run.forecast.is_empty());
        assert!(run.used_fallback);
        assert_eq!(run.order, Some(ModelOrder::new(5, 1, 0)));
    }
}
