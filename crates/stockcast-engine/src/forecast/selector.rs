//! Exhaustive AIC search over a bounded (p, d, q) grid

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, warn};

use super::arima::{ArimaModel, FitError};
use super::{FitResult, ModelOrder, OrderBounds};

/// Picks the order with the lowest information criterion
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderSelector {
    bounds: OrderBounds,
}

impl OrderSelector {
    pub fn new(bounds: OrderBounds) -> Self {
        Self { bounds }
    }

    pub fn bounds(&self) -> OrderBounds {
        self.bounds
    }

    /// Fit every grid order one after another
    pub fn select(&self, closes: &[f64]) -> Option<FitResult> {
        pick_best(
            self.bounds
                .orders()
                .map(|order| (order, evaluate(closes, order))),
        )
    }

    /// Fit every grid order on the blocking pool.
    ///
    /// Results are gathered in enumeration order before reduction, so the
    /// outcome is identical to [`select`](Self::select).
    pub async fn select_concurrent(&self, closes: Arc<[f64]>) -> Option<FitResult> {
        let handles = self.bounds.orders().map(|order| {
            let closes = Arc::clone(&closes);
            tokio::task::spawn_blocking(move || (order, evaluate(&closes, order)))
        });

        let results = join_all(handles).await;

        pick_best(results.into_iter().filter_map(|joined| match joined {
            Ok(candidate) => Some(candidate),
            Err(e) => {
                warn!(error = %e, "Order fit task did not complete");
                None
            }
        }))
    }
}

fn evaluate(closes: &[f64], order: ModelOrder) -> Result<f64, FitError> {
    ArimaModel::fit(closes, order).map(|model| model.aic())
}

/// Deterministic reduction over candidates in enumeration order.
///
/// Failed fits and non-finite criteria are skipped. A later candidate
/// replaces the incumbent only with a strictly lower criterion, so ties keep
/// the first-seen order. `None` when nothing fitted.
pub fn pick_best<I>(candidates: I) -> Option<FitResult>
where
    I: IntoIterator<Item = (ModelOrder, Result<f64, FitError>)>,
{
    candidates
        .into_iter()
        .fold(None, |best: Option<FitResult>, (order, outcome)| match outcome {
            Ok(criterion) if criterion.is_finite() => {
                debug!(order = %order, aic = criterion, "Fitted candidate order");
                match best {
                    Some(incumbent) if incumbent.criterion <= criterion => Some(incumbent),
                    _ => Some(FitResult { order, criterion }),
                }
            }
            Ok(criterion) => {
                debug!(order = %order, aic = criterion, "Skipping order with non-finite criterion");
                best
            }
            Err(e) => {
                debug!(order = %order, error = %e, "Skipping order that failed to fit");
                best
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trending_series(n: usize) -> Vec<f64> {
        (0..n)
            .map(|t| {
                let t = t as f64;
                100.0 + 0.05 * t + 2.0 * (t * 0.3).sin() + (t * 1.7).cos()
            })
            .collect()
    }

    #[test]
    fn test_pick_best_keeps_first_on_tie() {
        let candidates = vec![
            (ModelOrder::new(0, 0, 1), Ok(10.0)),
            (ModelOrder::new(1, 0, 0), Ok(10.0)),
            (ModelOrder::new(2, 0, 0), Ok(11.0)),
        ];
        let best = pick_best(candidates).unwrap();
        assert_eq!(best.order, ModelOrder::new(0, 0, 1));
    }

    #[test]
    fn test_pick_best_skips_failures_and_nan() {
        let candidates = vec![
            (ModelOrder::new(0, 0, 0), Err(FitError::Singular)),
            (ModelOrder::new(0, 0, 1), Ok(f64::NAN)),
            (ModelOrder::new(0, 1, 0), Ok(f64::NEG_INFINITY)),
            (ModelOrder::new(1, 1, 0), Ok(25.0)),
        ];
        let best = pick_best(candidates).unwrap();
        assert_eq!(best.order, ModelOrder::new(1, 1, 0));
        assert!((best.criterion - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pick_best_all_failed() {
        let candidates = vec![
            (ModelOrder::new(0, 0, 0), Err(FitError::Singular)),
            (ModelOrder::new(1, 0, 0), Err(FitError::NonStationary)),
        ];
        assert!(pick_best(candidates).is_none());
    }

    #[test]
    fn test_select_is_deterministic() {
        let closes = trending_series(300);
        let selector = OrderSelector::default();

        let first = selector.select(&closes).unwrap();
        let second = selector.select(&closes).unwrap();
        assert_eq!(first.order, second.order);
        assert!((first.criterion - second.criterion).abs() < f64::EPSILON);
    }

    #[test]
    fn test_select_reports_nothing_when_every_fit_fails() {
        let selector = OrderSelector::default();
        assert!(selector.select(&[1.0, 2.0, 3.0, 4.0, 5.0]).is_none());
        assert!(selector.select(&[7.0; 120]).is_none());
    }

    #[tokio::test]
    async fn test_concurrent_matches_sequential() {
        let closes = trending_series(300);
        let selector = OrderSelector::default();

        let sequential = selector.select(&closes);
        let concurrent = selector.select_concurrent(closes.into()).await;
        assert_eq!(sequential, concurrent);
    }
}
