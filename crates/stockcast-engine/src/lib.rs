//! Sentiment-adjusted short-horizon price forecasting
//!
//! For one ticker the engine:
//!
//! - Loads instrument metadata and five years of daily bars
//! - Computes 50 and 200 day trailing moving averages
//! - Searches a bounded ARIMA(p, d, q) grid by AIC and projects 30 calendar days
//! - Scores recent community discussion and reduces it to one engagement-weighted number
//! - Rescales the forecast by sentiment outside a neutral dead zone
//!
//! # Example
//!
//! ```rust,ignore
//! use stockcast_engine::{AnalysisEngine, AnalysisRequest, Credentials, EngineConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = AnalysisEngine::live(EngineConfig::default())?;
//!     let credentials = Credentials::new("client-id", "client-secret", "stockcast/0.1");
//!
//!     let outcome = engine.analyze(AnalysisRequest::new("AAPL", credentials)).await;
//!     println!("{}", serde_json::to_string_pretty(&outcome)?);
//!     Ok(())
//! }
//! ```

pub mod adjust;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod indicators;
pub mod model;
pub mod sentiment;

pub use adjust::ForecastAdjuster;
pub use config::{AuthFailurePolicy, EngineConfig, EngineConfigBuilder};
pub use engine::{AnalysisEngine, AnalysisOutcome, AnalysisReport, AnalysisRequest};
pub use error::{EngineError, Result};
pub use forecast::{Forecast, ForecastPoint, ForecastRun, Forecaster, ModelOrder, OrderBounds};
pub use indicators::IndicatorCalculator;
pub use model::{DisplayInfo, InfoValue, InstrumentInfo, PriceBar, PriceSeries};
pub use sentiment::{AggregateSentiment, Credentials, PostSummary, SentimentError};
