//! Analysis request and result types

use chrono::{DateTime, Utc};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::forecast::{Forecast, ForecastRun, ModelOrder};
use crate::model::{DisplayInfo, PriceSeries};
use crate::sentiment::{Credentials, PostSummary, SentimentError};

/// One analysis request: a ticker and the caller's discussion-source credentials
#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisRequest {
    pub ticker: String,
    pub credentials: Credentials,
}

impl AnalysisRequest {
    pub fn new(ticker: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            ticker: ticker.into(),
            credentials,
        }
    }
}

/// How the forecast was produced
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelSummary {
    pub order: Option<ModelOrder>,
    pub aic: Option<f64>,
    pub used_fallback: bool,
}

impl From<&ForecastRun> for ModelSummary {
    fn from(run: &ForecastRun) -> Self {
        Self {
            order: run.order,
            aic: run.criterion,
            used_fallback: run.used_fallback,
        }
    }
}

/// Everything a renderer needs for a successful analysis
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub request_id: Uuid,
    pub symbol: String,
    pub info: DisplayInfo,
    /// Bars with moving-average columns
    pub history: PriceSeries,
    pub forecast: Forecast,
    pub adjusted_forecast: Forecast,
    pub model: ModelSummary,
    pub sentiment: f64,
    /// Multiplier applied to the forecast (1 when sentiment was neutral)
    pub adjustment_factor: f64,
    pub posts: Vec<PostSummary>,
    pub sentiment_error: Option<SentimentError>,
    pub generated_at: DateTime<Utc>,
}

/// Outcome of [`AnalysisEngine::analyze`](super::AnalysisEngine::analyze)
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Success(Box<AnalysisReport>),
    Failure { error: String },
}

impl AnalysisOutcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Self::Failure {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn report(&self) -> Option<&AnalysisReport> {
        match self {
            Self::Success(report) => Some(report),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success(_) => None,
            Self::Failure { error } => Some(error),
        }
    }
}

#[derive(Serialize)]
struct SuccessView<'a> {
    #[serde(flatten)]
    report: &'a AnalysisReport,
    error: Option<&'a str>,
}

/// Success is the report plus `"error": null`; failure is exactly `{"error": ...}`
impl Serialize for AnalysisOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Success(report) => SuccessView {
                report,
                error: None,
            }
            .serialize(serializer),
            Self::Failure { error } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", error)?;
                map.end()
            }
        }
    }
}
