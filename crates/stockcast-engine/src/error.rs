//! Error types for forecasting and sentiment operations

use std::time::Duration;
use thiserror::Error;

/// Engine level errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Ticker symbol failed validation
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// One or more discussion-source credential fields are blank
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Data not available for the requested symbol
    #[error("Data not available for {symbol}: {reason}")]
    DataUnavailable { symbol: String, reason: String },

    /// No model could be fitted, not even the fallback order
    #[error("Model fit error: {0}")]
    ModelFit(String),

    /// Upstream rejected our credentials
    #[error("Unauthorized by {provider}")]
    Unauthorized { provider: String },

    /// API request failed
    #[error("API error: {0}")]
    Api(String),

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Yahoo Finance API error
    #[error("Yahoo Finance error: {0}")]
    YahooFinance(String),

    /// Technical indicator calculation error
    #[error("Technical indicator error: {0}")]
    Indicator(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A collaborator call exceeded its deadline
    #[error("{operation} timed out after {after:?}")]
    Timeout { operation: String, after: Duration },

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    /// Whether this error means the caller's credentials were rejected
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Convert anyhow::Error to EngineError
impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        EngineError::Other(err.to_string())
    }
}

/// Run `fut` under `limit`, mapping expiry to [`EngineError::Timeout`]
pub async fn with_timeout<T, F>(operation: &str, limit: Duration, fut: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout {
            operation: operation.to_string(),
            after: limit,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::InvalidSymbol("TOOLONG1".to_string());
        assert_eq!(err.to_string(), "Invalid symbol: TOOLONG1");

        let err = EngineError::DataUnavailable {
            symbol: "AAPL".to_string(),
            reason: "No data found".to_string(),
        };
        assert_eq!(err.to_string(), "Data not available for AAPL: No data found");
    }

    #[test]
    fn test_unauthorized_classification() {
        let err = EngineError::Unauthorized {
            provider: "reddit".to_string(),
        };
        assert!(err.is_unauthorized());
        assert!(!EngineError::Api("500".to_string()).is_unauthorized());
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: EngineError = anyhow::anyhow!("boom").into();
        assert!(matches!(err, EngineError::Other(msg) if msg == "boom"));
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let result: Result<()> = with_timeout("slow call", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        match result {
            Err(EngineError::Timeout { operation, .. }) => assert_eq!(operation, "slow call"),
            other => panic!("Expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_with_timeout_passes_through() {
        let result = with_timeout("fast call", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }
}
