//! Configuration for forecasting and sentiment analysis

use crate::error::{EngineError, Result};
use crate::forecast::{ModelOrder, OrderBounds};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// What to do with the whole analysis when the discussion source rejects
/// the caller's credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFailurePolicy {
    /// Keep the unadjusted forecast and surface the credential error alongside it
    #[default]
    Degrade,
    /// Fail the request with the credential error as its only content
    FailRequest,
}

impl FromStr for AuthFailurePolicy {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "degrade" => Ok(Self::Degrade),
            "fail" | "fail_request" => Ok(Self::FailRequest),
            other => Err(EngineError::Config(format!(
                "unknown auth failure policy: {other}"
            ))),
        }
    }
}

/// Configuration for one analysis engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of calendar days to forecast
    pub horizon: usize,

    /// Inclusive bounds of the (p, d, q) search grid
    pub order_bounds: OrderBounds,

    /// Order used when no grid candidate fits
    pub fallback_order: ModelOrder,

    /// Fit grid candidates on the blocking pool instead of one by one
    pub concurrent_order_search: bool,

    /// Short moving-average window
    pub sma_short_window: usize,

    /// Long moving-average window
    pub sma_long_window: usize,

    /// How strongly sentiment rescales the forecast
    pub adjustment_strength: f64,

    /// Sentiment magnitude at or below which the forecast is left alone
    pub dead_zone: f64,

    /// Maximum discussion threads to scan
    pub submission_limit: usize,

    /// Maximum comments scored per thread
    pub comment_limit: usize,

    /// Subreddits searched, joined with `+`
    pub subreddits: String,

    /// Price history lookback in calendar days
    pub lookback_days: i64,

    /// Deadline for each collaborator call
    pub request_timeout: Duration,

    /// Discussion-source requests per minute
    pub reddit_rate_limit: u32,

    /// Behaviour on rejected discussion-source credentials
    pub auth_failure_policy: AuthFailurePolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            horizon: 30,
            order_bounds: OrderBounds::default(),
            fallback_order: ModelOrder::new(5, 1, 0),
            concurrent_order_search: true,
            sma_short_window: 50,
            sma_long_window: 200,
            adjustment_strength: 0.5,
            dead_zone: 0.1,
            submission_limit: 15,
            comment_limit: 10,
            subreddits: "wallstreetbets+stocks".to_string(),
            lookback_days: 1825, // 5 years
            request_timeout: Duration::from_secs(30),
            reddit_rate_limit: 60,
            auth_failure_policy: AuthFailurePolicy::Degrade,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Apply `STOCKCAST_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T> {
            raw.trim()
                .parse()
                .map_err(|_| EngineError::Config(format!("{key} has an invalid value: {raw}")))
        }

        if let Some(raw) = lookup("STOCKCAST_HORIZON") {
            self.horizon = parse("STOCKCAST_HORIZON", &raw)?;
        }
        if let Some(raw) = lookup("STOCKCAST_ADJUSTMENT_STRENGTH") {
            self.adjustment_strength = parse("STOCKCAST_ADJUSTMENT_STRENGTH", &raw)?;
        }
        if let Some(raw) = lookup("STOCKCAST_SUBMISSION_LIMIT") {
            self.submission_limit = parse("STOCKCAST_SUBMISSION_LIMIT", &raw)?;
        }
        if let Some(raw) = lookup("STOCKCAST_COMMENT_LIMIT") {
            self.comment_limit = parse("STOCKCAST_COMMENT_LIMIT", &raw)?;
        }
        if let Some(raw) = lookup("STOCKCAST_AUTH_FAILURE_POLICY") {
            self.auth_failure_policy = raw.parse()?;
        }

        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(EngineError::Config(
                "horizon must be greater than 0".to_string(),
            ));
        }

        if self.sma_short_window == 0 || self.sma_long_window == 0 {
            return Err(EngineError::Config(
                "moving-average windows must be greater than 0".to_string(),
            ));
        }

        if !self.adjustment_strength.is_finite() {
            return Err(EngineError::Config(
                "adjustment_strength must be finite".to_string(),
            ));
        }

        if !self.dead_zone.is_finite() || self.dead_zone < 0.0 {
            return Err(EngineError::Config(
                "dead_zone must be a finite, non-negative number".to_string(),
            ));
        }

        if self.submission_limit == 0 {
            return Err(EngineError::Config(
                "submission_limit must be greater than 0".to_string(),
            ));
        }

        if self.subreddits.trim().is_empty() {
            return Err(EngineError::Config("subreddits must not be empty".to_string()));
        }

        if self.lookback_days <= 0 {
            return Err(EngineError::Config(
                "lookback_days must be greater than 0".to_string(),
            ));
        }

        if self.reddit_rate_limit == 0 {
            return Err(EngineError::Config(
                "reddit_rate_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for EngineConfig
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    horizon: Option<usize>,
    order_bounds: Option<OrderBounds>,
    fallback_order: Option<ModelOrder>,
    concurrent_order_search: Option<bool>,
    adjustment_strength: Option<f64>,
    dead_zone: Option<f64>,
    submission_limit: Option<usize>,
    comment_limit: Option<usize>,
    subreddits: Option<String>,
    lookback_days: Option<i64>,
    request_timeout: Option<Duration>,
    reddit_rate_limit: Option<u32>,
    auth_failure_policy: Option<AuthFailurePolicy>,
}

impl EngineConfigBuilder {
    /// Set the forecast horizon in days
    pub fn horizon(mut self, days: usize) -> Self {
        self.horizon = Some(days);
        self
    }

    /// Set the order search grid
    pub fn order_bounds(mut self, bounds: OrderBounds) -> Self {
        self.order_bounds = Some(bounds);
        self
    }

    /// Set the fallback order
    pub fn fallback_order(mut self, order: ModelOrder) -> Self {
        self.fallback_order = Some(order);
        self
    }

    /// Toggle concurrent order search
    pub fn concurrent_order_search(mut self, enabled: bool) -> Self {
        self.concurrent_order_search = Some(enabled);
        self
    }

    /// Set the sentiment adjustment strength
    pub fn adjustment_strength(mut self, strength: f64) -> Self {
        self.adjustment_strength = Some(strength);
        self
    }

    /// Set the neutral-sentiment dead zone
    pub fn dead_zone(mut self, dead_zone: f64) -> Self {
        self.dead_zone = Some(dead_zone);
        self
    }

    /// Set how many threads to scan
    pub fn submission_limit(mut self, limit: usize) -> Self {
        self.submission_limit = Some(limit);
        self
    }

    /// Set how many comments to score per thread
    pub fn comment_limit(mut self, limit: usize) -> Self {
        self.comment_limit = Some(limit);
        self
    }

    /// Set the searched subreddits
    pub fn subreddits(mut self, subreddits: impl Into<String>) -> Self {
        self.subreddits = Some(subreddits.into());
        self
    }

    /// Set the price history lookback
    pub fn lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = Some(days);
        self
    }

    /// Set the per-call deadline
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set the discussion-source rate limit (requests per minute)
    pub fn reddit_rate_limit(mut self, per_minute: u32) -> Self {
        self.reddit_rate_limit = Some(per_minute);
        self
    }

    /// Set the credential failure policy
    pub fn auth_failure_policy(mut self, policy: AuthFailurePolicy) -> Self {
        self.auth_failure_policy = Some(policy);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<EngineConfig> {
        let defaults = EngineConfig::default();

        let config = EngineConfig {
            horizon: self.horizon.unwrap_or(defaults.horizon),
            order_bounds: self.order_bounds.unwrap_or(defaults.order_bounds),
            fallback_order: self.fallback_order.unwrap_or(defaults.fallback_order),
            concurrent_order_search: self
                .concurrent_order_search
                .unwrap_or(defaults.concurrent_order_search),
            sma_short_window: defaults.sma_short_window,
            sma_long_window: defaults.sma_long_window,
            adjustment_strength: self
                .adjustment_strength
                .unwrap_or(defaults.adjustment_strength),
            dead_zone: self.dead_zone.unwrap_or(defaults.dead_zone),
            submission_limit: self.submission_limit.unwrap_or(defaults.submission_limit),
            comment_limit: self.comment_limit.unwrap_or(defaults.comment_limit),
            subreddits: self.subreddits.unwrap_or(defaults.subreddits),
            lookback_days: self.lookback_days.unwrap_or(defaults.lookback_days),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            reddit_rate_limit: self.reddit_rate_limit.unwrap_or(defaults.reddit_rate_limit),
            auth_failure_policy: self
                .auth_failure_policy
                .unwrap_or(defaults.auth_failure_policy),
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.horizon, 30);
        assert_eq!(config.fallback_order, ModelOrder::new(5, 1, 0));
        assert_eq!(config.order_bounds, OrderBounds::new(2, 2, 2));
        assert_eq!(config.auth_failure_policy, AuthFailurePolicy::Degrade);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::builder()
            .horizon(10)
            .adjustment_strength(0.25)
            .request_timeout(Duration::from_secs(5))
            .auth_failure_policy(AuthFailurePolicy::FailRequest)
            .build()
            .unwrap();

        assert_eq!(config.horizon, 10);
        assert!((config.adjustment_strength - 0.25).abs() < f64::EPSILON);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.auth_failure_policy, AuthFailurePolicy::FailRequest);
    }

    #[test]
    fn test_validation_rejects_zero_horizon() {
        assert!(EngineConfig::builder().horizon(0).build().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_dead_zone() {
        let config = EngineConfig {
            dead_zone: -0.1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::default()
            .with_overrides_from(|key| match key {
                "STOCKCAST_HORIZON" => Some("14".to_string()),
                "STOCKCAST_AUTH_FAILURE_POLICY" => Some("fail".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.horizon, 14);
        assert_eq!(config.auth_failure_policy, AuthFailurePolicy::FailRequest);
    }

    #[test]
    fn test_env_override_parse_error() {
        let result = EngineConfig::default().with_overrides_from(|key| {
            (key == "STOCKCAST_COMMENT_LIMIT").then(|| "lots".to_string())
        });
        assert!(matches!(result, Err(EngineError::Config(_))));
    }
}
