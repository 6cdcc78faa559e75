//! Analysis orchestrator: data, indicators, forecast, sentiment, adjustment

use chrono::Utc;
use regex::Regex;
use std::sync::Arc;
use tracing::{Instrument, info, info_span, warn};
use uuid::Uuid;

use super::result::{AnalysisOutcome, AnalysisReport, AnalysisRequest, ModelSummary};
use crate::adjust::ForecastAdjuster;
use crate::api::{DiscussionSource, MarketDataProvider, RedditClient, YahooFinanceClient};
use crate::config::{AuthFailurePolicy, EngineConfig};
use crate::error::{EngineError, Result, with_timeout};
use crate::forecast::Forecaster;
use crate::indicators::IndicatorCalculator;
use crate::model::{InstrumentInfo, PriceSeries};
use crate::sentiment::{
    AggregateSentiment, AggregationPolicy, Credentials, EngagementWeighted, LexiconScorer,
    PolarityScorer, SentimentAggregator,
};

const TICKER_PATTERN: &str = r"^[A-Za-z0-9]{2,5}$";

/// Runs one analysis per request. Holds no per-request state.
pub struct AnalysisEngine {
    market: Arc<dyn MarketDataProvider>,
    discussions: Arc<dyn DiscussionSource>,
    scorer: Arc<dyn PolarityScorer>,
    policy: Arc<dyn AggregationPolicy>,
    config: Arc<EngineConfig>,
    ticker_pattern: Regex,
}

impl AnalysisEngine {
    pub fn builder() -> AnalysisEngineBuilder {
        AnalysisEngineBuilder::default()
    }

    /// Engine backed by Yahoo Finance and Reddit
    pub fn live(config: EngineConfig) -> Result<Self> {
        let reddit = RedditClient::new(config.subreddits.clone(), config.reddit_rate_limit);

        Self::builder()
            .market_data(Arc::new(YahooFinanceClient::new()))
            .discussions(Arc::new(reddit))
            .config(config)
            .build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run the full pipeline for one request.
    ///
    /// Never returns an error: every failure becomes
    /// [`AnalysisOutcome::Failure`] carrying a user-facing message.
    pub async fn analyze(&self, request: AnalysisRequest) -> AnalysisOutcome {
        let request_id = Uuid::new_v4();
        let span = info_span!("analysis", %request_id, ticker = %request.ticker);

        self.run(request_id, request).instrument(span).await
    }

    /// Discussion sentiment and the posts behind it, without a forecast
    pub async fn sentiment_only(
        &self,
        ticker: &str,
        credentials: &Credentials,
    ) -> Result<AggregateSentiment> {
        let symbol = self.validate(ticker, credentials)?;
        Ok(self.aggregator().aggregate(&symbol, credentials).await)
    }

    /// Normalized ticker, or why the input is unusable
    fn validate(&self, ticker: &str, credentials: &Credentials) -> Result<String> {
        let ticker = ticker.trim();
        if !self.ticker_pattern.is_match(ticker) {
            return Err(EngineError::InvalidSymbol(format!(
                "'{ticker}' must be 2 to 5 letters or digits"
            )));
        }
        credentials.validate()?;
        Ok(ticker.to_uppercase())
    }

    fn aggregator(&self) -> SentimentAggregator {
        SentimentAggregator::from_config(
            Arc::clone(&self.discussions),
            Arc::clone(&self.scorer),
            Arc::clone(&self.policy),
            &self.config,
        )
    }

    async fn load_series(&self, symbol: &str) -> Result<(InstrumentInfo, PriceSeries)> {
        let timeout = self.config.request_timeout;

        let info = with_timeout("instrument info", timeout, self.market.instrument_info(symbol)).await?;
        if !info.is_complete() {
            return Err(EngineError::DataUnavailable {
                symbol: symbol.to_string(),
                reason: "Provider returned no name or symbol".to_string(),
            });
        }

        let bars = with_timeout(
            "price history",
            timeout,
            self.market.price_history(symbol, self.config.lookback_days),
        )
        .await?;
        let series = PriceSeries::new(symbol, bars)?;

        Ok((info, series))
    }

    async fn run(&self, request_id: Uuid, request: AnalysisRequest) -> AnalysisOutcome {
        let symbol = match self.validate(&request.ticker, &request.credentials) {
            Ok(symbol) => symbol,
            Err(e) => {
                warn!(error = %e, "Rejected analysis request");
                return AnalysisOutcome::failure(e.to_string());
            }
        };

        let (info, mut series) = match self.load_series(&symbol).await {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!(error = %e, "Market data unavailable");
                return AnalysisOutcome::failure(format!(
                    "Could not fetch data for {symbol}. It may be an invalid ticker."
                ));
            }
        };
        info!(bars = series.len(), "Loaded price history");

        let indicators =
            IndicatorCalculator::new(self.config.sma_short_window, self.config.sma_long_window);
        if let Err(e) = indicators.apply(&mut series) {
            warn!(error = %e, "Indicator calculation failed");
            return AnalysisOutcome::failure(e.to_string());
        }

        let run = Forecaster::from_config(&self.config).run(&series).await;
        if run.forecast.is_empty() {
            warn!(order = ?run.order, "No usable forecast");
            return AnalysisOutcome::failure(format!("Could not generate a forecast for {symbol}."));
        }
        info!(steps = run.forecast.len(), used_fallback = run.used_fallback, "Forecast ready");

        let sentiment = self.aggregator().aggregate(&symbol, &request.credentials).await;
        if self.config.auth_failure_policy == AuthFailurePolicy::FailRequest {
            if let Some(error) = sentiment.error.as_ref().filter(|e| e.is_authentication()) {
                return AnalysisOutcome::failure(error.message.clone());
            }
        }

        let adjuster = ForecastAdjuster::from_config(&self.config);
        let adjusted_forecast = adjuster.adjust(&run.forecast, sentiment.score);
        let adjustment_factor = adjuster.factor(sentiment.score);
        info!(
            sentiment = sentiment.score,
            factor = adjustment_factor,
            "Analysis complete"
        );

        AnalysisOutcome::Success(Box::new(AnalysisReport {
            request_id,
            symbol,
            info: info.to_display(),
            history: series,
            model: ModelSummary::from(&run),
            forecast: run.forecast,
            adjusted_forecast,
            sentiment: sentiment.score,
            adjustment_factor,
            posts: sentiment.posts,
            sentiment_error: sentiment.error,
            generated_at: Utc::now(),
        }))
    }
}

/// Builder for [`AnalysisEngine`]
#[derive(Default)]
pub struct AnalysisEngineBuilder {
    market: Option<Arc<dyn MarketDataProvider>>,
    discussions: Option<Arc<dyn DiscussionSource>>,
    scorer: Option<Arc<dyn PolarityScorer>>,
    policy: Option<Arc<dyn AggregationPolicy>>,
    config: Option<EngineConfig>,
}

impl AnalysisEngineBuilder {
    pub fn market_data(mut self, market: Arc<dyn MarketDataProvider>) -> Self {
        self.market = Some(market);
        self
    }

    pub fn discussions(mut self, discussions: Arc<dyn DiscussionSource>) -> Self {
        self.discussions = Some(discussions);
        self
    }

    /// Defaults to [`LexiconScorer`]
    pub fn scorer(mut self, scorer: Arc<dyn PolarityScorer>) -> Self {
        self.scorer = Some(scorer);
        self
    }

    /// Defaults to [`EngagementWeighted`]
    pub fn policy(mut self, policy: Arc<dyn AggregationPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<AnalysisEngine> {
        let market = self
            .market
            .ok_or_else(|| EngineError::Config("market data provider is required".to_string()))?;
        let discussions = self
            .discussions
            .ok_or_else(|| EngineError::Config("discussion source is required".to_string()))?;

        let scorer = match self.scorer {
            Some(scorer) => scorer,
            None => Arc::new(LexiconScorer::new()?),
        };
        let policy = self.policy.unwrap_or_else(|| Arc::new(EngagementWeighted));

        let config = self.config.unwrap_or_default();
        config.validate()?;

        let ticker_pattern = Regex::new(TICKER_PATTERN)
            .map_err(|e| EngineError::Other(format!("invalid ticker pattern: {e}")))?;

        Ok(AnalysisEngine {
            market,
            discussions,
            scorer,
            policy,
            config: Arc::new(config),
            ticker_pattern,
        })
    }
}
