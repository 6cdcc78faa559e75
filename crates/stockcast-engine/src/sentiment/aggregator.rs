//! Collects discussion threads for a ticker and reduces them to one score

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{
    AggregateSentiment, AggregationPolicy, CommentNode, Credentials, EngagementWeighted,
    PolarityScorer, ScoredThread, SentimentError,
};
use crate::api::DiscussionSource;
use crate::config::EngineConfig;
use crate::error::{Result, with_timeout};

/// Gathers and scores discussion sentiment for one ticker at a time
#[derive(Clone)]
pub struct SentimentAggregator {
    source: Arc<dyn DiscussionSource>,
    scorer: Arc<dyn PolarityScorer>,
    policy: Arc<dyn AggregationPolicy>,
    submission_limit: usize,
    comment_limit: usize,
    timeout: Duration,
}

impl SentimentAggregator {
    pub fn new(source: Arc<dyn DiscussionSource>, scorer: Arc<dyn PolarityScorer>) -> Self {
        let defaults = EngineConfig::default();
        Self {
            source,
            scorer,
            policy: Arc::new(EngagementWeighted),
            submission_limit: defaults.submission_limit,
            comment_limit: defaults.comment_limit,
            timeout: defaults.request_timeout,
        }
    }

    pub fn from_config(
        source: Arc<dyn DiscussionSource>,
        scorer: Arc<dyn PolarityScorer>,
        policy: Arc<dyn AggregationPolicy>,
        config: &EngineConfig,
    ) -> Self {
        Self::new(source, scorer)
            .policy(policy)
            .limits(config.submission_limit, config.comment_limit)
            .timeout(config.request_timeout)
    }

    pub fn policy(mut self, policy: Arc<dyn AggregationPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Threads scanned and comments scored per thread
    pub fn limits(mut self, submissions: usize, comments: usize) -> Self {
        self.submission_limit = submissions;
        self.comment_limit = comments;
        self
    }

    /// Deadline for each call to the discussion source
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sentiment for `ticker`.
    ///
    /// Never fails: upstream problems produce a neutral score with
    /// [`AggregateSentiment::error`] set.
    pub async fn aggregate(&self, ticker: &str, credentials: &Credentials) -> AggregateSentiment {
        match self.collect(ticker, credentials).await {
            Ok(scored) => match self.policy.aggregate(&scored) {
                Some(score) => {
                    info!(ticker, threads = scored.len(), score, "Aggregated discussion sentiment");
                    AggregateSentiment {
                        score,
                        posts: scored.iter().map(ScoredThread::summary).collect(),
                        error: None,
                    }
                }
                None => {
                    debug!(ticker, threads = scored.len(), "Sentiment undefined for these threads");
                    AggregateSentiment::neutral()
                }
            },
            Err(e) => {
                let error = SentimentError::from_engine_error(&e);
                warn!(ticker, error = %e, kind = ?error.kind, "Discussion sentiment unavailable");
                AggregateSentiment::failed(error)
            }
        }
    }

    async fn collect(&self, ticker: &str, credentials: &Credentials) -> Result<Vec<ScoredThread>> {
        let session = with_timeout(
            "discussion authentication",
            self.timeout,
            self.source.authenticate(credentials),
        )
        .await?;

        let query = format!("\"{ticker}\"");
        let threads = with_timeout(
            "discussion search",
            self.timeout,
            session.search(&query, self.submission_limit),
        )
        .await?;

        let mut scored = Vec::new();
        for thread in threads.into_iter().filter(|t| t.mentions(ticker)) {
            let nodes = with_timeout(
                "discussion comments",
                self.timeout,
                session.comments(&thread, self.comment_limit),
            )
            .await?;

            let comment_polarities: Vec<f64> = nodes
                .iter()
                .filter_map(CommentNode::body)
                .take(self.comment_limit)
                .map(|body| self.scorer.polarity(body))
                .collect();
            let title_polarity = self.scorer.polarity(&thread.title);

            let unit = ScoredThread::new(thread, title_polarity, comment_polarities);
            debug!(
                id = %unit.thread.id,
                sentiment = unit.sentiment,
                weight = unit.weight,
                comments = unit.comment_polarities.len(),
                "Scored thread"
            );
            scored.push(unit);
        }

        Ok(scored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{DiscussionSession, FixtureDiscussionSource};
    use crate::error::EngineError;
    use crate::sentiment::scorer::MockPolarityScorer;
    use crate::sentiment::{DiscussionThread, SentimentErrorKind, UnweightedMean};
    use async_trait::async_trait;

    fn creds() -> Credentials {
        Credentials::new("id", "secret", "stockcast-test/0.1")
    }

    fn thread(id: &str, title: &str, score: i64, num_comments: u64) -> DiscussionThread {
        DiscussionThread {
            id: id.to_string(),
            title: title.to_string(),
            body: String::new(),
            score,
            num_comments,
            permalink: format!("/r/stocks/comments/{id}/"),
        }
    }

    fn comment(body: &str) -> CommentNode {
        CommentNode::Comment {
            body: body.to_string(),
        }
    }

    fn table_scorer() -> MockPolarityScorer {
        let mut scorer = MockPolarityScorer::new();
        scorer.expect_polarity().returning(|text| match text {
            "AAPL rocket" | "yes" => 0.8,
            "AAPL meh" | "no" => -0.2,
            _ => 0.0,
        });
        scorer
    }

    #[tokio::test]
    async fn test_weighted_aggregate_with_mock_scorer() {
        let source = FixtureDiscussionSource::new(creds())
            .with_thread(thread("a", "AAPL rocket", 100, 0), vec![comment("yes")])
            .with_thread(thread("b", "AAPL meh", 0, 0), vec![comment("no")]);

        let aggregator = SentimentAggregator::new(Arc::new(source), Arc::new(table_scorer()));
        let result = aggregator.aggregate("AAPL", &creds()).await;

        assert!(result.error.is_none());
        assert_eq!(result.posts.len(), 2);
        assert!((result.posts[0].sentiment - 0.8).abs() < 1e-12);
        assert!((result.posts[0].weight - 2.0).abs() < 1e-12);
        assert!((result.score - 1.4 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_policy_is_pluggable() {
        let source = FixtureDiscussionSource::new(creds())
            .with_thread(thread("a", "AAPL rocket", 100, 0), vec![comment("yes")])
            .with_thread(thread("b", "AAPL meh", 0, 0), vec![comment("no")]);

        let aggregator = SentimentAggregator::new(Arc::new(source), Arc::new(table_scorer()))
            .policy(Arc::new(UnweightedMean));
        let result = aggregator.aggregate("AAPL", &creds()).await;

        assert!((result.score - 0.3).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_threads_must_mention_ticker() {
        let mut off_topic = thread("c", "Market wrap", 500, 300);
        off_topic.body = "Nothing about apples here".to_string();
        let mut in_body = thread("d", "Earnings tonight", 10, 5);
        in_body.body = "Anyone holding aapl?".to_string();

        let source = FixtureDiscussionSource::new(creds())
            .with_thread(off_topic, vec![comment("yes")])
            .with_thread(in_body, vec![comment("yes")]);

        let aggregator = SentimentAggregator::new(Arc::new(source), Arc::new(table_scorer()));
        let result = aggregator.aggregate("AAPL", &creds()).await;

        assert_eq!(result.posts.len(), 1);
        assert_eq!(result.posts[0].id, "d");
    }

    #[tokio::test]
    async fn test_more_placeholders_dropped_and_comments_capped() {
        let source = FixtureDiscussionSource::new(creds()).with_thread(
            thread("a", "AAPL rocket", 0, 0),
            vec![
                CommentNode::MoreChildren { count: 40 },
                comment("yes"),
                comment("no"),
                comment("yes"),
            ],
        );

        let mut scorer = MockPolarityScorer::new();
        // title plus two comments
        scorer.expect_polarity().times(3).returning(|_| 0.5);

        let aggregator =
            SentimentAggregator::new(Arc::new(source), Arc::new(scorer)).limits(15, 2);
        let result = aggregator.aggregate("AAPL", &creds()).await;

        assert_eq!(result.posts.len(), 1);
        assert!((result.score - 0.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_no_threads_is_neutral() {
        let source = FixtureDiscussionSource::new(creds());
        let aggregator = SentimentAggregator::new(Arc::new(source), Arc::new(table_scorer()));
        let result = aggregator.aggregate("AAPL", &creds()).await;

        assert_eq!(result, AggregateSentiment::neutral());
    }

    #[tokio::test]
    async fn test_zero_total_weight_is_neutral() {
        // 1 + (-100 / 100) + 0 / 50 = 0
        let source = FixtureDiscussionSource::new(creds())
            .with_thread(thread("a", "AAPL rocket", -100, 0), Vec::new());
        let aggregator = SentimentAggregator::new(Arc::new(source), Arc::new(table_scorer()));
        let result = aggregator.aggregate("AAPL", &creds()).await;

        assert_eq!(result, AggregateSentiment::neutral());
        assert!(result.posts.is_empty());
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let source = FixtureDiscussionSource::sample(creds(), &["AAPL"], 5);
        let aggregator = SentimentAggregator::new(Arc::new(source), Arc::new(table_scorer()));

        let bad = Credentials::new("id", "nope", "stockcast-test/0.1");
        let result = aggregator.aggregate("AAPL", &bad).await;

        assert_eq!(result.score, 0.0);
        assert!(result.posts.is_empty());
        let error = result.error.unwrap();
        assert_eq!(error.kind, SentimentErrorKind::Authentication);
        assert_eq!(
            error.message,
            "Reddit API credentials are not valid. Please check your Client ID, Client Secret, and User Agent."
        );
    }

    #[tokio::test]
    async fn test_transient_failure() {
        let source = FixtureDiscussionSource::sample(creds(), &["AAPL"], 5).failing("503");
        let aggregator = SentimentAggregator::new(Arc::new(source), Arc::new(table_scorer()));
        let result = aggregator.aggregate("AAPL", &creds()).await;

        assert_eq!(result.score, 0.0);
        let error = result.error.unwrap();
        assert_eq!(error.kind, SentimentErrorKind::Transient);
        assert_eq!(
            error.message,
            "An error occurred while fetching data from Reddit: API error: 503"
        );
    }

    struct StalledSource;

    #[async_trait]
    impl DiscussionSource for StalledSource {
        async fn authenticate(
            &self,
            _credentials: &Credentials,
        ) -> Result<Box<dyn DiscussionSession>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Err(EngineError::Other("unreachable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_timeout_is_transient() {
        let aggregator = SentimentAggregator::new(Arc::new(StalledSource), Arc::new(table_scorer()))
            .timeout(Duration::from_millis(20));
        let result = aggregator.aggregate("AAPL", &creds()).await;

        let error = result.error.unwrap();
        assert_eq!(error.kind, SentimentErrorKind::Transient);
        assert!(error.message.contains("timed out"));
    }
}
