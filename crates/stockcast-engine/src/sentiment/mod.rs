//! Community discussion sentiment
//!
//! Threads are pulled from a [`DiscussionSource`](crate::api::DiscussionSource),
//! scored with a [`PolarityScorer`] and reduced to one number by an
//! [`AggregationPolicy`].

pub mod aggregator;
pub mod policy;
pub mod scorer;

pub use aggregator::SentimentAggregator;
pub use policy::{AggregationPolicy, EngagementWeighted, UnweightedMean, engagement_weight};
pub use scorer::{LexiconScorer, PolarityScorer};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{EngineError, Result};

/// Discussion-source API credentials supplied with each request
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl Credentials {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            user_agent: user_agent.into(),
        }
    }

    /// Reject blank fields
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("user_agent", &self.user_agent),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(EngineError::MissingCredentials(missing.join(", ")))
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// One discussion thread (a submission)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscussionThread {
    pub id: String,
    pub title: String,
    /// Self text, empty for link posts
    pub body: String,
    pub score: i64,
    pub num_comments: u64,
    pub permalink: String,
}

impl DiscussionThread {
    /// Case-insensitive ticker match on the title or body
    pub fn mentions(&self, ticker: &str) -> bool {
        let needle = ticker.to_lowercase();
        self.title.to_lowercase().contains(&needle) || self.body.to_lowercase().contains(&needle)
    }
}

/// A top-level reply under a thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommentNode {
    Comment { body: String },
    /// "Load more" placeholder for replies that were not expanded
    MoreChildren { count: u64 },
}

impl CommentNode {
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Comment { body } => Some(body),
            Self::MoreChildren { .. } => None,
        }
    }
}

/// A thread together with its scores
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredThread {
    pub thread: DiscussionThread,
    pub title_polarity: f64,
    pub comment_polarities: Vec<f64>,
    /// `(title + mean(comments)) / 2`, comment mean 0 when there are none
    pub sentiment: f64,
    pub weight: f64,
}

impl ScoredThread {
    pub fn new(thread: DiscussionThread, title_polarity: f64, comment_polarities: Vec<f64>) -> Self {
        let comment_mean = if comment_polarities.is_empty() {
            0.0
        } else {
            comment_polarities.iter().sum::<f64>() / comment_polarities.len() as f64
        };
        let weight = engagement_weight(thread.score, thread.num_comments);

        Self {
            sentiment: (title_polarity + comment_mean) / 2.0,
            weight,
            thread,
            title_polarity,
            comment_polarities,
        }
    }

    pub fn summary(&self) -> PostSummary {
        PostSummary {
            id: self.thread.id.clone(),
            title: self.thread.title.clone(),
            score: self.thread.score,
            num_comments: self.thread.num_comments,
            permalink: self.thread.permalink.clone(),
            sentiment: self.sentiment,
            weight: self.weight,
        }
    }
}

/// Per-post view included in results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub score: i64,
    pub num_comments: u64,
    pub permalink: String,
    pub sentiment: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentErrorKind {
    /// Credentials were rejected
    Authentication,
    /// Anything else: network, timeout, malformed response
    Transient,
}

/// Why sentiment could not be gathered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentError {
    pub kind: SentimentErrorKind,
    pub message: String,
}

impl SentimentError {
    pub const AUTH_MESSAGE: &'static str = "Reddit API credentials are not valid. Please check your Client ID, Client Secret, and User Agent.";

    pub fn authentication() -> Self {
        Self {
            kind: SentimentErrorKind::Authentication,
            message: Self::AUTH_MESSAGE.to_string(),
        }
    }

    pub fn transient(cause: impl fmt::Display) -> Self {
        Self {
            kind: SentimentErrorKind::Transient,
            message: format!("An error occurred while fetching data from Reddit: {cause}"),
        }
    }

    /// Map an upstream failure onto the two user-facing kinds
    pub fn from_engine_error(err: &EngineError) -> Self {
        if err.is_unauthorized() {
            Self::authentication()
        } else {
            Self::transient(err)
        }
    }

    pub fn is_authentication(&self) -> bool {
        self.kind == SentimentErrorKind::Authentication
    }
}

impl fmt::Display for SentimentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Combined sentiment for one ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateSentiment {
    /// Weighted score, 0 when nothing was found or the source failed
    pub score: f64,
    pub posts: Vec<PostSummary>,
    pub error: Option<SentimentError>,
}

impl AggregateSentiment {
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            posts: Vec::new(),
            error: None,
        }
    }

    pub fn failed(error: SentimentError) -> Self {
        Self {
            error: Some(error),
            ..Self::neutral()
        }
    }
}
