//! Reddit discussion client (application-only OAuth)

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::debug;

use super::{DiscussionSession, DiscussionSource};
use crate::error::{EngineError, Result};
use crate::sentiment::{CommentNode, Credentials, DiscussionThread};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const PROVIDER: &str = "Reddit";

type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Reddit client searching a fixed set of subreddits
#[derive(Debug, Clone)]
pub struct RedditClient {
    client: Client,
    subreddits: String,
    rate_limiter: SharedRateLimiter,
}

impl RedditClient {
    /// Create a client for `subreddits` (joined with `+`) allowing
    /// `rate_limit` requests per minute
    pub fn new(subreddits: impl Into<String>, rate_limit: u32) -> Self {
        let quota = Quota::per_minute(NonZeroU32::new(rate_limit).unwrap_or(NonZeroU32::MIN));

        Self {
            client: Client::new(),
            subreddits: subreddits.into(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    pub fn subreddits(&self) -> &str {
        &self.subreddits
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<serde_json::Value>,
}

#[async_trait]
impl DiscussionSource for RedditClient {
    async fn authenticate(&self, credentials: &Credentials) -> Result<Box<dyn DiscussionSession>> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .header(reqwest::header::USER_AGENT, &credentials.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let response = check_status(response)?;
        let token: TokenResponse = response.json().await?;

        if let Some(error) = token.error {
            debug!(%error, "Token endpoint rejected credentials");
            return Err(unauthorized());
        }

        let access_token = token
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(unauthorized)?;

        Ok(Box::new(RedditSession {
            client: self.client.clone(),
            access_token,
            user_agent: credentials.user_agent.clone(),
            subreddits: self.subreddits.clone(),
            rate_limiter: Arc::clone(&self.rate_limiter),
        }))
    }
}

/// Session holding a bearer token
struct RedditSession {
    client: Client,
    access_token: String,
    user_agent: String,
    subreddits: String,
    rate_limiter: SharedRateLimiter,
}

impl RedditSession {
    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<serde_json::Value> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(format!("{API_BASE}{path}"))
            .bearer_auth(&self.access_token)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .query(query)
            .send()
            .await?;

        let response = check_status(response)?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DiscussionSession for RedditSession {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<DiscussionThread>> {
        let path = format!("/r/{}/search", self.subreddits);
        let params = [
            ("q", query.to_string()),
            ("restrict_sr", "1".to_string()),
            ("sort", "relevance".to_string()),
            ("limit", limit.to_string()),
            ("raw_json", "1".to_string()),
        ];

        let body = self.get_json(&path, &params).await?;
        let threads = parse_threads(body)?;
        debug!(query, found = threads.len(), "Searched discussions");

        Ok(threads.into_iter().take(limit).collect())
    }

    async fn comments(&self, thread: &DiscussionThread, limit: usize) -> Result<Vec<CommentNode>> {
        let path = format!("/comments/{}", thread.id);
        let params = [
            ("depth", "1".to_string()),
            ("limit", limit.to_string()),
            ("raw_json", "1".to_string()),
        ];

        let body = self.get_json(&path, &params).await?;
        parse_comments(body)
    }
}

fn unauthorized() -> EngineError {
    EngineError::Unauthorized {
        provider: PROVIDER.to_string(),
    }
}

fn check_status(response: Response) -> Result<Response> {
    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(unauthorized()),
        status if !status.is_success() => {
            Err(EngineError::Api(format!("{PROVIDER} HTTP error: {status}")))
        }
        _ => Ok(response),
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct Submission {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: u64,
    #[serde(default)]
    permalink: String,
}

#[derive(Debug, Deserialize)]
struct Comment {
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct More {
    #[serde(default)]
    count: u64,
}

/// Submissions from a search listing
fn parse_threads(body: serde_json::Value) -> Result<Vec<DiscussionThread>> {
    let listing: Listing = serde_json::from_value(body)?;

    listing
        .data
        .children
        .into_iter()
        .filter(|thing| thing.kind == "t3")
        .map(|thing| -> Result<DiscussionThread> {
            let s: Submission = serde_json::from_value(thing.data)?;
            Ok(DiscussionThread {
                id: s.id,
                title: s.title,
                body: s.selftext,
                score: s.score,
                num_comments: s.num_comments,
                permalink: s.permalink,
            })
        })
        .collect()
}

/// Top-level replies from a comments response (`[submission, replies]`)
fn parse_comments(body: serde_json::Value) -> Result<Vec<CommentNode>> {
    let mut listings: Vec<Listing> = serde_json::from_value(body)?;
    if listings.len() < 2 {
        return Err(EngineError::Api(format!(
            "{PROVIDER} comments response has {} listings, expected 2",
            listings.len()
        )));
    }
    let replies = listings.swap_remove(1);

    let mut nodes = Vec::with_capacity(replies.data.children.len());
    for thing in replies.data.children {
        match thing.kind.as_str() {
            "t1" => {
                let c: Comment = serde_json::from_value(thing.data)?;
                nodes.push(CommentNode::Comment { body: c.body });
            }
            "more" => {
                let m: More = serde_json::from_value(thing.data)?;
                nodes.push(CommentNode::MoreChildren { count: m.count });
            }
            other => debug!(kind = other, "Skipping unexpected listing entry"),
        }
    }
    Ok(nodes)
}
