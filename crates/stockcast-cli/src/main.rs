//! Command-line interface for stockcast
//!
//! # Usage
//!
//! ```bash
//! export REDDIT_CLIENT_ID="..."
//! export REDDIT_CLIENT_SECRET="..."
//! export REDDIT_USER_AGENT="stockcast/0.1 by u/you"
//!
//! stockcast analyze AAPL
//! stockcast --json analyze MSFT --horizon 14
//! stockcast sentiment TSLA
//! stockcast --offline analyze AAPL   # fixture data, no network
//! ```

use std::env;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use comfy_table::{ContentArrangement, Table, presets::UTF8_FULL};
use tracing::info;

use stockcast_engine::api::{FixtureDiscussionSource, FixtureMarketData};
use stockcast_engine::{
    AggregateSentiment, AnalysisEngine, AnalysisOutcome, AnalysisReport, AnalysisRequest,
    Credentials, EngineConfig,
};
use stockcast_utils::{AppConfig, LogFormat, init_tracing};

#[derive(Parser, Debug)]
#[command(name = "stockcast")]
#[command(about = "Sentiment-adjusted ARIMA stock forecasts", long_about = None)]
struct Cli {
    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Use built-in fixture data instead of Yahoo Finance and Reddit
    #[arg(long, global = true)]
    offline: bool,

    /// Log line format (text or json); overrides STOCKCAST_LOG_FORMAT
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Forecast a ticker and adjust the forecast by discussion sentiment
    Analyze {
        /// Ticker symbol, 2 to 5 letters or digits
        ticker: String,

        /// Days to forecast
        #[arg(long)]
        horizon: Option<usize>,

        /// How strongly sentiment rescales the forecast
        #[arg(long)]
        strength: Option<f64>,

        #[command(flatten)]
        credentials: CredentialArgs,
    },
    /// Show the discussion threads and the sentiment behind a ticker
    Sentiment {
        /// Ticker symbol, 2 to 5 letters or digits
        ticker: String,

        #[command(flatten)]
        credentials: CredentialArgs,
    },
}

/// Reddit API credentials; each falls back to its environment variable
#[derive(Args, Debug, Clone, Default)]
struct CredentialArgs {
    /// Reddit client ID [env: REDDIT_CLIENT_ID]
    #[arg(long)]
    client_id: Option<String>,

    /// Reddit client secret [env: REDDIT_CLIENT_SECRET]
    #[arg(long)]
    client_secret: Option<String>,

    /// Reddit user agent [env: REDDIT_USER_AGENT]
    #[arg(long)]
    user_agent: Option<String>,
}

impl CredentialArgs {
    fn resolve(self) -> Credentials {
        self.resolve_with(|key| env::var(key).ok())
    }

    /// Missing values stay blank; the engine reports them
    fn resolve_with(self, lookup: impl Fn(&str) -> Option<String>) -> Credentials {
        let pick = |flag: Option<String>, key: &str| flag.or_else(|| lookup(key)).unwrap_or_default();
        Credentials::new(
            pick(self.client_id, "REDDIT_CLIENT_ID"),
            pick(self.client_secret, "REDDIT_CLIENT_SECRET"),
            pick(self.user_agent, "REDDIT_USER_AGENT"),
        )
    }
}

fn build_engine(
    config: EngineConfig,
    offline: bool,
    ticker: &str,
    credentials: &Credentials,
) -> anyhow::Result<AnalysisEngine> {
    let engine = if offline {
        let symbol = ticker.trim().to_uppercase();
        AnalysisEngine::builder()
            .market_data(Arc::new(FixtureMarketData::demo()))
            .discussions(Arc::new(FixtureDiscussionSource::sample(
                credentials.clone(),
                &[symbol.as_str()],
                config.submission_limit,
            )))
            .config(config)
            .build()?
    } else {
        AnalysisEngine::live(config)?
    };
    Ok(engine)
}

fn print_report(report: &AnalysisReport) {
    let mut info = Table::new();
    info.load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Field", "Value"]);
    for (label, value) in report.info.fields() {
        info.add_row(vec![label.to_string(), value.to_string()]);
    }
    println!("{info}");

    match report.model.order {
        Some(order) => println!(
            "Model: ARIMA{order}{}  AIC: {}",
            if report.model.used_fallback { " (fallback)" } else { "" },
            report
                .model
                .aic
                .map_or_else(|| "n/a".to_string(), |aic| format!("{aic:.2}")),
        ),
        None => println!("Model: none"),
    }
    println!(
        "Sentiment: {:+.4}  Adjustment factor: {:.4}  Posts: {}",
        report.sentiment,
        report.adjustment_factor,
        report.posts.len()
    );
    if let Some(error) = &report.sentiment_error {
        println!("Sentiment unavailable: {error}");
    }

    let mut forecast = Table::new();
    forecast
        .load_preset(UTF8_FULL)
        .set_header(vec!["Date", "Forecast", "Adjusted"]);
    for (raw, adjusted) in report
        .forecast
        .points()
        .iter()
        .zip(report.adjusted_forecast.points())
    {
        forecast.add_row(vec![
            raw.date.to_string(),
            format!("{:.2}", raw.value),
            format!("{:.2}", adjusted.value),
        ]);
    }
    println!("{forecast}");
}

fn print_sentiment(ticker: &str, sentiment: &AggregateSentiment) {
    if let Some(error) = &sentiment.error {
        println!("{error}");
        return;
    }

    println!(
        "{ticker}: sentiment {:+.4} across {} posts",
        sentiment.score,
        sentiment.posts.len()
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Title", "Score", "Comments", "Sentiment", "Weight"]);
    for post in &sentiment.posts {
        table.add_row(vec![
            post.title.clone(),
            post.score.to_string(),
            post.num_comments.to_string(),
            format!("{:+.3}", post.sentiment),
            format!("{:.2}", post.weight),
        ]);
    }
    println!("{table}");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let app = AppConfig::from_env();
    init_tracing(cli.log_format.unwrap_or(app.log_format));
    info!(environment = %app.environment, offline = cli.offline, "Starting {}", app.app_name);

    let mut config = EngineConfig::default()
        .with_env_overrides()
        .context("invalid STOCKCAST_* environment")?;

    match cli.command {
        Command::Analyze {
            ticker,
            horizon,
            strength,
            credentials,
        } => {
            if let Some(horizon) = horizon {
                config.horizon = horizon;
            }
            if let Some(strength) = strength {
                config.adjustment_strength = strength;
            }
            config.validate()?;

            let credentials = credentials.resolve();
            let engine = build_engine(config, cli.offline, &ticker, &credentials)?;
            let outcome = engine.analyze(AnalysisRequest::new(ticker, credentials)).await;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            match outcome {
                AnalysisOutcome::Success(report) => {
                    if !cli.json {
                        print_report(&report);
                    }
                }
                AnalysisOutcome::Failure { error } => anyhow::bail!(error),
            }
        }
        Command::Sentiment {
            ticker,
            credentials,
        } => {
            let credentials = credentials.resolve();
            let engine = build_engine(config, cli.offline, &ticker, &credentials)?;
            let sentiment = engine.sentiment_only(&ticker, &credentials).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&sentiment)?);
            } else {
                print_sentiment(&ticker.to_uppercase(), &sentiment);
            }
        }
    }

    Ok(())
}
