//! # cryptosent CLI
//!
//! Every pipeline entry point and read view of the service, plus the HTTP
//! server itself.
//!
//! ## Usage
//!
//! ```bash
//! cryptosent --config ./config/cryptosent.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cryptosent init` | Create the SQLite database and schema |
//! | `cryptosent serve` | Start the HTTP API |
//! | `cryptosent import` | Import archived articles listed in the manifest |
//! | `cryptosent fetch` | Fetch trending coins from the live feed |
//! | `cryptosent analyze` | Score all unscored articles |
//! | `cryptosent stats` | Store statistics |
//! | `cryptosent news` | List articles (`--limit`, `--offset`, `--sentiment`, `--token`) |
//! | `cryptosent sentiment` | Sentiment aggregate (`--token`) |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cryptosent::archive::ArchiveImporter;
use cryptosent::config::{self, Config};
use cryptosent::enrich::SentimentEnricher;
use cryptosent::ingest::run_source;
use cryptosent::live_feed::LiveFeedFetcher;
use cryptosent::llm::create_generator;
use cryptosent::query::{self, ListParams};
use cryptosent::s3::S3ObjectStore;
use cryptosent::store::ArticleStore;
use cryptosent::{db, migrate, server, stats};

/// Crypto news ingestion and sentiment analysis.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. Secrets (AWS credentials, CoinGecko key) come from the environment.
#[derive(Parser)]
#[command(
    name = "cryptosent",
    about = "Crypto news ingestion, LLM sentiment scoring and query API",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/cryptosent.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Start the HTTP API on `[server].bind`.
    Serve,

    /// Import the articles listed in the archive manifest.
    Import,

    /// Fetch trending coins (and optionally coin news) from CoinGecko.
    Fetch,

    /// Run sentiment analysis on every unscored article.
    Analyze,

    /// Show article counts.
    Stats,

    /// List stored articles, newest first.
    News {
        #[arg(long, default_value_t = query::DEFAULT_LIMIT)]
        limit: i64,

        #[arg(long, default_value_t = 0)]
        offset: i64,

        /// bullish, bearish, or neutral.
        #[arg(long)]
        sentiment: Option<String>,

        /// Token symbol, case-insensitive (e.g. `btc`).
        #[arg(long)]
        token: Option<String>,
    },

    /// Aggregate sentiment, optionally for one token.
    Sentiment {
        #[arg(long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cryptosent=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Import => {
            let store = open_store(&cfg).await?;
            let objects = Arc::new(S3ObjectStore::new(&cfg.archive));
            let importer = ArchiveImporter::new(&cfg.archive, objects);
            let result = run_source(&store, &importer).await;
            store.close().await;
            result?.print();
        }
        Commands::Fetch => {
            let store = open_store(&cfg).await?;
            let fetcher = LiveFeedFetcher::new(&cfg.live_feed)?;
            let result = run_source(&store, &fetcher).await;
            store.close().await;
            result?.print();
        }
        Commands::Analyze => {
            let store = Arc::new(open_store(&cfg).await?);
            let generator = create_generator(&cfg.model)?;
            let enricher = SentimentEnricher::new(store.clone(), generator);
            let result = enricher.run().await;
            store.close().await;
            println!("analyze");
            println!("  updated: {}", result?);
            println!("ok");
        }
        Commands::Stats => {
            let store = open_store(&cfg).await?;
            let result = stats::store_stats(&store).await;
            store.close().await;
            stats::print_stats(&result?, &cfg.db.path);
        }
        Commands::News {
            limit,
            offset,
            sentiment,
            token,
        } => {
            let params = ListParams {
                limit: Some(limit),
                offset: Some(offset),
                sentiment,
                token,
            };
            let list_query = params.validate()?;
            let store = open_store(&cfg).await?;
            let result = query::list_articles(&store, &list_query).await;
            store.close().await;
            let page = result?;

            if page.articles.is_empty() {
                println!("No articles.");
            }
            for article in &page.articles {
                let label = article
                    .sentiment
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string());
                let score = article
                    .confidence_score
                    .map(|c| format!("{:.2}", c))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:>6}  {:<8} {:>5}  {}",
                    article.id, label, score, article.title
                );
                println!(
                    "        source: {}  tokens: [{}]",
                    article.source.as_deref().unwrap_or("-"),
                    article.tokens.join(", ")
                );
            }
            println!(
                "\n{} of {} (offset {})",
                page.articles.len(),
                page.total_count,
                page.offset
            );
        }
        Commands::Sentiment { token } => {
            let store = open_store(&cfg).await?;
            let result = query::sentiment_summary(&store, token.as_deref()).await;
            store.close().await;
            println!("{}", serde_json::to_string_pretty(&result?)?);
        }
    }

    Ok(())
}

async fn open_store(cfg: &Config) -> anyhow::Result<ArticleStore> {
    let pool = db::connect(cfg).await?;
    migrate::run_migrations(&pool).await?;
    Ok(ArticleStore::new(pool))
}
