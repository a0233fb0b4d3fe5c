//! # cryptosent
//!
//! Crypto news ingestion with LLM sentiment scoring.
//!
//! Articles arrive from two sources (a document archive in S3 and the
//! CoinGecko market-data API), are scored bullish / bearish / neutral by a
//! text-generation model, stored in SQLite, and served through a small
//! query API and CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────┐   ┌──────────┐
//! │ Sources          │──▶│  ingest      │──▶│  SQLite  │
//! │ archive / live   │   │ dedup+commit │   │ articles │
//! └──────────────────┘   └──────────────┘   └────┬─────┘
//!                                                │
//!                     ┌──────────────┐           │
//!                     │   enrich     │◀──────────┤
//!                     │ LLM + reply  │──────────▶│
//!                     └──────────────┘           │
//!                      ┌─────────────────────────┤
//!                      ▼                         ▼
//!                 ┌──────────┐             ┌──────────┐
//!                 │   CLI    │             │   HTTP   │
//!                 └──────────┘             └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cryptosent init        # create database
//! cryptosent import      # archive manifest → articles
//! cryptosent fetch       # trending coins → articles
//! cryptosent analyze     # score unscored articles
//! cryptosent sentiment --token btc
//! cryptosent serve       # start HTTP API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema setup |
//! | [`models`] | Core data types |
//! | [`store`] | Article store |
//! | [`traits`] | Source, object store, and model seams |
//! | [`aws`] | SigV4 request signing |
//! | [`s3`] | S3 object store |
//! | [`extract`] | PDF / text extraction |
//! | [`archive`] | Archive importer |
//! | [`live_feed`] | CoinGecko live feed |
//! | [`ingest`] | Source → store persistence |
//! | [`llm`] | Bedrock and Ollama providers |
//! | [`reply`] | Model-reply parser |
//! | [`enrich`] | Sentiment enricher |
//! | [`query`] | Listing and aggregation |
//! | [`stats`] | Store statistics |
//! | [`server`] | HTTP API |

pub mod archive;
pub mod aws;
pub mod config;
pub mod db;
pub mod enrich;
pub mod extract;
pub mod ingest;
pub mod live_feed;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod query;
pub mod reply;
pub mod s3;
pub mod server;
pub mod stats;
pub mod store;
pub mod traits;
