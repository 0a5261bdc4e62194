//! RDA Server Library
//!
//! Replicated claim-change feed for FISS and MCS claims.
//!
//! # Overview
//!
//! - **Record Sources**: pull-style, resumable iterators over sequenced
//!   change records ([`source::RecordSource`])
//! - **Synthetic Data**: deterministic FISS and MCS claim generators
//!   ([`random`])
//! - **Flat Files**: NDJSON sources over local files or cached objects
//! - **Object Storage**: segment catalog ([`catalog`]) backed by an ETag keyed
//!   local cache ([`cache`]) over S3 ([`storage`])
//! - **Streaming**: a flow-controlled responder pushing records to a call
//!   ([`server`])
//! - **Batch Loading**: bounded jobs draining a feed into a sink ([`job`])
//!
//! # Example
//!
//! ```no_run
//! use rda_server::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let feeds = config.feeds().await?;
//!     let service = config.service(&feeds);
//!     let changes = service.get_fiss_claims(0).await?.collect().await?;
//!     println!("{} FISS changes", changes.len());
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod job;
pub mod model;
pub mod random;
pub mod server;
pub mod source;
pub mod storage;

// Re-export commonly used types
pub use cli::{Cli, Commands};
pub use rda_common::{RdaError, Result};
