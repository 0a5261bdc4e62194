//! RDA Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling and logging for the RDA claim feed workspace.
//!
//! - **Error Handling**: the [`RdaError`] taxonomy and [`Result`] alias used by
//!   every record source, sink and storage component
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//!
//! # Example
//!
//! ```no_run
//! use rda_common::{RdaError, Result};
//!
//! fn next_position(current: i64) -> Result<i64> {
//!     current
//!         .checked_add(1)
//!         .ok_or_else(|| RdaError::Parse("sequence number overflow".to_string()))
//! }
//! ```

pub mod error;
pub mod logging;

pub use error::{RdaError, Result};
