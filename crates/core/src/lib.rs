//! Core types for the agentic workflow compiler.
//!
//! This crate holds the pieces shared by the frontmatter parser and the
//! workflow emitters:
//!
//! - [`Error`] and [`Result`], the single error taxonomy of the compiler
//! - [`time_delta`] and [`stop_time`] for bounded durations and dates
//! - [`git`] and [`version`] for resolving the release the compiler runs from
//! - [`FileTracker`], the optional output ledger
//! - [`CompilerConfig`], host-level settings

pub mod config;
pub mod error;
pub mod git;
pub mod stop_time;
pub mod time_delta;
pub mod tracker;
pub mod version;

pub use config::CompilerConfig;
pub use error::{Error, Result};
pub use time_delta::{TimeDelta, TimeUnit, validate_time_delta};
pub use tracker::{FileTracker, MemoryFileTracker};
pub use version::VersionInfo;
