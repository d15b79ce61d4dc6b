//! # Tributary
//!
//! A small service that keeps the latest weather, feed headlines and calendar
//! events for a dashboard and serves them over a polling API.
//!
//! ## Architecture
//!
//! ```text
//! Source ─┐
//! Source ─┼─► Manager ─► update stream ─► Coordinator ─► StateStore ─► /api/updates
//! Source ─┘
//! ```
//!
//! Every configured section becomes one [`Source`](fetcher::Source), polled on
//! its own interval by the [`Manager`](fetcher::Manager). Failures back off
//! exponentially and are published like successes, so the latest outcome of
//! every source is always visible.
//!
//! ## Quick Start
//!
//! ```bash
//! # Validate the configuration
//! tributary check
//!
//! # Fetch everything once
//! tributary fetch
//!
//! # Run the service
//! tributary serve
//! ```

/// Application context and error types.
///
/// The [`AppContext`](app::AppContext) struct turns configuration into
/// registered sources.
pub mod app;

/// Command-line interface using clap.
///
/// - `serve` - Run the pipeline and the HTTP API
/// - `check` - Validate the configuration
/// - `fetch [SECTION]` - Fetch once and print the results
pub mod cli;

/// Configuration loading and validation.
///
/// Loads from `~/.config/tributary/config.toml` with environment expansion.
pub mod config;

/// Signal handling and the serve lifecycle.
pub mod daemon;

/// Core domain models.
///
/// - [`FetchResult`](domain::FetchResult): Outcome of one fetch attempt
/// - [`Payload`](domain::Payload): Weather, feed or calendar data
pub mod domain;

/// Sources, backoff and the fetch scheduler.
///
/// - [`Source`](fetcher::Source): Async trait implemented by every upstream
/// - [`Manager`](fetcher::Manager): Per-source polling loops
/// - [`CalendarAggregator`](fetcher::CalendarAggregator): Merges calendars
pub mod fetcher;

/// Deterministic content digests and change detection.
pub mod hashing;

/// Feed parsing and text cleanup.
pub mod normalizer;

/// HTTP polling API built with axum.
pub mod server;

/// Latest result per source.
pub mod state;
