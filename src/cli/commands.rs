use chrono::Utc;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::app::{AppContext, Result, TributaryError};
use crate::config::format_interval;
use crate::daemon;
use crate::domain::FetchResult;

pub async fn serve(ctx: AppContext) -> Result<()> {
    daemon::run(ctx).await
}

pub fn check(ctx: &AppContext) -> Result<()> {
    let registrations = ctx.registrations()?;

    println!(
        "Configuration OK: {} sections, {} sources, listening on {}",
        ctx.config.sections.len(),
        registrations.len(),
        ctx.config.server.bind_addr()
    );

    for r in &registrations {
        println!(
            "  {} every {} (backoff {}..{})",
            r.source.name(),
            format_interval(r.interval),
            format_interval(r.initial_backoff),
            format_interval(r.max_backoff)
        );
    }

    let skipped = ctx.config.sections.len() - registrations.len();
    if skipped > 0 {
        println!("  {} section(s) skipped, run with RUST_LOG=warn for details", skipped);
    }

    Ok(())
}

/// Fetch every source (or just `section`) once and print the results as JSON.
pub async fn fetch(ctx: &AppContext, section: Option<&str>) -> Result<()> {
    let registrations: Vec<_> = ctx
        .registrations()?
        .into_iter()
        .filter(|r| section.is_none_or(|s| r.source.name() == s))
        .collect();

    if let Some(section) = section {
        if registrations.is_empty() {
            return Err(TributaryError::Other(format!("No such section: {}", section)));
        }
    }

    let cancel = CancellationToken::new();
    let outcomes = join_all(registrations.iter().map(|r| r.source.fetch(&cancel))).await;

    let results: Vec<FetchResult> = registrations
        .iter()
        .zip(outcomes)
        .map(|(r, outcome)| FetchResult::from_outcome(r.source.name(), outcome, Utc::now()))
        .collect();

    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
