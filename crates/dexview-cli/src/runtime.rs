// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use dexview_app::{CatalogSession, Intent, LoadStatus, ProjectedItem, ProjectedView, SessionEvent};
use std::fmt::Write as _;
use std::time::{Duration, Instant};
use tracing::info;

const PUMP_INTERVAL: Duration = Duration::from_millis(200);
/// Slack on top of the request timeout before a silent session counts as
/// stalled.
pub const STALL_GRACE: Duration = Duration::from_secs(5);

/// View filters requested on the command line for a headless dump.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DumpRequest {
    pub query: Option<String>,
    pub category: Option<String>,
    /// One-based page number.
    pub page: Option<usize>,
}

/// Loads the listing, waits for every detail, applies `request`, and
/// returns the resulting page as plain text.
///
/// Fails when no background result arrives for `stall_limit`.
pub fn dump(
    session: &mut CatalogSession,
    request: &DumpRequest,
    stall_limit: Duration,
) -> Result<String> {
    let mut events = session.start();
    let mut last_progress = Instant::now();
    loop {
        if !events.is_empty() {
            last_progress = Instant::now();
        }
        for event in events.drain(..) {
            match event {
                SessionEvent::ListingLoaded {
                    entries,
                    total_pages,
                } => info!(entries, total_pages, "listing loaded"),
                SessionEvent::HydrationFinished { unavailable } => {
                    info!(unavailable, "hydration finished");
                }
                _ => {}
            }
        }
        match session.status() {
            LoadStatus::Failed(message) => bail!("load catalog: {message}"),
            LoadStatus::Ready if session.progress().is_complete() => break,
            _ => {}
        }
        if last_progress.elapsed() >= stall_limit {
            let progress = session.progress();
            bail!(
                "catalog stalled: {}/{} details loaded, nothing new for {stall_limit:?}",
                progress.cached,
                progress.total
            );
        }
        events = session.pump_wait(PUMP_INTERVAL);
    }

    if let Some(query) = &request.query {
        session.dispatch(Intent::SearchChanged(query.clone()));
    }
    if let Some(category) = &request.category {
        session.dispatch(Intent::CategoryChanged(Some(category.clone())));
    }
    if let Some(page) = request.page {
        session.dispatch(Intent::PageChanged(page.saturating_sub(1)));
    }

    let page = session.view().current_page;
    Ok(render_page(&session.projection(), page))
}

fn render_page(view: &ProjectedView<'_>, page: usize) -> String {
    let mut out = String::new();
    if view.total_pages == 0 {
        out.push_str("no matches\n");
        return out;
    }
    let _ = writeln!(
        out,
        "page {} / {} ({} matches)",
        page + 1,
        view.total_pages,
        view.match_count
    );
    for item in &view.page_items {
        out.push_str(&render_row(item));
        out.push('\n');
    }
    out
}

fn render_row(item: &ProjectedItem<'_>) -> String {
    match item.detail {
        Some(detail) if detail.is_unavailable() => format!(
            "{:>6}  {:<24} {:<12} details not available",
            "-", item.entry.name, detail.category_name
        ),
        Some(detail) => format!(
            "{:>6}  {:<24} {:<12} {}",
            format!("#{}", detail.id.get()),
            item.entry.name,
            detail.category_name,
            detail.sprite
        ),
        None => format!("{:>6}  {:<24} {:<12} loading", "-", item.entry.name, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::{DumpRequest, dump};
    use anyhow::Result;
    use dexview_app::{CatalogSession, SessionOptions};
    use dexview_testkit::{ScriptedSource, entry_name};
    use std::sync::Arc;
    use std::time::Duration;

    const STALL: Duration = Duration::from_secs(10);

    fn session(source: ScriptedSource) -> CatalogSession {
        CatalogSession::new(Arc::new(source), SessionOptions::default())
    }

    #[test]
    fn dump_prints_first_page_after_full_hydration() -> Result<()> {
        let mut session = session(ScriptedSource::with_entries(130));
        let text = dump(&mut session, &DumpRequest::default(), STALL)?;

        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("page 1 / 2 (130 matches)"));
        let first = lines.next().unwrap_or_default();
        assert!(first.contains("#1"), "got {first:?}");
        assert!(first.contains("bulbasaur"));
        assert!(first.contains("grass"));
        assert!(first.contains("https://sprites.test/1.png"));
        assert_eq!(text.lines().count(), 101);
        Ok(())
    }

    #[test]
    fn dump_applies_query_category_and_page() -> Result<()> {
        let mut session = session(ScriptedSource::with_entries(130));
        let text = dump(
            &mut session,
            &DumpRequest {
                page: Some(2),
                ..DumpRequest::default()
            },
            STALL,
        )?;
        assert!(text.starts_with("page 2 / 2 (130 matches)"));
        assert_eq!(text.lines().count(), 31);

        let mut filtered = self::session(ScriptedSource::with_entries(130));
        let text = dump(
            &mut filtered,
            &DumpRequest {
                query: Some("saur".to_owned()),
                category: Some("grass".to_owned()),
                page: None,
            },
            STALL,
        )?;
        assert!(text.lines().skip(1).all(|line| line.contains("saur") && line.contains("grass")));
        assert!(text.contains(&entry_name(0)));
        Ok(())
    }

    #[test]
    fn dump_marks_unavailable_details() -> Result<()> {
        let broken = entry_name(2);
        let mut session = session(ScriptedSource::with_entries(5).fail_detail(&broken));
        let text = dump(&mut session, &DumpRequest::default(), STALL)?;
        let line = text
            .lines()
            .find(|line| line.contains(&broken))
            .unwrap_or_default();
        assert!(line.contains("Unknown"));
        assert!(line.contains("details not available"));
        Ok(())
    }

    #[test]
    fn dump_fails_when_listing_fails() {
        let mut session = session(ScriptedSource::failing_listing(502));
        let error = dump(&mut session, &DumpRequest::default(), STALL).expect_err("listing should fail");
        assert!(error.to_string().contains("load catalog"));
    }

    #[test]
    fn dump_reports_no_matches() -> Result<()> {
        let mut session = session(ScriptedSource::with_entries(10));
        let text = dump(
            &mut session,
            &DumpRequest {
                query: Some("zzz".to_owned()),
                ..DumpRequest::default()
            },
            STALL,
        )?;
        assert_eq!(text, "no matches\n");
        Ok(())
    }

    #[test]
    fn dump_gives_up_when_details_stop_arriving() {
        let slow = entry_name(1);
        let mut session = session(
            ScriptedSource::with_entries(3).delay_detail(&slow, Duration::from_secs(5)),
        );
        let error = dump(
            &mut session,
            &DumpRequest::default(),
            Duration::from_millis(300),
        )
        .expect_err("stalled hydration should fail");
        let message = error.to_string();
        assert!(message.contains("catalog stalled"), "got {message}");
        assert!(message.contains("2/3"), "got {message}");
    }
}
