// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Background fetch workers.
//!
//! Workers only perform requests and report results over a channel. All
//! state changes happen on the thread that owns the session when it drains
//! that channel.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::Sender;
use std::thread;

use tracing::debug;

use crate::error::FetchError;
use crate::model::{DetailRecord, Listing, ListingEntry};
use crate::source::CatalogSource;

#[derive(Debug)]
pub(crate) enum WorkerMessage {
    ListingLoaded(Listing),
    ListingFailed(FetchError),
    DetailFetched {
        name: String,
        result: Result<DetailRecord, FetchError>,
    },
}

/// Shared flag that tells workers whether anyone still consumes their
/// results.
#[derive(Debug, Clone)]
pub(crate) struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub(crate) fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub(crate) fn is_live(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn kill(&self) {
        self.0.store(false, Ordering::Release);
    }
}

pub(crate) fn spawn_listing_load(
    source: Arc<dyn CatalogSource>,
    tx: Sender<WorkerMessage>,
    live: Liveness,
) -> io::Result<()> {
    thread::Builder::new()
        .name("dexview-listing".to_owned())
        .spawn(move || {
            let message = match guarded("catalog listing", || source.fetch_listing()) {
                Ok(listing) => WorkerMessage::ListingLoaded(listing),
                Err(error) => WorkerMessage::ListingFailed(error),
            };
            if live.is_live() {
                let _ = tx.send(message);
            }
        })?;
    Ok(())
}

/// Fetches details for `batch` on up to `workers` threads.
///
/// Threads claim entries through a shared cursor, so requests start in
/// listing order while completing in any order. Returns the number of
/// threads started.
pub(crate) fn spawn_hydration(
    source: Arc<dyn CatalogSource>,
    batch: Vec<ListingEntry>,
    workers: usize,
    tx: Sender<WorkerMessage>,
    live: Liveness,
) -> io::Result<usize> {
    if batch.is_empty() {
        return Ok(0);
    }

    let batch: Arc<[ListingEntry]> = batch.into();
    let cursor = Arc::new(AtomicUsize::new(0));
    let count = workers.clamp(1, batch.len());

    for worker in 0..count {
        let source = Arc::clone(&source);
        let batch = Arc::clone(&batch);
        let cursor = Arc::clone(&cursor);
        let tx = tx.clone();
        let live = live.clone();
        let spawned = thread::Builder::new()
            .name(format!("dexview-hydrate-{worker}"))
            .spawn(move || hydrate_worker(&*source, &batch, &cursor, &tx, &live));
        if let Err(error) = spawned {
            if worker == 0 {
                return Err(error);
            }
            debug!(started = worker, %error, "hydration pool smaller than requested");
            return Ok(worker);
        }
    }
    Ok(count)
}

fn hydrate_worker(
    source: &dyn CatalogSource,
    batch: &[ListingEntry],
    cursor: &AtomicUsize,
    tx: &Sender<WorkerMessage>,
    live: &Liveness,
) {
    while live.is_live() {
        let index = cursor.fetch_add(1, Ordering::Relaxed);
        let Some(entry) = batch.get(index) else {
            return;
        };

        let result = guarded(&entry.url, || source.fetch_detail(entry));
        if !live.is_live() {
            return;
        }
        let message = WorkerMessage::DetailFetched {
            name: entry.name.clone(),
            result,
        };
        if tx.send(message).is_err() {
            return;
        }
    }
}

/// Runs one source call, turning a panic into [`FetchError::Aborted`] so
/// every claimed entry still reports back.
fn guarded<T>(
    url: &str,
    fetch: impl FnOnce() -> Result<T, FetchError>,
) -> Result<T, FetchError> {
    match panic::catch_unwind(AssertUnwindSafe(fetch)) {
        Ok(result) => result,
        Err(payload) => Err(FetchError::Aborted {
            url: url.to_owned(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "source panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::{Liveness, WorkerMessage, spawn_hydration};
    use crate::error::FetchError;
    use crate::model::{DetailRecord, Listing, ListingEntry};
    use crate::source::CatalogSource;
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::sync::mpsc;
    use std::time::Duration;

    struct EchoSource;

    impl CatalogSource for EchoSource {
        fn fetch_listing(&self) -> Result<Listing, FetchError> {
            Ok(Listing::default())
        }

        fn fetch_detail(&self, entry: &ListingEntry) -> Result<DetailRecord, FetchError> {
            if entry.name == "explodes" {
                panic!("echo source cannot fetch {}", entry.name);
            }
            if entry.name == "broken" {
                return Err(FetchError::Status {
                    url: entry.url.clone(),
                    status: 500,
                    message: "boom".to_owned(),
                });
            }
            Ok(DetailRecord::new(entry.name.len() as i64, "", "echo"))
        }
    }

    #[test]
    fn every_entry_is_reported_once_despite_failures() {
        let batch = ["a", "broken", "ccc", "dd"]
            .iter()
            .map(|name| ListingEntry::new(*name, format!("u/{name}")))
            .collect::<Vec<_>>();
        let (tx, rx) = mpsc::channel();

        let started = spawn_hydration(Arc::new(EchoSource), batch, 3, tx, Liveness::new())
            .expect("workers should start");
        assert_eq!(started, 3);

        let mut seen = BTreeSet::new();
        let mut failures = 0;
        while let Ok(message) = rx.recv_timeout(Duration::from_secs(5)) {
            match message {
                WorkerMessage::DetailFetched { name, result } => {
                    failures += usize::from(result.is_err());
                    assert!(seen.insert(name), "entry reported twice");
                }
                other => panic!("unexpected message {other:?}"),
            }
        }

        assert_eq!(seen.len(), 4);
        assert_eq!(failures, 1);
    }

    #[test]
    fn panicking_source_reports_aborted_and_worker_continues() {
        let batch = ["explodes", "a", "bb"]
            .iter()
            .map(|name| ListingEntry::new(*name, format!("u/{name}")))
            .collect::<Vec<_>>();
        let (tx, rx) = mpsc::channel();

        spawn_hydration(Arc::new(EchoSource), batch, 1, tx, Liveness::new())
            .expect("workers should start");

        let mut reported = Vec::new();
        while let Ok(message) = rx.recv_timeout(Duration::from_secs(5)) {
            let WorkerMessage::DetailFetched { name, result } = message else {
                panic!("unexpected listing message");
            };
            if name == "explodes" {
                let error = result.expect_err("panic should surface as an error");
                assert!(matches!(error, FetchError::Aborted { .. }), "got {error:?}");
                assert!(error.to_string().contains("cannot fetch explodes"));
            }
            reported.push(name);
        }
        assert_eq!(reported, vec!["explodes", "a", "bb"]);
    }

    #[test]
    fn dead_liveness_stops_workers_before_fetching() {
        let batch = vec![ListingEntry::new("a", "u/a")];
        let (tx, rx) = mpsc::channel();
        let live = Liveness::new();
        live.kill();

        spawn_hydration(Arc::new(EchoSource), batch, 1, tx, live).expect("workers should start");
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_err());
    }

    #[test]
    fn empty_batch_starts_no_threads() {
        let (tx, _rx) = mpsc::channel();
        let started = spawn_hydration(Arc::new(EchoSource), Vec::new(), 8, tx, Liveness::new())
            .expect("empty batch is fine");
        assert_eq!(started, 0);
    }
}
