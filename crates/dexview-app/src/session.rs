// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::cache::DetailCache;
use crate::error::FetchError;
use crate::hydrate::{Liveness, WorkerMessage, spawn_hydration, spawn_listing_load};
use crate::model::{DetailRecord, HydrationProgress, Listing, ListingEntry, LoadStatus};
use crate::projector::{ProjectedView, project};
use crate::source::CatalogSource;
use crate::state::{NavCommand, NavEvent, ViewState};

pub const DEFAULT_HYDRATION_WORKERS: usize = 8;
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub hydration_workers: usize,
    /// Events a subscriber may leave undrained before it is disconnected.
    pub subscriber_buffer: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            hydration_workers: DEFAULT_HYDRATION_WORKERS,
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
        }
    }
}

/// User intents raised by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    SearchChanged(String),
    CategoryChanged(Option<String>),
    PageChanged(usize),
    NextPage,
    PrevPage,
    Select(usize),
    Retry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoadStarted,
    ListingLoaded { entries: usize, total_pages: usize },
    LoadFailed(String),
    DetailHydrated { name: String, unavailable: bool },
    HydrationFinished { unavailable: usize },
    Navigation(NavEvent),
    ItemSelected {
        entry: ListingEntry,
        detail: Option<DetailRecord>,
    },
}

/// Owned state of one catalog view.
///
/// Network requests run on background threads; their results are applied
/// only when the owner calls [`CatalogSession::pump`], so every mutation
/// happens on the owner's thread.
pub struct CatalogSession {
    source: Arc<dyn CatalogSource>,
    options: SessionOptions,
    status: LoadStatus,
    listing: Listing,
    cache: DetailCache,
    view: ViewState,
    in_flight: HashSet<String>,
    finished_reported: bool,
    tx: Sender<WorkerMessage>,
    rx: Receiver<WorkerMessage>,
    live: Liveness,
    subscribers: Vec<SyncSender<SessionEvent>>,
}

impl CatalogSession {
    pub fn new(source: Arc<dyn CatalogSource>, options: SessionOptions) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            source,
            options,
            status: LoadStatus::Loading,
            listing: Listing::default(),
            cache: DetailCache::new(),
            view: ViewState::default(),
            in_flight: HashSet::new(),
            finished_reported: false,
            tx,
            rx,
            live: Liveness::new(),
            subscribers: Vec::new(),
        }
    }

    pub const fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn entries(&self) -> &[ListingEntry] {
        &self.listing.entries
    }

    pub const fn cache(&self) -> &DetailCache {
        &self.cache
    }

    pub const fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn is_disposed(&self) -> bool {
        !self.live.is_live()
    }

    pub fn progress(&self) -> HydrationProgress {
        HydrationProgress {
            cached: self
                .listing
                .entries
                .iter()
                .filter(|entry| self.cache.contains(&entry.name))
                .count(),
            total: self.listing.entries.len(),
            unavailable: self.cache.unavailable_count(),
        }
    }

    pub fn categories(&self) -> Vec<String> {
        self.cache.categories()
    }

    /// Current page of the filtered listing. Empty until the listing loads.
    pub fn projection(&self) -> ProjectedView<'_> {
        if !self.status.is_ready() {
            return ProjectedView::default();
        }
        project(&self.listing.entries, &self.cache, self.view.query())
    }

    /// Receiver of every event the session emits from now on.
    ///
    /// The channel holds `subscriber_buffer` events. A subscriber that falls
    /// that far behind is disconnected rather than buffered without bound.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::sync_channel(self.options.subscriber_buffer.max(1));
        self.subscribers.push(tx);
        rx
    }

    /// Starts the bulk listing request in the background.
    pub fn start(&mut self) -> Vec<SessionEvent> {
        if self.is_disposed() {
            return Vec::new();
        }
        self.status = LoadStatus::Loading;
        info!("loading catalog listing");
        let events = match spawn_listing_load(
            Arc::clone(&self.source),
            self.tx.clone(),
            self.live.clone(),
        ) {
            Ok(()) => vec![SessionEvent::LoadStarted],
            Err(spawn_error) => {
                let message = format!("start listing request: {spawn_error}");
                error!(%message, "listing load could not start");
                self.status = LoadStatus::Failed(message.clone());
                vec![SessionEvent::LoadFailed(message)]
            }
        };
        self.publish(events)
    }

    /// Applies every background result that has arrived so far.
    pub fn pump(&mut self) -> Vec<SessionEvent> {
        let messages = self.rx.try_iter().collect::<Vec<_>>();
        self.apply_messages(messages)
    }

    /// Waits up to `timeout` for at least one background result, then
    /// applies everything that has arrived.
    pub fn pump_wait(&mut self, timeout: Duration) -> Vec<SessionEvent> {
        let first = match self.rx.recv_timeout(timeout) {
            Ok(message) => message,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return Vec::new(),
        };
        let mut messages = vec![first];
        messages.extend(self.rx.try_iter());
        self.apply_messages(messages)
    }

    pub fn dispatch(&mut self, intent: Intent) -> Vec<SessionEvent> {
        if self.is_disposed() {
            return Vec::new();
        }

        let events = match intent {
            Intent::SearchChanged(query) => self.navigate(NavCommand::SetSearch(query)),
            Intent::CategoryChanged(category) => self.navigate(NavCommand::SetCategory(category)),
            Intent::PageChanged(page) => self.navigate(NavCommand::SetPage(page)),
            Intent::NextPage => {
                let next = self.view.current_page.saturating_add(1);
                if next < self.projection().total_pages {
                    self.navigate(NavCommand::SetPage(next))
                } else {
                    Vec::new()
                }
            }
            Intent::PrevPage => match self.view.current_page.checked_sub(1) {
                Some(previous) => self.navigate(NavCommand::SetPage(previous)),
                None => Vec::new(),
            },
            Intent::Select(index) => self.select(index),
            Intent::Retry => {
                if matches!(self.status, LoadStatus::Failed(_)) {
                    return self.start();
                }
                Vec::new()
            }
        };
        self.publish(events)
    }

    /// Fetches details for every listed entry that has neither a cached
    /// record nor a request in flight.
    pub fn hydrate(&mut self) -> Vec<SessionEvent> {
        let events = self.hydrate_missing();
        self.publish(events)
    }

    fn hydrate_missing(&mut self) -> Vec<SessionEvent> {
        if self.is_disposed() || !self.status.is_ready() {
            return Vec::new();
        }

        let batch = self
            .cache
            .missing(&self.listing.entries)
            .filter(|entry| !self.in_flight.contains(&entry.name))
            .cloned()
            .collect::<Vec<_>>();
        if batch.is_empty() {
            return self.finish_if_complete();
        }

        let names = batch
            .iter()
            .map(|entry| entry.name.clone())
            .collect::<Vec<_>>();
        match spawn_hydration(
            Arc::clone(&self.source),
            batch,
            self.options.hydration_workers,
            self.tx.clone(),
            self.live.clone(),
        ) {
            Ok(workers) => {
                debug!(pending = names.len(), workers, "hydration started");
                self.in_flight.extend(names);
            }
            Err(spawn_error) => {
                error!(
                    %spawn_error,
                    pending = names.len(),
                    "hydration workers could not start; showing placeholders"
                );
                let mut events = names
                    .into_iter()
                    .filter(|name| self.cache.insert_if_absent(name, DetailRecord::unavailable()))
                    .map(|name| SessionEvent::DetailHydrated {
                        name,
                        unavailable: true,
                    })
                    .collect::<Vec<_>>();
                events.extend(self.finish_if_complete());
                return events;
            }
        }
        Vec::new()
    }

    /// Stops all further state changes. Results that arrive afterwards are
    /// discarded and workers stop claiming entries.
    pub fn dispose(&mut self) {
        if self.is_disposed() {
            return;
        }
        self.live.kill();
        self.subscribers.clear();
        debug!(in_flight = self.in_flight.len(), "catalog session disposed");
    }

    fn navigate(&mut self, command: NavCommand) -> Vec<SessionEvent> {
        self.view
            .dispatch(command)
            .into_iter()
            .map(SessionEvent::Navigation)
            .collect()
    }

    fn select(&self, index: usize) -> Vec<SessionEvent> {
        let view = self.projection();
        match view.page_items.get(index) {
            Some(item) => vec![SessionEvent::ItemSelected {
                entry: item.entry.clone(),
                detail: item.detail.cloned(),
            }],
            None => Vec::new(),
        }
    }

    fn apply_messages(&mut self, messages: Vec<WorkerMessage>) -> Vec<SessionEvent> {
        if self.is_disposed() {
            return Vec::new();
        }

        let mut events = Vec::new();
        for message in messages {
            match message {
                WorkerMessage::ListingLoaded(listing) => {
                    events.extend(self.listing_loaded(listing));
                }
                WorkerMessage::ListingFailed(fetch_error) => {
                    error!(%fetch_error, "catalog listing failed");
                    self.status = LoadStatus::Failed(fetch_error.to_string());
                    events.push(SessionEvent::LoadFailed(fetch_error.to_string()));
                }
                WorkerMessage::DetailFetched { name, result } => {
                    events.extend(self.detail_fetched(name, result));
                }
            }
        }
        events.extend(self.finish_if_complete());
        self.publish(events)
    }

    fn listing_loaded(&mut self, listing: Listing) -> Vec<SessionEvent> {
        if self.status != LoadStatus::Loading {
            warn!("ignoring listing that arrived outside of a load");
            return Vec::new();
        }

        info!(
            entries = listing.entries.len(),
            total_count = listing.total_count,
            "catalog listing loaded"
        );
        let loaded = SessionEvent::ListingLoaded {
            entries: listing.entries.len(),
            total_pages: listing.total_pages(),
        };
        self.listing = listing;
        self.status = LoadStatus::Ready;
        self.finished_reported = false;

        let mut events = vec![loaded];
        events.extend(self.hydrate_missing());
        events
    }

    fn detail_fetched(
        &mut self,
        name: String,
        result: Result<DetailRecord, FetchError>,
    ) -> Vec<SessionEvent> {
        self.in_flight.remove(&name);
        let record = match result {
            Ok(record) => record,
            Err(fetch_error) => {
                warn!(entry = %name, %fetch_error, "detail fetch failed; showing placeholder");
                DetailRecord::unavailable()
            }
        };
        let unavailable = record.is_unavailable();
        if !self.cache.insert_if_absent(&name, record) {
            return Vec::new();
        }
        vec![SessionEvent::DetailHydrated { name, unavailable }]
    }

    fn finish_if_complete(&mut self) -> Vec<SessionEvent> {
        if self.finished_reported || !self.status.is_ready() || !self.in_flight.is_empty() {
            return Vec::new();
        }
        let progress = self.progress();
        if !progress.is_complete() {
            return Vec::new();
        }
        self.finished_reported = true;
        info!(
            total = progress.total,
            unavailable = progress.unavailable,
            "catalog hydration finished"
        );
        vec![SessionEvent::HydrationFinished {
            unavailable: progress.unavailable,
        }]
    }

    fn publish(&mut self, events: Vec<SessionEvent>) -> Vec<SessionEvent> {
        if !events.is_empty() {
            self.subscribers.retain(|subscriber| {
                events.iter().all(|event| match subscriber.try_send(event.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        warn!("session subscriber fell behind; disconnecting it");
                        false
                    }
                    Err(TrySendError::Disconnected(_)) => false,
                })
            });
        }
        events
    }
}

impl Drop for CatalogSession {
    fn drop(&mut self) {
        self.dispose();
    }
}
