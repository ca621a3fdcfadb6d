// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use dexview_app::{
    CatalogSession, CatalogSource, DetailRecord, FetchError, Listing, ListingEntry, LoadStatus,
    SessionEvent,
};
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tiny_http::{Header, Response, Server};

const CATEGORIES: [&str; 8] = [
    "grass", "fire", "water", "bug", "normal", "poison", "electric", "ground",
];

const NAMES: [&str; 24] = [
    "bulbasaur",
    "ivysaur",
    "venusaur",
    "charmander",
    "charmeleon",
    "charizard",
    "squirtle",
    "wartortle",
    "blastoise",
    "caterpie",
    "metapod",
    "butterfree",
    "weedle",
    "kakuna",
    "beedrill",
    "pidgey",
    "pidgeotto",
    "pidgeot",
    "rattata",
    "raticate",
    "spearow",
    "fearow",
    "ekans",
    "arbok",
];

pub const FIXTURE_BASE_URL: &str = "http://catalog.test/api/entity";

/// Deterministic name for the entry at `index`; unique across any count.
pub fn entry_name(index: usize) -> String {
    let base = NAMES[index % NAMES.len()];
    match index / NAMES.len() {
        0 => base.to_owned(),
        round => format!("{base}-{round}"),
    }
}

pub fn category_for(index: usize) -> &'static str {
    CATEGORIES[index % CATEGORIES.len()]
}

pub fn sample_entries(count: usize) -> Vec<ListingEntry> {
    (0..count)
        .map(|index| {
            ListingEntry::new(
                entry_name(index),
                format!("{FIXTURE_BASE_URL}/{}/", index + 1),
            )
        })
        .collect()
}

pub fn sample_listing(count: usize) -> Listing {
    Listing {
        entries: sample_entries(count),
        total_count: count,
    }
}

pub fn sample_detail(index: usize) -> DetailRecord {
    DetailRecord::new(
        index as i64 + 1,
        format!("https://sprites.test/{}.png", index + 1),
        category_for(index),
    )
}

/// Listing endpoint payload for `entries`, as the remote API shapes it.
pub fn listing_json(entries: &[ListingEntry]) -> String {
    json!({
        "count": entries.len(),
        "next": null,
        "previous": null,
        "results": entries
            .iter()
            .map(|entry| json!({ "name": entry.name, "url": entry.url }))
            .collect::<Vec<_>>(),
    })
    .to_string()
}

/// Detail endpoint payload with the category at its shallow position.
pub fn detail_json(id: i64, sprite: &str, category: &str) -> String {
    json!({
        "id": id,
        "name": format!("entity-{id}"),
        "sprites": { "default": sprite },
        "category": { "name": category },
    })
    .to_string()
}

/// Detail endpoint payload with the category wrapped one level deeper.
pub fn wrapped_detail_json(id: i64, sprite: &str, category: &str) -> String {
    json!({
        "id": id,
        "sprites": { "default": sprite },
        "category": { "slot": 1, "category": { "name": category } },
    })
    .to_string()
}

/// In-memory catalog with scripted failures and a request log.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    listing: Option<Listing>,
    listing_error: Option<FetchError>,
    listing_delay: Option<Duration>,
    failing_details: HashSet<String>,
    panicking_details: HashSet<String>,
    detail_delays: HashMap<String, Duration>,
    details: HashMap<String, DetailRecord>,
    calls: Mutex<Calls>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Calls {
    pub listing: usize,
    pub details: Vec<String>,
}

impl ScriptedSource {
    /// Source serving `count` sample entries whose details all succeed.
    pub fn with_entries(count: usize) -> Self {
        let listing = sample_listing(count);
        let details = listing
            .entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (entry.name.clone(), sample_detail(index)))
            .collect();
        Self {
            listing: Some(listing),
            details,
            ..Self::default()
        }
    }

    pub fn failing_listing(status: u16) -> Self {
        Self {
            listing_error: Some(FetchError::Status {
                url: FIXTURE_BASE_URL.to_owned(),
                status,
                message: "scripted failure".to_owned(),
            }),
            ..Self::default()
        }
    }

    pub fn fail_detail(mut self, name: &str) -> Self {
        self.failing_details.insert(name.to_owned());
        self
    }

    /// Makes the detail fetch for `name` panic instead of returning.
    pub fn panic_detail(mut self, name: &str) -> Self {
        self.panicking_details.insert(name.to_owned());
        self
    }

    /// Holds the detail fetch for `name` for `delay` before answering.
    pub fn delay_detail(mut self, name: &str, delay: Duration) -> Self {
        self.detail_delays.insert(name.to_owned(), delay);
        self
    }

    pub fn with_detail(mut self, name: &str, record: DetailRecord) -> Self {
        self.details.insert(name.to_owned(), record);
        self
    }

    pub fn delay_listing(mut self, delay: Duration) -> Self {
        self.listing_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Calls {
        self.lock_calls().clone()
    }

    fn lock_calls(&self) -> MutexGuard<'_, Calls> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl CatalogSource for ScriptedSource {
    fn fetch_listing(&self) -> Result<Listing, FetchError> {
        self.lock_calls().listing += 1;
        if let Some(delay) = self.listing_delay {
            thread::sleep(delay);
        }
        if let Some(error) = &self.listing_error {
            return Err(error.clone());
        }
        Ok(self.listing.clone().unwrap_or_default())
    }

    fn fetch_detail(&self, entry: &ListingEntry) -> Result<DetailRecord, FetchError> {
        self.lock_calls().details.push(entry.name.clone());
        if let Some(delay) = self.detail_delays.get(&entry.name) {
            thread::sleep(*delay);
        }
        if self.panicking_details.contains(&entry.name) {
            panic!("scripted panic fetching {}", entry.name);
        }
        if self.failing_details.contains(&entry.name) {
            return Err(FetchError::Status {
                url: entry.url.clone(),
                status: 404,
                message: "scripted failure".to_owned(),
            });
        }
        self.details
            .get(&entry.name)
            .cloned()
            .ok_or_else(|| FetchError::Decode {
                url: entry.url.clone(),
                message: "no scripted detail".to_owned(),
            })
    }
}

/// Pumps `session` until the listing has failed or every entry is cached.
pub fn settle(session: &mut CatalogSession, timeout: Duration) -> Result<Vec<SessionEvent>> {
    let deadline = Instant::now() + timeout;
    let mut events = session.pump();
    loop {
        match session.status() {
            LoadStatus::Failed(_) => return Ok(events),
            LoadStatus::Ready if session.progress().is_complete() => return Ok(events),
            _ => {}
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(anyhow!(
                "session did not settle within {timeout:?}: {:?}",
                session.progress()
            ));
        }
        events.extend(session.pump_wait(remaining.min(Duration::from_millis(50))));
    }
}

/// A scripted HTTP response for [`MockCatalog`].
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
}

impl MockResponse {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Local HTTP server answering requests by path.
///
/// Unknown paths get a 404. The server stops after `max_requests` requests
/// and [`MockCatalog::finish`] returns every URL it saw.
pub struct MockCatalog {
    base_url: String,
    handle: JoinHandle<Vec<String>>,
}

impl MockCatalog {
    pub fn start(routes: Vec<(String, MockResponse)>, max_requests: usize) -> Result<Self> {
        Self::start_with(max_requests, |_| routes)
    }

    /// Like [`MockCatalog::start`], with routes built from the bound base URL
    /// so payloads can link back to the server.
    pub fn start_with<F>(max_requests: usize, build_routes: F) -> Result<Self>
    where
        F: FnOnce(&str) -> Vec<(String, MockResponse)>,
    {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());
        let routes = build_routes(&base_url)
            .into_iter()
            .collect::<HashMap<_, _>>();

        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for _ in 0..max_requests {
                let Ok(Some(request)) = server.recv_timeout(Duration::from_secs(5)) else {
                    break;
                };
                let url = request.url().to_owned();
                let path = url.split('?').next().unwrap_or_default().to_owned();
                let response = match routes.get(&path) {
                    Some(scripted) => Response::from_string(scripted.body.clone())
                        .with_status_code(scripted.status),
                    None => Response::from_string("not found").with_status_code(404),
                }
                .with_header(
                    Header::from_bytes("Content-Type", "application/json")
                        .expect("valid content type header"),
                );
                seen.push(url);
                let _ = request.respond(response);
            }
            seen
        });

        Ok(Self { base_url, handle })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub fn finish(self) -> Result<Vec<String>> {
        self.handle
            .join()
            .map_err(|_| anyhow!("mock server thread panicked"))
    }
}
