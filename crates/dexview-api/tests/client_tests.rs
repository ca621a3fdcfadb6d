// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use dexview_api::Client;
use dexview_app::{
    CatalogSession, FetchError, ListingEntry, LoadStatus, SessionOptions, UNKNOWN_CATEGORY,
};
use dexview_testkit::{
    MockCatalog, MockResponse, detail_json, listing_json, settle, wrapped_detail_json,
};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn unreachable_listing_is_a_transport_error() {
    let client = Client::new("http://127.0.0.1:1/api/entity", 10, Duration::from_millis(200))
        .expect("client should initialize");

    let error = client.list().expect_err("listing should fail");
    assert!(matches!(error, FetchError::Transport { .. }), "got {error:?}");
    assert!(error.to_string().contains("cannot reach"));
}

#[test]
fn listing_request_sends_offset_and_limit() -> Result<()> {
    let entries = vec![
        ListingEntry::new("bulbasaur", "http://example/1/"),
        ListingEntry::new("ivysaur", "http://example/2/"),
    ];
    let server = MockCatalog::start(
        vec![("/api/entity".to_owned(), MockResponse::json(listing_json(&entries)))],
        1,
    )?;

    let client = Client::new(&server.url("/api/entity"), 1500, Duration::from_secs(2))?;
    let listing = client.list()?;
    assert_eq!(listing.total_count, 2);
    assert_eq!(listing.entries, entries);
    assert_eq!(listing.total_pages(), 1);

    let seen = server.finish()?;
    assert_eq!(seen, vec!["/api/entity?offset=0&limit=1500".to_owned()]);
    Ok(())
}

#[test]
fn listing_non_success_status_carries_server_message() -> Result<()> {
    let server = MockCatalog::start(
        vec![(
            "/api/entity".to_owned(),
            MockResponse::status(503, r#"{"detail":"catalog is rebuilding"}"#),
        )],
        1,
    )?;

    let client = Client::new(&server.url("/api/entity"), 10, Duration::from_secs(2))?;
    let error = client.list().expect_err("listing should fail");
    assert_eq!(error.status(), Some(503));
    assert!(error.to_string().contains("catalog is rebuilding"));
    server.finish()?;
    Ok(())
}

#[test]
fn malformed_listing_is_a_decode_error() -> Result<()> {
    let server = MockCatalog::start(
        vec![("/api/entity".to_owned(), MockResponse::json(r#"{"results":"nope"}"#))],
        1,
    )?;

    let client = Client::new(&server.url("/api/entity"), 10, Duration::from_secs(2))?;
    let error = client.list().expect_err("listing should fail");
    assert!(matches!(error, FetchError::Decode { .. }), "got {error:?}");
    server.finish()?;
    Ok(())
}

#[test]
fn details_normalize_both_category_shapes() -> Result<()> {
    let server = MockCatalog::start(
        vec![
            (
                "/api/entity/1/".to_owned(),
                MockResponse::json(detail_json(1, "https://img/1.png", "grass")),
            ),
            (
                "/api/entity/4/".to_owned(),
                MockResponse::json(wrapped_detail_json(4, "https://img/4.png", "fire")),
            ),
        ],
        2,
    )?;
    let client = Client::new(&server.url("/api/entity"), 10, Duration::from_secs(2))?;

    let first = client.detail(&ListingEntry::new("bulbasaur", server.url("/api/entity/1/")))?;
    assert_eq!(first.id.get(), 1);
    assert_eq!(first.sprite, "https://img/1.png");
    assert_eq!(first.category_name, "grass");

    let second = client.detail(&ListingEntry::new("charmander", server.url("/api/entity/4/")))?;
    assert_eq!(second.category_name, "fire");
    server.finish()?;
    Ok(())
}

#[test]
fn detail_with_invalid_url_fails_without_request() -> Result<()> {
    let client = Client::new("http://127.0.0.1:1/api/entity", 10, Duration::from_millis(200))?;
    let error = client
        .detail(&ListingEntry::new("broken", "not a url"))
        .expect_err("invalid url should fail");
    assert!(matches!(error, FetchError::InvalidUrl { .. }), "got {error:?}");
    Ok(())
}

#[test]
fn session_over_http_isolates_a_failed_detail() -> Result<()> {
    let names = ["bulbasaur", "ivysaur", "venusaur", "charmander"];
    // Detail urls point back at the server, so routes are built once it is bound.
    let server = MockCatalog::start_with(5, |base_url| {
        let entries = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                ListingEntry::new(*name, format!("{base_url}/api/entity/{}/", index + 1))
            })
            .collect::<Vec<_>>();
        let mut routes = vec![(
            "/api/entity".to_owned(),
            MockResponse::json(listing_json(&entries)),
        )];
        for index in [1_i64, 2, 4] {
            routes.push((
                format!("/api/entity/{index}/"),
                MockResponse::json(detail_json(index, "s.png", "grass")),
            ));
        }
        routes.push((
            "/api/entity/3/".to_owned(),
            MockResponse::status(500, "exploded"),
        ));
        routes
    })?;

    let client = Client::new(&server.url("/api/entity"), 100, Duration::from_secs(2))?;
    let mut session = CatalogSession::new(Arc::new(client), SessionOptions::default());
    session.start();
    settle(&mut session, Duration::from_secs(10))?;

    assert_eq!(session.status(), &LoadStatus::Ready);
    let progress = session.progress();
    assert_eq!(progress.cached, 4);
    assert_eq!(progress.unavailable, 1);

    let failed = session.cache().get("venusaur").expect("placeholder cached");
    assert!(failed.is_unavailable());
    assert_eq!(failed.category_name, UNKNOWN_CATEGORY);
    assert_eq!(
        session.cache().get("charmander").map(|d| d.category_name.as_str()),
        Some("grass")
    );

    drop(session);
    let seen = server.finish()?;
    assert_eq!(seen.len(), 5);
    Ok(())
}
