// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use dexview_app::{CatalogSource, DetailRecord, FetchError, Listing, ListingEntry};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Listing limit large enough to cover the whole remote catalog in one call.
pub const DEFAULT_LISTING_LIMIT: usize = 1500;

#[derive(Debug, Clone)]
pub struct Client {
    listing_url: Url,
    listing_limit: usize,
    http: HttpClient,
}

impl Client {
    pub fn new(listing_url: &str, listing_limit: usize, timeout: Duration) -> Result<Self> {
        let trimmed = listing_url.trim();
        if trimmed.is_empty() {
            bail!("api.listing_url must not be empty");
        }
        let listing_url =
            Url::parse(trimmed).with_context(|| format!("parse listing url {trimmed:?}"))?;
        if !matches!(listing_url.scheme(), "http" | "https") {
            bail!(
                "api.listing_url must use http or https, got {:?}",
                listing_url.scheme()
            );
        }
        if listing_limit == 0 {
            bail!("api.listing_limit must be positive");
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("dexview/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            listing_url,
            listing_limit,
            http,
        })
    }

    /// Full URL of the bulk listing request: always from offset 0, bounded
    /// by the configured limit.
    pub fn listing_request_url(&self) -> Url {
        let mut url = self.listing_url.clone();
        url.query_pairs_mut()
            .append_pair("offset", "0")
            .append_pair("limit", &self.listing_limit.to_string());
        url
    }

    pub fn list(&self) -> Result<Listing, FetchError> {
        let url = self.listing_request_url();
        let parsed: ListingResponse = self.get_json(url)?;
        debug!(
            count = parsed.count,
            returned = parsed.results.len(),
            "listing response decoded"
        );
        Ok(Listing {
            total_count: parsed.count,
            entries: parsed
                .results
                .into_iter()
                .map(|row| ListingEntry::new(row.name, row.url))
                .collect(),
        })
    }

    pub fn detail(&self, entry: &ListingEntry) -> Result<DetailRecord, FetchError> {
        let url = Url::parse(&entry.url).map_err(|error| FetchError::InvalidUrl {
            url: entry.url.clone(),
            message: error.to_string(),
        })?;
        let parsed: DetailResponse = self.get_json(url)?;
        parsed.into_record(&entry.url)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FetchError> {
        let url_text = url.to_string();
        debug!(url = %url_text, "GET");
        let response = self
            .http
            .get(url)
            .send()
            .map_err(|error| connection_error(&url_text, &error))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(clean_error_response(&url_text, status, &body));
        }

        let body = response
            .text()
            .map_err(|error| connection_error(&url_text, &error))?;
        serde_json::from_str(&body).map_err(|error| FetchError::Decode {
            url: url_text,
            message: error.to_string(),
        })
    }
}

impl CatalogSource for Client {
    fn fetch_listing(&self) -> Result<Listing, FetchError> {
        self.list()
    }

    fn fetch_detail(&self, entry: &ListingEntry) -> Result<DetailRecord, FetchError> {
        self.detail(entry)
    }
}

fn connection_error(url: &str, error: &reqwest::Error) -> FetchError {
    let message = if error.is_timeout() {
        "request timed out".to_owned()
    } else {
        error.to_string()
    };
    FetchError::Transport {
        url: url.to_owned(),
        message,
    }
}

fn clean_error_response(url: &str, status: StatusCode, body: &str) -> FetchError {
    let message = if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body)
        && let Some(detail) = parsed.detail.or(parsed.error)
        && !detail.is_empty()
    {
        detail
    } else if !body.is_empty() && body.len() < 100 && !body.contains('{') {
        body.trim().to_owned()
    } else {
        status
            .canonical_reason()
            .unwrap_or("unexpected status")
            .to_owned()
    };

    FetchError::Status {
        url: url.to_owned(),
        status: status.as_u16(),
        message,
    }
}

#[derive(Debug, Deserialize)]
struct ListingResponse {
    count: usize,
    results: Vec<ListingRow>,
}

#[derive(Debug, Deserialize)]
struct ListingRow {
    name: String,
    url: String,
}

/// Detail payload. The category sits at `category.name`, wrapped one
/// level deeper at `category.category.name`, or in the lowest `types[]`
/// slot; the sprite sits at `sprites.default` or `sprites.front_default`.
#[derive(Debug, Deserialize)]
struct DetailResponse {
    id: i64,
    sprites: Sprites,
    category: Option<CategoryField>,
    #[serde(default)]
    types: Vec<TypeSlot>,
}

impl DetailResponse {
    fn into_record(self, url: &str) -> Result<DetailRecord, FetchError> {
        let slotted = self
            .types
            .into_iter()
            .min_by_key(|slot| slot.slot)
            .map(|slot| slot.kind.name);
        let category_name = match self.category {
            Some(CategoryField::Named(named)) => named.name,
            Some(CategoryField::Wrapped { category }) => category.name,
            None => slotted.ok_or_else(|| FetchError::Decode {
                url: url.to_owned(),
                message: "detail has no category".to_owned(),
            })?,
        };
        Ok(DetailRecord::new(
            self.id,
            self.sprites.default.unwrap_or_default(),
            category_name,
        ))
    }
}

/// The sprite key must be present; a null value means "no sprite".
#[derive(Debug, Deserialize)]
struct Sprites {
    #[serde(alias = "front_default", deserialize_with = "Option::deserialize")]
    default: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamedResource {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CategoryField {
    Named(NamedResource),
    Wrapped { category: NamedResource },
}

#[derive(Debug, Deserialize)]
struct TypeSlot {
    #[serde(default)]
    slot: u32,
    #[serde(rename = "type")]
    kind: NamedResource,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    detail: Option<String>,
    error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{Client, DetailResponse, clean_error_response};
    use dexview_app::{DetailRecord, FetchError};
    use reqwest::StatusCode;
    use std::time::Duration;

    const URL: &str = "http://catalog/1/";

    fn decode(body: &str) -> Result<DetailRecord, FetchError> {
        serde_json::from_str::<DetailResponse>(body)
            .map_err(|error| FetchError::Decode {
                url: URL.to_owned(),
                message: error.to_string(),
            })?
            .into_record(URL)
    }

    #[test]
    fn detail_with_shallow_category_normalizes() {
        let record = decode(
            r#"{"id":25,"sprites":{"default":"https://img/25.png"},"category":{"name":"electric"}}"#,
        )
        .expect("shallow category should decode");
        assert_eq!(record.id.get(), 25);
        assert_eq!(record.sprite, "https://img/25.png");
        assert_eq!(record.category_name, "electric");
    }

    #[test]
    fn detail_with_wrapped_category_normalizes() {
        let record = decode(
            r#"{"id":1,"sprites":{"default":"s"},"category":{"slot":1,"category":{"name":"grass"}}}"#,
        )
        .expect("wrapped category should decode");
        assert_eq!(record.category_name, "grass");
    }

    #[test]
    fn detail_with_type_slots_uses_lowest_slot() {
        let record = decode(
            r#"{"id":1,"sprites":{"front_default":"https://img/1.png"},"types":[{"slot":2,"type":{"name":"poison"}},{"slot":1,"type":{"name":"grass"}}]}"#,
        )
        .expect("type slots should decode");
        assert_eq!(record.category_name, "grass");
        assert_eq!(record.sprite, "https://img/1.png");
        assert!(!record.is_unavailable());
    }

    #[test]
    fn detail_with_null_sprite_keeps_empty_sprite() {
        let record = decode(r#"{"id":7,"sprites":{"default":null},"category":{"name":"bug"}}"#)
            .expect("null sprite should decode");
        assert!(record.sprite.is_empty());
        assert_eq!(record.category_name, "bug");
    }

    #[test]
    fn detail_missing_category_or_sprite_is_a_decode_error() {
        let no_category = decode(r#"{"id":7,"sprites":{"default":"s"}}"#)
            .expect_err("missing category should fail");
        assert!(matches!(no_category, FetchError::Decode { .. }), "got {no_category:?}");
        assert!(no_category.to_string().contains("no category"));

        let no_sprite_key = decode(r#"{"id":7,"sprites":{},"category":{"name":"bug"}}"#)
            .expect_err("missing sprite key should fail");
        assert!(matches!(no_sprite_key, FetchError::Decode { .. }));

        let no_sprites = decode(r#"{"id":7,"category":{"name":"bug"}}"#)
            .expect_err("missing sprites should fail");
        assert!(matches!(no_sprites, FetchError::Decode { .. }));
    }

    #[test]
    fn listing_url_carries_offset_and_limit() {
        let client = Client::new(
            "https://catalog.example/api/v2/entity",
            1302,
            Duration::from_secs(1),
        )
        .expect("client should build");
        assert_eq!(
            client.listing_request_url().as_str(),
            "https://catalog.example/api/v2/entity?offset=0&limit=1302"
        );
    }

    #[test]
    fn client_rejects_bad_configuration() {
        let empty = Client::new("  ", 10, Duration::from_secs(1)).expect_err("empty url");
        assert!(empty.to_string().contains("must not be empty"));

        let scheme = Client::new("ftp://catalog", 10, Duration::from_secs(1)).expect_err("ftp");
        assert!(scheme.to_string().contains("http or https"));

        let limit =
            Client::new("http://catalog", 0, Duration::from_secs(1)).expect_err("zero limit");
        assert!(limit.to_string().contains("must be positive"));
    }

    #[test]
    fn error_responses_prefer_server_detail() {
        let error = clean_error_response(
            "http://catalog/x",
            StatusCode::NOT_FOUND,
            r#"{"detail":"Not found."}"#,
        );
        assert_eq!(error.status(), Some(404));
        assert!(error.to_string().contains("Not found."));

        let plain = clean_error_response("http://catalog/x", StatusCode::BAD_GATEWAY, "upstream down");
        assert!(plain.to_string().contains("upstream down"));

        let opaque = clean_error_response(
            "http://catalog/x",
            StatusCode::SERVICE_UNAVAILABLE,
            &"{".repeat(200),
        );
        assert!(opaque.to_string().contains("Service Unavailable"));
    }
}
