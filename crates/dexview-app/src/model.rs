// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// Number of listing entries shown per page.
pub const PAGE_SIZE: usize = 100;

pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Number of pages needed to show `count` entries, zero when there are none.
pub const fn page_count(count: usize) -> usize {
    count.div_ceil(PAGE_SIZE)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingEntry {
    pub name: String,
    pub url: String,
}

impl ListingEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub id: EntityId,
    pub sprite: String,
    pub category_name: String,
}

impl DetailRecord {
    pub fn new(id: i64, sprite: impl Into<String>, category_name: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(id),
            sprite: sprite.into(),
            category_name: category_name.into(),
        }
    }

    /// Placeholder stored for an entry whose detail could not be fetched.
    pub fn unavailable() -> Self {
        Self {
            id: EntityId::UNAVAILABLE,
            sprite: String::new(),
            category_name: UNKNOWN_CATEGORY.to_owned(),
        }
    }

    pub const fn is_unavailable(&self) -> bool {
        self.id.is_unavailable()
    }
}

/// Result of the bulk listing request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Listing {
    pub entries: Vec<ListingEntry>,
    pub total_count: usize,
}

impl Listing {
    pub const fn total_pages(&self) -> usize {
        page_count(self.total_count)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loading,
    Ready,
    Failed(String),
}

impl LoadStatus {
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HydrationProgress {
    pub cached: usize,
    pub total: usize,
    pub unavailable: usize,
}

impl HydrationProgress {
    pub const fn is_complete(&self) -> bool {
        self.cached >= self.total
    }
}
