// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::{BTreeSet, HashMap};

use crate::model::{DetailRecord, ListingEntry};

/// Detail records keyed by entry name.
///
/// Population is monotonic: once a name has a record (real or placeholder)
/// it keeps that record for the life of the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailCache {
    records: HashMap<String, DetailRecord>,
    unavailable: usize,
}

impl DetailCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&DetailRecord> {
        self.records.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Stores `record` under `name` unless the name already has one.
    /// Returns whether the record was stored.
    pub fn insert_if_absent(&mut self, name: &str, record: DetailRecord) -> bool {
        if self.records.contains_key(name) {
            return false;
        }
        if record.is_unavailable() {
            self.unavailable += 1;
        }
        self.records.insert(name.to_owned(), record);
        true
    }

    pub const fn unavailable_count(&self) -> usize {
        self.unavailable
    }

    /// Entries of `entries` that have not been attempted yet, in listing order.
    pub fn missing<'a>(
        &'a self,
        entries: &'a [ListingEntry],
    ) -> impl Iterator<Item = &'a ListingEntry> + 'a {
        entries
            .iter()
            .filter(|entry| !self.records.contains_key(&entry.name))
    }

    /// Distinct category names currently known, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.records
            .values()
            .map(|record| record.category_name.as_str())
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .map(str::to_owned)
            .collect()
    }
}
