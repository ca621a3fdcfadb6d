// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::cache::DetailCache;
use crate::model::{DetailRecord, ListingEntry, PAGE_SIZE, page_count};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectedItem<'a> {
    pub entry: &'a ListingEntry,
    pub detail: Option<&'a DetailRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectedView<'a> {
    pub page_items: Vec<ProjectedItem<'a>>,
    pub total_pages: usize,
    pub match_count: usize,
}

/// Inputs of a projection, borrowed from whoever owns the state.
#[derive(Debug, Clone, Copy)]
pub struct ViewQuery<'q> {
    pub search: &'q str,
    pub category: Option<&'q str>,
    pub page: usize,
}

/// Filters the listing by name and category, then slices out one page.
///
/// Names match when they contain `search` ignoring case. With a category
/// selected, only entries whose cached record carries exactly that category
/// match; entries without a cached record never do. A page past the end is
/// empty.
pub fn project<'a>(
    entries: &'a [ListingEntry],
    cache: &'a DetailCache,
    query: ViewQuery<'_>,
) -> ProjectedView<'a> {
    let needle = query.search.to_lowercase();
    let matches = entries
        .iter()
        .filter(|entry| needle.is_empty() || entry.name.to_lowercase().contains(&needle))
        .map(|entry| ProjectedItem {
            entry,
            detail: cache.get(&entry.name),
        })
        .filter(|item| match query.category {
            None => true,
            Some(category) => item
                .detail
                .is_some_and(|detail| detail.category_name == category),
        });

    let start = query.page.saturating_mul(PAGE_SIZE);
    let mut match_count = 0;
    let mut page_items = Vec::new();
    for item in matches {
        if match_count >= start && page_items.len() < PAGE_SIZE {
            page_items.push(item);
        }
        match_count += 1;
    }

    ProjectedView {
        page_items,
        total_pages: page_count(match_count),
        match_count,
    }
}
