// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;

use crate::error::FetchError;
use crate::model::{DetailRecord, Listing, ListingEntry};

/// Remote catalog the session loads from.
///
/// Implementations are called from background threads, one call per request;
/// they must not hold state that assumes a single caller.
pub trait CatalogSource: Send + Sync {
    fn fetch_listing(&self) -> Result<Listing, FetchError>;
    fn fetch_detail(&self, entry: &ListingEntry) -> Result<DetailRecord, FetchError>;
}

impl<T: CatalogSource + ?Sized> CatalogSource for Arc<T> {
    fn fetch_listing(&self) -> Result<Listing, FetchError> {
        (**self).fetch_listing()
    }

    fn fetch_detail(&self, entry: &ListingEntry) -> Result<DetailRecord, FetchError> {
        (**self).fetch_detail(entry)
    }
}
