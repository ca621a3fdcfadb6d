// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use thiserror::Error;

/// Failure of a single catalog request.
///
/// The same type covers the bulk listing request, where it blocks the whole
/// view, and per-entry detail requests, where it is logged and replaced by
/// the placeholder record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("cannot reach {url}: {message}")]
    Transport { url: String, message: String },

    #[error("server returned {status} for {url}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },

    #[error("decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("invalid url {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    /// The source panicked while serving the request.
    #[error("request for {url} aborted: {message}")]
    Aborted { url: String, message: String },
}

impl FetchError {
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. }
            | Self::Status { url, .. }
            | Self::Decode { url, .. }
            | Self::InvalidUrl { url, .. }
            | Self::Aborted { url, .. } => url,
        }
    }

    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
