// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

/// Numeric id the remote catalog assigns to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(i64);

impl EntityId {
    /// Id carried by the placeholder record of an entry whose detail fetch
    /// failed.
    pub const UNAVAILABLE: Self = Self(-1);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    pub const fn is_unavailable(self) -> bool {
        self.0 == Self::UNAVAILABLE.0
    }
}
