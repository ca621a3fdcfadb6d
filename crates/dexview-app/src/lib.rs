// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod cache;
pub mod error;
mod hydrate;
pub mod ids;
pub mod model;
pub mod projector;
pub mod session;
pub mod source;
pub mod state;

pub use cache::*;
pub use error::*;
pub use ids::*;
pub use model::*;
pub use projector::*;
pub use session::*;
pub use source::*;
pub use state::*;
