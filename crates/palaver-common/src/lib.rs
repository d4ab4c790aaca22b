//! # palaver-common
//!
//! Shared types, configuration, error handling, and relay wire frames used by
//! the Palaver client crates. No I/O lives here, just primitives and contracts.

pub mod config;
pub mod error;
pub mod models;
pub mod relay;
pub mod validation;

pub use error::{PalaverError, PalaverResult};
