//! Foundation types shared across the piterm workspace.
//!
//! This crate has no piterm-internal dependencies; every other crate
//! depends on it for the error enum and `Result` alias.

pub mod error;

pub use error::{PitermError, Result};
