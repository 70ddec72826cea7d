//! Shared utilities for the typeahead engine
//!
//! This crate holds the pieces every other typeahead crate leans on:
//! the namespaced JSON persistence store (the engine's local storage),
//! the bounded recent-list collection, and logging initialization.

pub mod json_store;
pub mod logging;
pub mod recent;

pub use json_store::{JsonStore, JsonStoreError, JsonStoreResult};
pub use recent::RecentList;
