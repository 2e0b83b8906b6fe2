//! # Vehicle Lookup Core
//!
//! Shared, platform-neutral logic for Vehicle Lookup: the household record
//! model, value normalization, the key-value store abstraction, the versioned
//! record cache, and the multi-field search engine.
//!
//! This crate contains no tokio, sqlx, network, or filesystem I/O. Storage
//! backends are plugged in through [`store::KeyValueStore`].

pub mod cache;
pub mod models;
pub mod normalize;
pub mod search;
pub mod store;
