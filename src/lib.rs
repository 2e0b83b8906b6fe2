//! # Vehicle Lookup
//!
//! Offline-first lookup of school vehicle and family registrations by plate,
//! sticker number, student, or guardian contact.
//!
//! The last good record set is cached on the device and shown immediately;
//! a background refresh pulls a fresh copy from the fast structured feed or,
//! failing that, the spreadsheet export.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────────┐
//! │  Fast feed  │──▶│              │──▶│ Cache (SQLite│
//! │ Spreadsheet │   │ Synchronizer │   │  key-value)  │
//! └─────────────┘   │              │◀──└──────────────┘
//!                   └──────┬───────┘
//!                          │ working set (watch)
//!                          ▼
//!                   ┌──────────────┐
//!                   │Search session│──▶ CLI (vlk)
//!                   └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! vlk init                          # create database
//! vlk sync                          # cache-first sync
//! vlk search "abc1234"              # search every field
//! vlk search 1001 --mode stickers --exact
//! vlk shell                         # interactive, debounced lookup
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`kv_sqlite`] | SQLite key-value store |
//! | [`resolver`] | Endpoint resolution and learned overrides |
//! | [`connectivity`] | Online/offline status |
//! | [`fastfeed`] | Fast-feed payload decoding |
//! | [`spreadsheet`] | xlsx worksheet reading |
//! | [`sources`] | Remote sources and their errors |
//! | [`sync`] | Data synchronizer and working set |
//! | [`session`] | Debounced search session |
//! | [`lifecycle`] | Application wiring and readiness |
//! | [`import`] | Local workbook import |
//! | [`search`] | `search` and `shell` commands |
//! | [`stats`] | Cache introspection commands |
//!
//! Records, normalization, the search engine, and the cache store live in
//! the platform-neutral `vehicle-lookup-core` crate.

pub mod config;
pub mod connectivity;
pub mod db;
pub mod fastfeed;
pub mod import;
pub mod kv_sqlite;
pub mod lifecycle;
pub mod migrate;
pub mod resolver;
pub mod search;
pub mod session;
pub mod sources;
pub mod spreadsheet;
pub mod stats;
pub mod sync;

