//! # Space Nomad
//!
//! Mission catalogue backend that mirrors public launch data into a local
//! store.
//!
//! This library provides:
//! - HTTP APIs to create and list missions
//! - A synchronizer that periodically upserts SpaceX launches as missions
//! - Pass-through proxies for the SpaceX and NASA APOD APIs
//!
//! ## Sync Flow
//!
//! ```text
//!   timer / POST /update-missions/
//!                 │
//!                 ▼
//!   ApiClient ──► normalize_launches ──► MissionStore::upsert_by_name
//! ```
//!
//! ## Modules
//! - `api`: HTTP routes and mission storage backends
//! - `upstream`: upstream HTTP client and launch normalization
//! - `sync`: periodic / on-demand synchronizer

pub mod api;
pub mod config;
pub mod sync;
pub mod upstream;
pub mod util;

pub use config::Config;
pub use sync::{MissionSync, SyncReport};
