//! HTTP API for Space Nomad.
//!
//! ## Endpoints
//!
//! - `GET /` - Welcome message / liveness
//! - `GET /missions/` - List missions (`skip`/`limit`, or `page`/`size` with
//!   `start_date`, `end_date`, `keyword` filters)
//! - `POST /missions/` - Create a mission
//! - `GET /spacex-launches/` - Proxy the SpaceX launch list
//! - `GET /nasa-apod/` - Proxy NASA's Astronomy Picture of the Day
//! - `POST /update-missions/` - Start a background mission sync
//! - `GET /sync-status/` - Synchronizer phase and last report

mod launches;
pub mod mission_store;
mod missions;
mod routes;
pub mod types;

pub use routes::{router, serve, AppState};
pub use types::*;
