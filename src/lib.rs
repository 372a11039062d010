//! Location history ingestion and statistics.
//!
//! Imports tracked points from GPS exports (Google Takeout, GPX,
//! GeoJSON, OwnTracks, photo library APIs), persists them to Postgres
//! and derives per-month travel statistics from the stored track.

pub mod cache;
pub mod config;
pub mod db;
pub mod distance;
pub mod jobs;
pub mod models;
pub mod notify;
pub mod parsers;
pub mod progress;
pub mod serialize;
pub mod stats;
pub mod time_chunks;
pub mod worker;
pub mod writer;
