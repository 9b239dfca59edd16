//! Local cache store

mod migrations;
mod store;

pub use store::{CacheStore, PendingRecord};
