//! Partitioned response cache.
//!
//! A cache holds any number of independently named partitions. Each
//! partition maps a request descriptor (method + URL) to the last response
//! snapshot stored for it. The SQLite implementation uses tokio-rusqlite for
//! async access and supports:
//!
//! - Exact-name partition addressing (no prefix queries)
//! - Last-write-wins upserts per descriptor
//! - All-or-nothing batch writes for shell pre-caching
//! - Automatic schema migrations

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod partitions;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use store::CacheStore;
