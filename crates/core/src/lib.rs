//! Core types and shared functionality for the hirafi offline worker.
//!
//! This crate provides:
//! - Request and response snapshot types
//! - Partitioned cache store with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheStore};
pub use config::{AppConfig, ConfigError, NotificationDefaults, PartitionTable};
pub use error::Error;
pub use http::{Method, Request, RequestDescriptor, ResponseSnapshot};
