//! Network collaborator for the hirafi offline worker.
//!
//! This crate provides URL canonicalization and the HTTP fetch pipeline the
//! controller falls back to whenever it goes to the network.

pub mod fetch;

pub use fetch::{FetchConfig, Fetcher, HttpFetcher, UrlError, canonicalize, is_http};
