//! Per-request caching policy.
//!
//! - Non-GET requests pass through untouched.
//! - Backend API requests are network-first, mirrored into the api partition.
//! - Everything else is cache-first over the runtime and shell partitions.
//!
//! A request the fetcher refuses to send is answered with a 400 and never
//! falls back to cached copies.
//!
//! Store errors never reach the caller: a failed read is a miss and a
//! failed write is logged and dropped.

use hirafi_client::is_http;
use hirafi_core::{Error, Request, RequestDescriptor, ResponseSnapshot};

use super::{OfflineController, WorkerState};
use crate::handlers::{FetchOutcome, ResponseSource};

/// 503 JSON body for backend requests with no network and no mirror.
pub(crate) fn offline_response() -> ResponseSnapshot {
    ResponseSnapshot::json(503, &serde_json::json!({ "error": "offline" }))
}

/// 408 plain-text body for asset requests with no network and no copy.
pub(crate) fn network_error_response() -> ResponseSnapshot {
    ResponseSnapshot::text(408, "Network error happened")
}

/// 400 plain-text body for requests that could not be sent at all.
pub(crate) fn bad_request_response(error: &Error) -> ResponseSnapshot {
    ResponseSnapshot::text(400, &error.to_string())
}

impl OfflineController {
    pub(super) async fn handle_fetch(&self, request: Request) -> FetchOutcome {
        if !request.method.is_cacheable() {
            tracing::trace!(method = %request.method, url = %request.url, "passthrough");
            return FetchOutcome::Passthrough;
        }

        if self.state().await != WorkerState::Active {
            return FetchOutcome::Passthrough;
        }

        if self.config.is_backend(&request.url) {
            self.network_first(request).await
        } else {
            self.cache_first(request).await
        }
    }

    async fn network_first(&self, request: Request) -> FetchOutcome {
        let descriptor = request.descriptor();
        let partition = &self.config.partitions.api;

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if response.is_ok() {
                    self.store_snapshot(partition, &descriptor, &response).await;
                }
                FetchOutcome::respond(response, ResponseSource::Network)
            }
            Err(e @ Error::InvalidInput(_)) => {
                tracing::warn!(url = %request.url, error = %e, "request rejected before sending");
                FetchOutcome::respond(bad_request_response(&e), ResponseSource::Synthesized)
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "backend unreachable, trying mirror");
                match self.lookup(partition, &descriptor).await {
                    Some(cached) => FetchOutcome::respond(cached, ResponseSource::Cache),
                    None => FetchOutcome::respond(offline_response(), ResponseSource::Synthesized),
                }
            }
        }
    }

    async fn cache_first(&self, request: Request) -> FetchOutcome {
        let descriptor = request.descriptor();

        for partition in self.config.asset_partitions() {
            if let Some(cached) = self.lookup(partition, &descriptor).await {
                tracing::trace!(url = %request.url, partition, "cache hit");
                return FetchOutcome::respond(cached, ResponseSource::Cache);
            }
        }

        match self.fetcher.fetch(&request).await {
            Ok(response) => {
                if is_http(&request.url) && response.is_ok() {
                    self.store_snapshot(&self.config.partitions.runtime, &descriptor, &response).await;
                }
                FetchOutcome::respond(response, ResponseSource::Network)
            }
            Err(e @ Error::InvalidInput(_)) => {
                tracing::warn!(url = %request.url, error = %e, "request rejected before sending");
                FetchOutcome::respond(bad_request_response(&e), ResponseSource::Synthesized)
            }
            Err(e) => {
                tracing::error!(url = %request.url, error = %e, "fetch failed");
                // An install may have written the shell since the first lookup.
                match self.lookup(&self.config.partitions.shell, &descriptor).await {
                    Some(cached) => FetchOutcome::respond(cached, ResponseSource::Cache),
                    None => FetchOutcome::respond(network_error_response(), ResponseSource::Synthesized),
                }
            }
        }
    }

    async fn lookup(&self, partition: &str, descriptor: &RequestDescriptor) -> Option<ResponseSnapshot> {
        match self.store.match_request(partition, descriptor).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(partition, url = %descriptor.url, error = %e, "cache read failed");
                None
            }
        }
    }

    async fn store_snapshot(&self, partition: &str, descriptor: &RequestDescriptor, response: &ResponseSnapshot) {
        if let Err(e) = self.store.put(partition, descriptor, response).await {
            tracing::warn!(partition, url = %descriptor.url, error = %e, "cache write failed");
        }
    }
}
