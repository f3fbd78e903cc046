//! Install and activate phases.

use hirafi_core::{Error, Request, RequestDescriptor, ResponseSnapshot};

use super::{OfflineController, WorkerState};
use crate::handlers::{ActivationReport, InstallReport};

impl OfflineController {
    /// Pre-cache the app shell.
    ///
    /// All-or-nothing: a single unreachable or non-2xx shell resource fails
    /// the phase, nothing is written, and the controller returns to
    /// `Uninstalled` so the platform can retry.
    pub(super) async fn install(&self) -> Result<InstallReport, Error> {
        self.transition(WorkerState::Uninstalled, WorkerState::Installing).await?;

        match self.precache_shell().await {
            Ok(cached) => {
                self.set_state(WorkerState::Installed).await;
                tracing::info!(partition = %self.config.partitions.shell, cached, "app shell pre-cached");
                Ok(InstallReport { cached })
            }
            Err(e) => {
                self.set_state(WorkerState::Uninstalled).await;
                tracing::error!(error = %e, "install failed");
                Err(e)
            }
        }
    }

    async fn precache_shell(&self) -> Result<usize, Error> {
        let partition = &self.config.partitions.shell;
        self.store
            .open(partition)
            .await
            .map_err(|e| Error::InstallFailed(format!("opening {partition}: {e}")))?;

        let mut entries: Vec<(RequestDescriptor, ResponseSnapshot)> = Vec::with_capacity(self.config.shell.len());
        for url in &self.config.shell {
            let request = Request::get(url.clone());
            let response = self
                .fetcher
                .fetch(&request)
                .await
                .map_err(|e| Error::InstallFailed(format!("{url}: {e}")))?;
            if !response.is_ok() {
                return Err(Error::InstallFailed(format!("{url}: status {}", response.status)));
            }
            entries.push((request.descriptor(), response));
        }

        self.store
            .put_all(partition, &entries)
            .await
            .map_err(|e| Error::InstallFailed(format!("writing {partition}: {e}")))?;

        Ok(entries.len())
    }

    /// Delete partitions from earlier versions and take control of open pages.
    pub(super) async fn activate(&self) -> Result<ActivationReport, Error> {
        self.transition(WorkerState::Installed, WorkerState::Activating).await?;

        let removed = match self.remove_stale_partitions().await {
            Ok(removed) => removed,
            Err(e) => {
                self.set_state(WorkerState::Installed).await;
                tracing::error!(error = %e, "activation failed");
                return Err(e);
            }
        };

        if let Err(e) = self.platform.claim_clients().await {
            tracing::warn!(error = %e, "failed to claim clients; pages attach on next load");
        }

        self.set_state(WorkerState::Active).await;
        tracing::info!(removed = removed.len(), "worker active");
        Ok(ActivationReport { removed })
    }

    async fn remove_stale_partitions(&self) -> Result<Vec<String>, Error> {
        let mut removed = Vec::new();
        for name in self.store.partitions().await? {
            if self.config.partitions.is_current(&name) {
                continue;
            }
            tracing::info!(partition = %name, "removing old cache");
            if self.store.delete_partition(&name).await? {
                removed.push(name);
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use crate::controller::WorkerState;
    use crate::handlers::WorkerHandlers;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use crate::testing::{FailingStore, PlatformCall, harness, harness_with_store, test_config, url};
    use hirafi_core::{CacheDb, Error, RequestDescriptor, ResponseSnapshot};

    #[tokio::test]
    async fn test_install_precaches_shell() {
        let h = harness(test_config()).await;
        h.route_shell();

        let report = h.controller.on_install().await.unwrap();

        assert_eq!(report.cached, 3);
        assert_eq!(h.controller.state().await, WorkerState::Installed);
        for path in ["/", "/index.html", "/manifest.json"] {
            let cached = h.db.match_entry("cache-v2", &RequestDescriptor::get(url(path))).await.unwrap();
            assert!(cached.is_some(), "{path} should be pre-cached");
        }
    }

    #[tokio::test]
    async fn test_install_fails_when_any_shell_resource_unreachable() {
        let h = harness(test_config()).await;
        h.fetcher.route(&url("/"), ResponseSnapshot::text(200, "root"));
        h.fetcher.route(&url("/index.html"), ResponseSnapshot::text(200, "index"));

        let result = h.controller.on_install().await;

        assert!(matches!(result, Err(Error::InstallFailed(msg)) if msg.contains("manifest.json")));
        assert_eq!(h.controller.state().await, WorkerState::Uninstalled);
        assert_eq!(h.db.entry_count("cache-v2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_install_fails_offline_and_can_retry() {
        let h = harness(test_config()).await;
        h.route_shell();
        h.fetcher.set_online(false);

        assert!(matches!(h.controller.on_install().await, Err(Error::InstallFailed(_))));
        assert_eq!(h.controller.state().await, WorkerState::Uninstalled);

        h.fetcher.set_online(true);
        h.controller.on_install().await.unwrap();
        assert_eq!(h.controller.state().await, WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_install_twice_rejected() {
        let h = harness(test_config()).await;
        h.route_shell();
        h.controller.on_install().await.unwrap();

        assert!(matches!(h.controller.on_install().await, Err(Error::InvalidState(_))));
        assert_eq!(h.controller.state().await, WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_activate_requires_install() {
        let h = harness(test_config()).await;
        assert!(matches!(h.controller.on_activate().await, Err(Error::InvalidState(_))));
        assert_eq!(h.controller.state().await, WorkerState::Uninstalled);
    }

    #[tokio::test]
    async fn test_activate_removes_old_versions_only() {
        let h = harness(test_config()).await;
        let old = RequestDescriptor::get(url("/"));
        h.db.put_entry("cache-v1", &old, &ResponseSnapshot::text(200, "old shell")).await.unwrap();
        h.db.put_entry("api-cache-v0", &old, &ResponseSnapshot::text(200, "old api")).await.unwrap();
        h.db.put_entry("api-cache-v1", &old, &ResponseSnapshot::text(200, "current api")).await.unwrap();
        h.route_shell();
        h.controller.on_install().await.unwrap();

        let mut report = h.controller.on_activate().await.unwrap();
        report.removed.sort();

        assert_eq!(report.removed, vec!["api-cache-v0".to_string(), "cache-v1".to_string()]);
        let mut remaining = h.db.partition_names().await.unwrap();
        remaining.sort();
        assert_eq!(remaining, vec!["api-cache-v1".to_string(), "cache-v2".to_string()]);
        let kept = h.db.match_entry("api-cache-v1", &old).await.unwrap().unwrap();
        assert_eq!(&kept.body[..], b"current api");
        assert_eq!(h.db.entry_count("cache-v2").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_activate_claims_clients() {
        let h = harness(test_config()).await;
        h.activate().await;

        assert_eq!(h.controller.state().await, WorkerState::Active);
        assert_eq!(h.platform.calls(), vec![PlatformCall::Claim]);
    }

    #[tokio::test]
    async fn test_activate_rolls_back_when_cleanup_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = Arc::new(FailingStore::new(db.clone()));
        let h = harness_with_store(test_config(), db.clone(), store.clone()).await;
        db.put_entry("cache-v1", &RequestDescriptor::get(url("/")), &ResponseSnapshot::text(200, "old"))
            .await
            .unwrap();
        h.route_shell();
        h.controller.on_install().await.unwrap();

        store.fail_writes.store(true, Ordering::SeqCst);
        let result = h.controller.on_activate().await;

        assert!(result.is_err());
        assert_eq!(h.controller.state().await, WorkerState::Installed);
        assert!(h.platform.calls().is_empty());
        assert!(db.has_partition("cache-v1").await.unwrap());

        store.fail_writes.store(false, Ordering::SeqCst);
        let report = h.controller.on_activate().await.unwrap();
        assert_eq!(report.removed, vec!["cache-v1".to_string()]);
        assert_eq!(h.controller.state().await, WorkerState::Active);
    }

    #[tokio::test]
    async fn test_activate_fails_when_partitions_unreadable() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = Arc::new(FailingStore::new(db.clone()));
        let h = harness_with_store(test_config(), db, store.clone()).await;
        h.route_shell();
        h.controller.on_install().await.unwrap();

        store.fail_reads.store(true, Ordering::SeqCst);

        assert!(matches!(h.controller.on_activate().await, Err(Error::CorruptSnapshot(_))));
        assert_eq!(h.controller.state().await, WorkerState::Installed);
    }

    #[tokio::test]
    async fn test_claim_failure_still_activates() {
        let h = harness(test_config()).await;
        h.platform.fail_claim.store(true, Ordering::SeqCst);
        h.route_shell();
        h.controller.on_install().await.unwrap();

        h.controller.on_activate().await.unwrap();

        assert_eq!(h.controller.state().await, WorkerState::Active);
        assert_eq!(h.platform.calls(), vec![PlatformCall::Claim]);
    }
}
