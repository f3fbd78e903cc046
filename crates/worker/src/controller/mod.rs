//! The offline cache controller.
//!
//! Owns the lifecycle state machine and answers every platform event:
//!
//! ```text
//! Uninstalled -> Installing -> Installed -> Activating -> Active
//!      ^             |
//!      +-- failed ---+
//! ```
//!
//! Fetch events are only intercepted while `Active`; earlier they pass
//! straight through to the network.

mod config;
mod lifecycle;
mod notifications;
mod policy;
mod sync;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use hirafi_client::Fetcher;
use hirafi_core::{CacheStore, Error};
use serde::Serialize;
use tokio::sync::RwLock;

pub use config::WorkerConfig;
pub(crate) use policy::{bad_request_response, network_error_response};

use crate::handlers::{
    ActivationReport, ClickOutcome, FetchEvent, FetchOutcome, InstallReport, NotificationClickEvent,
    PeriodicSyncEvent, PushEvent, SyncEvent, SyncOutcome, WorkerHandlers,
};
use crate::platform::{Notification, Platform};

/// Installation phase of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Uninstalled,
    Installing,
    Installed,
    Activating,
    Active,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Uninstalled => "uninstalled",
            WorkerState::Installing => "installing",
            WorkerState::Installed => "installed",
            WorkerState::Activating => "activating",
            WorkerState::Active => "active",
        };
        f.write_str(name)
    }
}

pub struct OfflineController {
    config: WorkerConfig,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<dyn Fetcher>,
    platform: Arc<dyn Platform>,
    state: RwLock<WorkerState>,
}

impl OfflineController {
    pub fn new(
        config: WorkerConfig, store: Arc<dyn CacheStore>, fetcher: Arc<dyn Fetcher>, platform: Arc<dyn Platform>,
    ) -> Self {
        Self { config, store, fetcher, platform, state: RwLock::new(WorkerState::Uninstalled) }
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Move from `from` to `to`, or fail without changing state.
    async fn transition(&self, from: WorkerState, to: WorkerState) -> Result<(), Error> {
        let mut state = self.state.write().await;
        let current = *state;
        if current != from {
            return Err(Error::InvalidState(format!("cannot enter {to} from {current}")));
        }
        tracing::debug!(from = %current, to = %to, "worker state change");
        *state = to;
        Ok(())
    }

    async fn set_state(&self, to: WorkerState) {
        let mut state = self.state.write().await;
        let current = *state;
        tracing::debug!(from = %current, to = %to, "worker state change");
        *state = to;
    }
}

#[async_trait]
impl WorkerHandlers for OfflineController {
    async fn on_install(&self) -> Result<InstallReport, Error> {
        self.install().await
    }

    async fn on_activate(&self) -> Result<ActivationReport, Error> {
        self.activate().await
    }

    async fn on_fetch(&self, event: FetchEvent) -> FetchOutcome {
        self.handle_fetch(event.request).await
    }

    async fn on_push(&self, event: PushEvent) -> Result<Notification, Error> {
        self.show_push(event.data.as_deref()).await
    }

    async fn on_notification_click(&self, event: NotificationClickEvent) -> Result<ClickOutcome, Error> {
        self.route_click(&event.notification).await
    }

    async fn on_sync(&self, event: SyncEvent) -> SyncOutcome {
        self.background_sync(&event.tag).await
    }

    async fn on_periodic_sync(&self, event: PeriodicSyncEvent) -> SyncOutcome {
        self.periodic_sync(&event.tag).await
    }
}
