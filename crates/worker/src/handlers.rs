//! Event handler table of the offline worker.
//!
//! Every event the hosting platform can deliver has exactly one method
//! here. The future a method returns is the completion signal: the host
//! must keep the worker alive until it resolves.

use async_trait::async_trait;
use bytes::Bytes;
use hirafi_core::{Error, Request, ResponseSnapshot};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::platform::Notification;

/// An outgoing request from a controlled page.
#[derive(Debug, Clone)]
pub struct FetchEvent {
    pub request: Request,
}

/// A push message, with the raw payload if one was attached.
#[derive(Debug, Clone, Default)]
pub struct PushEvent {
    pub data: Option<Bytes>,
}

#[derive(Debug, Clone)]
pub struct NotificationClickEvent {
    pub notification: Notification,
}

#[derive(Debug, Clone)]
pub struct SyncEvent {
    pub tag: String,
}

#[derive(Debug, Clone)]
pub struct PeriodicSyncEvent {
    pub tag: String,
}

/// Where an intercepted response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Network,
    Cache,
    Synthesized,
}

/// Result of a fetch event. There is no error case: every intercepted
/// request is answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Not intercepted; the host sends the request to the network unchanged.
    Passthrough,
    Respond { response: ResponseSnapshot, source: ResponseSource },
}

impl FetchOutcome {
    pub(crate) fn respond(response: ResponseSnapshot, source: ResponseSource) -> Self {
        FetchOutcome::Respond { response, source }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Shell resources written to the shell partition.
    pub cached: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    /// Partitions deleted because their names are no longer current.
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    /// An open window already showed the destination; carries its client id.
    Focused(String),
    Opened(Url),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOutcome {
    Completed,
    /// The tag is not one this worker handles.
    Ignored,
}

#[async_trait]
pub trait WorkerHandlers: Send + Sync {
    async fn on_install(&self) -> Result<InstallReport, Error>;

    async fn on_activate(&self) -> Result<ActivationReport, Error>;

    async fn on_fetch(&self, event: FetchEvent) -> FetchOutcome;

    /// Shows a notification and returns what was shown.
    async fn on_push(&self, event: PushEvent) -> Result<Notification, Error>;

    async fn on_notification_click(&self, event: NotificationClickEvent) -> Result<ClickOutcome, Error>;

    async fn on_sync(&self, event: SyncEvent) -> SyncOutcome;

    async fn on_periodic_sync(&self, event: PeriodicSyncEvent) -> SyncOutcome;
}
