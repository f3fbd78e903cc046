//! What the worker may ask of its hosting platform.

use async_trait::async_trait;
use hirafi_core::Error;
use serde::{Deserialize, Serialize};
use url::Url;

/// A user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Notifications sharing a tag replace each other.
    pub tag: String,
    /// Destination opened on click.
    pub url: String,
}

/// An open application window or tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowClient {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait Platform: Send + Sync {
    /// Take control of already-open pages without waiting for a reload.
    async fn claim_clients(&self) -> Result<(), Error>;

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error>;

    async fn close_notification(&self, notification: &Notification) -> Result<(), Error>;

    /// Currently open windows of this application.
    async fn window_clients(&self) -> Result<Vec<WindowClient>, Error>;

    async fn focus(&self, client: &WindowClient) -> Result<(), Error>;

    async fn open_window(&self, url: &Url) -> Result<(), Error>;
}
