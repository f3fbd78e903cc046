//! Push display and notification click routing.

use hirafi_core::{Error, NotificationDefaults};
use serde::Deserialize;

use super::OfflineController;
use crate::handlers::ClickOutcome;
use crate::platform::Notification;

/// Fields a push sender may set; anything missing takes the default.
#[derive(Debug, Default, Deserialize)]
struct PushPayload {
    title: Option<String>,
    body: Option<String>,
    tag: Option<String>,
    url: Option<String>,
}

impl PushPayload {
    fn parse(data: Option<&[u8]>) -> Self {
        let Some(data) = data.filter(|d| !d.is_empty()) else {
            return Self::default();
        };
        serde_json::from_slice(data).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "malformed push payload, using defaults");
            Self::default()
        })
    }

    fn into_notification(self, defaults: &NotificationDefaults) -> Notification {
        Notification {
            title: self.title.unwrap_or_else(|| defaults.title.clone()),
            body: self.body.unwrap_or_else(|| defaults.body.clone()),
            icon: defaults.icon.clone(),
            badge: defaults.badge.clone(),
            tag: self.tag.unwrap_or_else(|| defaults.tag.clone()),
            url: self.url.unwrap_or_else(|| defaults.url.clone()),
        }
    }
}

impl OfflineController {
    pub(super) async fn show_push(&self, data: Option<&[u8]>) -> Result<Notification, Error> {
        let notification = PushPayload::parse(data).into_notification(&self.config.notification);
        self.platform.show_notification(&notification).await?;
        tracing::info!(tag = %notification.tag, url = %notification.url, "push notification shown");
        Ok(notification)
    }

    /// Focus a window already showing the destination, or open one.
    pub(super) async fn route_click(&self, notification: &Notification) -> Result<ClickOutcome, Error> {
        if let Err(e) = self.platform.close_notification(notification).await {
            tracing::warn!(tag = %notification.tag, error = %e, "failed to close notification");
        }

        let destination = if notification.url.is_empty() { "/" } else { notification.url.as_str() };
        let target = self
            .config
            .origin
            .join(destination)
            .map_err(|e| Error::InvalidUrl(format!("{destination}: {e}")))?;

        let windows = self.platform.window_clients().await?;
        if let Some(window) = windows.iter().find(|w| w.url == target.as_str()) {
            self.platform.focus(window).await?;
            tracing::debug!(client = %window.id, url = %target, "focused existing window");
            return Ok(ClickOutcome::Focused(window.id.clone()));
        }

        self.platform.open_window(&target).await?;
        tracing::debug!(url = %target, "opened new window");
        Ok(ClickOutcome::Opened(target))
    }
}
