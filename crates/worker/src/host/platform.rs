//! [`Platform`] backed by the host's message channel.

use async_trait::async_trait;
use hirafi_core::Error;
use tokio::sync::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use url::Url;

use super::protocol::HostMessage;
use crate::platform::{Notification, Platform, WindowClient};

/// Turns platform requests into outgoing messages and tracks the windows the
/// host reports as open.
pub struct StdioPlatform {
    outbox: UnboundedSender<HostMessage>,
    windows: RwLock<Vec<WindowClient>>,
}

impl StdioPlatform {
    pub fn new(outbox: UnboundedSender<HostMessage>) -> Self {
        Self { outbox, windows: RwLock::new(Vec::new()) }
    }

    /// Record an open window, replacing any earlier entry with the same id.
    pub async fn register_window(&self, client: WindowClient) {
        let mut windows = self.windows.write().await;
        windows.retain(|w| w.id != client.id);
        tracing::debug!(client = %client.id, url = %client.url, "window opened");
        windows.push(client);
    }

    pub async fn remove_window(&self, id: &str) {
        self.windows.write().await.retain(|w| w.id != id);
    }

    fn send(&self, message: HostMessage) -> Result<(), Error> {
        self.outbox
            .send(message)
            .map_err(|_| Error::Platform("host output closed".into()))
    }
}

#[async_trait]
impl Platform for StdioPlatform {
    async fn claim_clients(&self) -> Result<(), Error> {
        self.send(HostMessage::Claim)
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.send(HostMessage::ShowNotification(notification.clone()))
    }

    async fn close_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.send(HostMessage::CloseNotification { tag: notification.tag.clone() })
    }

    async fn window_clients(&self) -> Result<Vec<WindowClient>, Error> {
        Ok(self.windows.read().await.clone())
    }

    async fn focus(&self, client: &WindowClient) -> Result<(), Error> {
        self.send(HostMessage::Focus { client_id: client.id.clone() })
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        self.send(HostMessage::OpenWindow { url: url.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn window(id: &str, url: &str) -> WindowClient {
        WindowClient { id: id.into(), url: url.into() }
    }

    #[tokio::test]
    async fn test_window_registry() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let platform = StdioPlatform::new(tx);

        platform.register_window(window("a", "https://hirafi.test/")).await;
        platform.register_window(window("b", "https://hirafi.test/search")).await;
        platform.register_window(window("a", "https://hirafi.test/messages")).await;
        platform.remove_window("b").await;

        assert_eq!(platform.window_clients().await.unwrap(), vec![window("a", "https://hirafi.test/messages")]);
    }

    #[tokio::test]
    async fn test_requests_become_messages() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let platform = StdioPlatform::new(tx);

        platform.claim_clients().await.unwrap();
        platform.focus(&window("a", "https://hirafi.test/")).await.unwrap();
        platform.open_window(&Url::parse("https://hirafi.test/messages").unwrap()).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), HostMessage::Claim);
        assert_eq!(rx.recv().await.unwrap(), HostMessage::Focus { client_id: "a".into() });
        assert_eq!(rx.recv().await.unwrap(), HostMessage::OpenWindow { url: "https://hirafi.test/messages".into() });
    }

    #[tokio::test]
    async fn test_closed_output_is_platform_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let platform = StdioPlatform::new(tx);

        assert!(matches!(platform.claim_clients().await, Err(Error::Platform(_))));
    }
}
