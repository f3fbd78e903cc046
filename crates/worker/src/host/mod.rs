//! Stdio host: drives the controller from JSON-line events.
//!
//! Lifecycle, push, click and sync events are handled one at a time in
//! arrival order. Each fetch event runs as its own task so a slow request
//! never holds up the rest of the stream. Output is written by the loop
//! alone, one message per line.

mod platform;
mod protocol;

use std::io;
use std::sync::Arc;

use bytes::Bytes;
use hirafi_client::{Fetcher, canonicalize};
use hirafi_core::{CacheDb, Error, Method, Request};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;

pub use platform::StdioPlatform;
pub use protocol::{HostEvent, HostMessage, PartitionStatus, Phase, ResponseOrigin};

use crate::controller::{OfflineController, WorkerConfig, bad_request_response, network_error_response};
use crate::handlers::{
    ClickOutcome, FetchEvent, FetchOutcome, NotificationClickEvent, PeriodicSyncEvent, PushEvent, SyncEvent,
    WorkerHandlers,
};
use crate::platform::WindowClient;

pub struct Host {
    session: Arc<Session>,
    outbox: UnboundedReceiver<HostMessage>,
}

struct Session {
    controller: OfflineController,
    platform: Arc<StdioPlatform>,
    db: CacheDb,
    fetcher: Arc<dyn Fetcher>,
    outbox: UnboundedSender<HostMessage>,
}

impl Host {
    pub fn new(config: WorkerConfig, db: CacheDb, fetcher: Arc<dyn Fetcher>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let platform = Arc::new(StdioPlatform::new(tx.clone()));
        let controller = OfflineController::new(config, Arc::new(db.clone()), fetcher.clone(), platform.clone());
        let session = Session { controller, platform, db, fetcher, outbox: tx };
        Self { session: Arc::new(session), outbox: rx }
    }

    /// Serve events until `input` reaches EOF and every in-flight fetch
    /// has answered.
    pub async fn run<R, W>(mut self, input: R, mut output: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut fetches = JoinSet::new();
        let mut input_open = true;

        loop {
            tokio::select! {
                line = lines.next_line(), if input_open => match line? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => self.session.dispatch(&line, &mut fetches).await,
                    None => {
                        tracing::debug!(in_flight = fetches.len(), "input closed");
                        input_open = false;
                    }
                },
                Some(message) = self.outbox.recv() => write_message(&mut output, &message).await?,
                Some(joined) = fetches.join_next(), if !fetches.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "fetch task failed");
                    }
                }
            }

            if !input_open && fetches.is_empty() {
                break;
            }
        }

        while let Ok(message) = self.outbox.try_recv() {
            write_message(&mut output, &message).await?;
        }
        output.flush().await
    }
}

async fn write_message<W: AsyncWrite + Unpin>(output: &mut W, message: &HostMessage) -> io::Result<()> {
    let mut line = serde_json::to_vec(message).map_err(io::Error::other)?;
    line.push(b'\n');
    output.write_all(&line).await?;
    output.flush().await
}

impl Session {
    fn emit(&self, message: HostMessage) {
        if self.outbox.send(message).is_err() {
            tracing::warn!("host output closed, dropping message");
        }
    }

    async fn dispatch(self: &Arc<Self>, line: &str, fetches: &mut JoinSet<()>) {
        let event: HostEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "malformed event");
                self.emit(HostMessage::error(format!("INVALID_INPUT: {e}")));
                return;
            }
        };

        match event {
            HostEvent::Install => {
                let message = match self.controller.on_install().await {
                    Ok(report) => HostMessage::Lifecycle {
                        phase: Phase::Install,
                        ok: true,
                        state: self.controller.state().await,
                        cached: Some(report.cached),
                        removed: None,
                        error: None,
                    },
                    Err(e) => self.lifecycle_failed(Phase::Install, e).await,
                };
                self.emit(message);
            }
            HostEvent::Activate => {
                let message = match self.controller.on_activate().await {
                    Ok(report) => HostMessage::Lifecycle {
                        phase: Phase::Activate,
                        ok: true,
                        state: self.controller.state().await,
                        cached: None,
                        removed: Some(report.removed),
                        error: None,
                    },
                    Err(e) => self.lifecycle_failed(Phase::Activate, e).await,
                };
                self.emit(message);
            }
            HostEvent::Fetch { id, method, url, headers, body } => match self.request(&method, &url, headers, body) {
                Ok(request) => {
                    let session = Arc::clone(self);
                    fetches.spawn(async move { session.fetch(id, request).await });
                }
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "unusable fetch event");
                    self.emit(HostMessage::response(id, ResponseOrigin::Synthesized, bad_request_response(&e)));
                }
            },
            HostEvent::Push { data } => {
                let event = PushEvent { data: data.map(Bytes::from) };
                if let Err(e) = self.controller.on_push(event).await {
                    self.emit(HostMessage::error(e.to_string()));
                }
            }
            HostEvent::NotificationClick { notification } => {
                let event = NotificationClickEvent { notification };
                match self.controller.on_notification_click(event).await {
                    Ok(ClickOutcome::Focused(client)) => tracing::info!(client = %client, "click focused window"),
                    Ok(ClickOutcome::Opened(url)) => tracing::info!(url = %url, "click opened window"),
                    Err(e) => self.emit(HostMessage::error(e.to_string())),
                }
            }
            HostEvent::Sync { tag } => {
                let outcome = self.controller.on_sync(SyncEvent { tag: tag.clone() }).await;
                self.emit(HostMessage::Sync { tag, outcome });
            }
            HostEvent::PeriodicSync { tag } => {
                let outcome = self.controller.on_periodic_sync(PeriodicSyncEvent { tag: tag.clone() }).await;
                self.emit(HostMessage::Sync { tag, outcome });
            }
            HostEvent::WindowOpened { id, url } => self.platform.register_window(WindowClient { id, url }).await,
            HostEvent::WindowClosed { id } => self.platform.remove_window(&id).await,
            HostEvent::Status => match self.status().await {
                Ok(message) => self.emit(message),
                Err(e) => self.emit(HostMessage::error(e.to_string())),
            },
        }
    }

    async fn lifecycle_failed(&self, phase: Phase, error: Error) -> HostMessage {
        HostMessage::Lifecycle {
            phase,
            ok: false,
            state: self.controller.state().await,
            cached: None,
            removed: None,
            error: Some(error.to_string()),
        }
    }

    fn request(
        &self, method: &str, url: &str, headers: Vec<(String, String)>, body: Option<String>,
    ) -> Result<Request, Error> {
        let Ok(method) = method.parse::<Method>();
        let url = canonicalize(url, &self.controller.config().origin)
            .map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Request { method, url, headers, body: body.map(Bytes::from) })
    }

    /// Answer one fetch event. Requests the controller does not intercept
    /// go to the network unchanged.
    async fn fetch(&self, id: String, request: Request) {
        let outcome = self.controller.on_fetch(FetchEvent { request: request.clone() }).await;
        let (response, origin) = match outcome {
            FetchOutcome::Respond { response, source } => (response, ResponseOrigin::from(source)),
            FetchOutcome::Passthrough => match self.fetcher.fetch(&request).await {
                Ok(response) => (response, ResponseOrigin::Passthrough),
                Err(e @ Error::InvalidInput(_)) => {
                    tracing::warn!(url = %request.url, error = %e, "passthrough request rejected before sending");
                    (bad_request_response(&e), ResponseOrigin::Synthesized)
                }
                Err(e) => {
                    tracing::warn!(url = %request.url, error = %e, "passthrough fetch rejected");
                    (network_error_response(), ResponseOrigin::Synthesized)
                }
            },
        };
        self.emit(HostMessage::response(id, origin, response));
    }

    async fn status(&self) -> Result<HostMessage, Error> {
        let mut partitions = Vec::new();
        for name in self.db.partition_names().await? {
            let entries = self.db.entry_count(&name).await?;
            partitions.push(PartitionStatus { name, entries });
        }
        partitions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(HostMessage::Status { state: self.controller.state().await, partitions })
    }
}
