//! JSON-lines wire format between the host process and the worker.
//!
//! Every line carries a `type` tag in snake_case. Response bodies travel
//! hex-encoded so binary assets survive the text channel.

use hirafi_core::ResponseSnapshot;
use serde::{Deserialize, Serialize};

use crate::controller::WorkerState;
use crate::handlers::{ResponseSource, SyncOutcome};
use crate::platform::Notification;

/// Input from the host platform.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    Install,
    Activate,
    Fetch {
        id: String,
        #[serde(default = "default_method")]
        method: String,
        /// Absolute, or relative to the configured origin.
        url: String,
        #[serde(default)]
        headers: Vec<(String, String)>,
        #[serde(default)]
        body: Option<String>,
    },
    Push {
        /// Raw payload text; usually JSON.
        #[serde(default)]
        data: Option<String>,
    },
    NotificationClick {
        notification: Notification,
    },
    Sync {
        tag: String,
    },
    PeriodicSync {
        tag: String,
    },
    WindowOpened {
        id: String,
        url: String,
    },
    WindowClosed {
        id: String,
    },
    Status,
}

fn default_method() -> String {
    "GET".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Install,
    Activate,
}

/// Where a `response` message's body came from. `Passthrough` marks a
/// request the worker declined to intercept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrigin {
    Network,
    Cache,
    Synthesized,
    Passthrough,
}

impl From<ResponseSource> for ResponseOrigin {
    fn from(source: ResponseSource) -> Self {
        match source {
            ResponseSource::Network => ResponseOrigin::Network,
            ResponseSource::Cache => ResponseOrigin::Cache,
            ResponseSource::Synthesized => ResponseOrigin::Synthesized,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionStatus {
    pub name: String,
    pub entries: u64,
}

/// Output to the host platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostMessage {
    Lifecycle {
        phase: Phase,
        ok: bool,
        state: WorkerState,
        /// Shell resources written by a successful install.
        #[serde(skip_serializing_if = "Option::is_none")]
        cached: Option<usize>,
        /// Partitions deleted by a successful activation.
        #[serde(skip_serializing_if = "Option::is_none")]
        removed: Option<Vec<String>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Response {
        id: String,
        source: ResponseOrigin,
        status: u16,
        headers: Vec<(String, String)>,
        body_hex: String,
    },
    ShowNotification(Notification),
    CloseNotification {
        tag: String,
    },
    Claim,
    Focus {
        client_id: String,
    },
    OpenWindow {
        url: String,
    },
    Sync {
        tag: String,
        outcome: SyncOutcome,
    },
    Status {
        state: WorkerState,
        partitions: Vec<PartitionStatus>,
    },
    Error {
        message: String,
    },
}

impl HostMessage {
    pub fn response(id: String, source: ResponseOrigin, response: ResponseSnapshot) -> Self {
        HostMessage::Response {
            id,
            source,
            status: response.status,
            body_hex: hex::encode(&response.body),
            headers: response.headers,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        HostMessage::Error { message: message.into() }
    }
}
