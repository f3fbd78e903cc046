//! In-process fakes for controller and host tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hirafi_client::Fetcher;
use hirafi_core::{
    AppConfig, CacheDb, CacheStore, Error, PartitionTable, Request, RequestDescriptor, ResponseSnapshot,
};
use url::Url;

use crate::controller::{OfflineController, WorkerConfig};
use crate::handlers::{FetchEvent, FetchOutcome, WorkerHandlers};
use crate::platform::{Notification, Platform, WindowClient};

pub const ORIGIN: &str = "https://hirafi.test";

pub fn test_config() -> WorkerConfig {
    let app = AppConfig {
        origin: ORIGIN.into(),
        backend_host: "backend.example".into(),
        partitions: PartitionTable {
            shell: "cache-v2".into(),
            runtime: "runtime-v1".into(),
            api: "api-cache-v1".into(),
        },
        shell_files: vec!["/".into(), "/index.html".into(), "/manifest.json".into()],
        ..Default::default()
    };
    WorkerConfig::from_app(&app).unwrap()
}

pub fn url(path: &str) -> Url {
    Url::parse(ORIGIN).unwrap().join(path).unwrap()
}

/// Fetcher that answers from a route table and can be switched offline.
pub struct ScriptedFetcher {
    online: AtomicBool,
    routes: Mutex<HashMap<String, ResponseSnapshot>>,
    invalid: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            routes: Mutex::new(HashMap::new()),
            invalid: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Refuse requests for `url` as unsendable, online or not.
    pub fn reject_as_invalid(&self, url: &Url) {
        self.invalid.lock().unwrap().insert(url.to_string());
    }

    pub fn route(&self, url: &Url, response: ResponseSnapshot) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// `METHOD URL` for every fetch attempted, online or not.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<ResponseSnapshot, Error> {
        self.calls.lock().unwrap().push(format!("{} {}", request.method, request.url));
        if self.invalid.lock().unwrap().contains(request.url.as_str()) {
            return Err(Error::InvalidInput(format!("malformed request for {}", request.url)));
        }
        if !self.online.load(Ordering::SeqCst) {
            return Err(Error::Network("offline".into()));
        }
        let routed = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
        Ok(routed.unwrap_or_else(|| ResponseSnapshot::text(404, "not found")))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    Claim,
    Show(Notification),
    Close(String),
    Focus(String),
    Open(String),
}

/// Platform that records every request and serves a fixed window list.
#[derive(Default)]
pub struct RecordingPlatform {
    pub windows: Mutex<Vec<WindowClient>>,
    /// Makes `claim_clients` fail after recording the call.
    pub fail_claim: AtomicBool,
    calls: Mutex<Vec<PlatformCall>>,
}

impl RecordingPlatform {
    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Platform for RecordingPlatform {
    async fn claim_clients(&self) -> Result<(), Error> {
        self.record(PlatformCall::Claim);
        if self.fail_claim.load(Ordering::SeqCst) {
            return Err(Error::Platform("claim refused".into()));
        }
        Ok(())
    }

    async fn show_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.record(PlatformCall::Show(notification.clone()));
        Ok(())
    }

    async fn close_notification(&self, notification: &Notification) -> Result<(), Error> {
        self.record(PlatformCall::Close(notification.tag.clone()));
        Ok(())
    }

    async fn window_clients(&self) -> Result<Vec<WindowClient>, Error> {
        Ok(self.windows.lock().unwrap().clone())
    }

    async fn focus(&self, client: &WindowClient) -> Result<(), Error> {
        self.record(PlatformCall::Focus(client.id.clone()));
        Ok(())
    }

    async fn open_window(&self, url: &Url) -> Result<(), Error> {
        self.record(PlatformCall::Open(url.to_string()));
        Ok(())
    }
}

/// Store whose reads or writes fail on demand, like a corrupt or full disk.
pub struct FailingStore {
    pub inner: CacheDb,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new(inner: CacheDb) -> Self {
        Self { inner, fail_reads: AtomicBool::new(false), fail_writes: AtomicBool::new(false) }
    }

    fn check_read(&self) -> Result<(), Error> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::CorruptSnapshot("unreadable page".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> Result<(), Error> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::InvalidInput("quota exceeded".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FailingStore {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        self.inner.open_partition(partition).await
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.check_read()?;
        self.inner.partition_names().await
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, Error> {
        self.check_write()?;
        self.inner.delete_partition(partition).await
    }

    async fn match_request(
        &self, partition: &str, descriptor: &RequestDescriptor,
    ) -> Result<Option<ResponseSnapshot>, Error> {
        self.check_read()?;
        self.inner.match_entry(partition, descriptor).await
    }

    async fn put(
        &self, partition: &str, descriptor: &RequestDescriptor, response: &ResponseSnapshot,
    ) -> Result<(), Error> {
        self.check_write()?;
        self.inner.put_entry(partition, descriptor, response).await
    }

    async fn put_all(&self, partition: &str, entries: &[(RequestDescriptor, ResponseSnapshot)]) -> Result<(), Error> {
        self.check_write()?;
        self.inner.put_entries(partition, entries).await
    }
}

pub struct Harness {
    pub controller: OfflineController,
    pub fetcher: Arc<ScriptedFetcher>,
    pub platform: Arc<RecordingPlatform>,
    /// The database behind the controller's store, for inspection.
    pub db: CacheDb,
}

pub async fn harness(config: WorkerConfig) -> Harness {
    let db = CacheDb::open_in_memory().await.unwrap();
    harness_with_store(config, db.clone(), Arc::new(db)).await
}

pub async fn harness_with_store(config: WorkerConfig, db: CacheDb, store: Arc<dyn CacheStore>) -> Harness {
    let fetcher = Arc::new(ScriptedFetcher::new());
    let platform = Arc::new(RecordingPlatform::default());
    let controller = OfflineController::new(config, store, fetcher.clone(), platform.clone());
    Harness { controller, fetcher, platform, db }
}

impl Harness {
    /// Route every shell URL to a 200 response.
    pub fn route_shell(&self) {
        for shell_url in &self.controller.config().shell {
            self.fetcher.route(shell_url, ResponseSnapshot::text(200, &format!("shell {}", shell_url.path())));
        }
    }

    /// Install with a fully reachable shell, then activate.
    pub async fn activate(&self) {
        self.route_shell();
        self.controller.on_install().await.unwrap();
        self.controller.on_activate().await.unwrap();
    }

    pub async fn get(&self, target: &Url) -> FetchOutcome {
        self.controller.on_fetch(FetchEvent { request: Request::get(target.clone()) }).await
    }
}
