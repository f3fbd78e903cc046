//! Controller configuration, resolved once at construction.

use hirafi_client::canonicalize;
use hirafi_core::{AppConfig, Error, NotificationDefaults, PartitionTable};
use url::Url;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub origin: Url,
    /// Hostname substring that marks a request as a backend API call.
    pub backend_host: String,
    pub partitions: PartitionTable,
    /// Absolute URLs of the app shell.
    pub shell: Vec<Url>,
    pub notification: NotificationDefaults,
    pub sync_tag: String,
    pub periodic_sync_tag: String,
}

impl WorkerConfig {
    pub fn from_app(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;

        let shell = config
            .shell_files
            .iter()
            .map(|path| canonicalize(path, &origin).map_err(|e| Error::InvalidUrl(format!("{path}: {e}"))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            origin,
            backend_host: config.backend_host.clone(),
            partitions: config.partitions.clone(),
            shell,
            notification: config.notification.clone(),
            sync_tag: config.sync_tag.clone(),
            periodic_sync_tag: config.periodic_sync_tag.clone(),
        })
    }

    pub fn is_backend(&self, url: &Url) -> bool {
        url.host_str().is_some_and(|host| host.contains(self.backend_host.as_str()))
    }

    /// Partitions consulted by cache-first lookups, in order.
    pub fn asset_partitions(&self) -> Vec<&str> {
        let partitions = &self.partitions;
        if partitions.runtime == partitions.shell {
            vec![partitions.runtime.as_str()]
        } else {
            vec![partitions.runtime.as_str(), partitions.shell.as_str()]
        }
    }
}
