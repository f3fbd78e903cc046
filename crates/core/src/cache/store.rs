//! The store contract the controller is written against.

use async_trait::async_trait;

use super::connection::CacheDb;
use crate::Error;
use crate::http::{RequestDescriptor, ResponseSnapshot};

/// Named partitions of request descriptor → response snapshot.
///
/// Implementations must be safe to share between concurrently handled
/// requests. Concurrent writes for the same descriptor need no ordering
/// guarantee beyond last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the partition if missing.
    async fn open(&self, partition: &str) -> Result<(), Error>;

    /// Names of every existing partition.
    async fn partitions(&self) -> Result<Vec<String>, Error>;

    /// Delete a partition with all its entries. Returns false if it did not exist.
    async fn delete_partition(&self, partition: &str) -> Result<bool, Error>;

    /// Snapshot stored for `descriptor`, if any.
    async fn match_request(
        &self, partition: &str, descriptor: &RequestDescriptor,
    ) -> Result<Option<ResponseSnapshot>, Error>;

    /// Upsert one snapshot.
    async fn put(&self, partition: &str, descriptor: &RequestDescriptor, response: &ResponseSnapshot)
    -> Result<(), Error>;

    /// Upsert a batch atomically.
    async fn put_all(&self, partition: &str, entries: &[(RequestDescriptor, ResponseSnapshot)]) -> Result<(), Error>;
}

#[async_trait]
impl CacheStore for CacheDb {
    async fn open(&self, partition: &str) -> Result<(), Error> {
        self.open_partition(partition).await
    }

    async fn partitions(&self) -> Result<Vec<String>, Error> {
        self.partition_names().await
    }

    async fn delete_partition(&self, partition: &str) -> Result<bool, Error> {
        CacheDb::delete_partition(self, partition).await
    }

    async fn match_request(
        &self, partition: &str, descriptor: &RequestDescriptor,
    ) -> Result<Option<ResponseSnapshot>, Error> {
        self.match_entry(partition, descriptor).await
    }

    async fn put(
        &self, partition: &str, descriptor: &RequestDescriptor, response: &ResponseSnapshot,
    ) -> Result<(), Error> {
        self.put_entry(partition, descriptor, response).await
    }

    async fn put_all(&self, partition: &str, entries: &[(RequestDescriptor, ResponseSnapshot)]) -> Result<(), Error> {
        self.put_entries(partition, entries).await
    }
}
