//! Entry reads and writes within a partition.
//!
//! Writes are upserts keyed by the request descriptor, so the last write
//! for a descriptor wins. Writing into a partition that doesn't exist yet
//! creates it.

use super::connection::CacheDb;
use crate::Error;
use crate::http::{RequestDescriptor, ResponseSnapshot};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A snapshot flattened into column values.
struct EntryRow {
    key_hash: String,
    method: String,
    url: String,
    status_code: i64,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn encode(descriptor: &RequestDescriptor, response: &ResponseSnapshot) -> Result<Self, Error> {
        if !descriptor.method.is_cacheable() {
            return Err(Error::InvalidInput(format!(
                "cannot cache {} {}: only GET requests are cacheable",
                descriptor.method, descriptor.url
            )));
        }

        Ok(Self {
            key_hash: descriptor.cache_key(),
            method: descriptor.method.to_string(),
            url: descriptor.url.to_string(),
            status_code: i64::from(response.status),
            headers_json: serde_json::to_string(&response.headers)?,
            body: response.body.to_vec(),
        })
    }
}

fn upsert_row(conn: &rusqlite::Connection, partition: &str, row: &EntryRow, now: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO partitions (name, created_at) VALUES (?1, ?2)
         ON CONFLICT(name) DO NOTHING",
        params![partition, now],
    )?;
    conn.execute(
        "INSERT INTO entries (
            partition, key_hash, method, url, status_code, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(partition, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status_code = excluded.status_code,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            partition,
            &row.key_hash,
            &row.method,
            &row.url,
            row.status_code,
            &row.headers_json,
            &row.body,
            now,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Store a snapshot for a descriptor, replacing any previous one.
    pub async fn put_entry(
        &self, partition: &str, descriptor: &RequestDescriptor, response: &ResponseSnapshot,
    ) -> Result<(), Error> {
        let row = EntryRow::encode(descriptor, response)?;
        let partition = partition.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> { upsert_row(conn, &partition, &row, &now) })
            .await
            .map_err(Error::from)
    }

    /// Store several snapshots in one transaction.
    ///
    /// Either every entry is written or none is.
    pub async fn put_entries(
        &self, partition: &str, entries: &[(RequestDescriptor, ResponseSnapshot)],
    ) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(descriptor, response)| EntryRow::encode(descriptor, response))
            .collect::<Result<Vec<_>, _>>()?;
        let partition = partition.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT INTO partitions (name, created_at) VALUES (?1, ?2)
                     ON CONFLICT(name) DO NOTHING",
                    params![&partition, &now],
                )?;
                for row in &rows {
                    upsert_row(&tx, &partition, row, &now)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the snapshot stored for a descriptor.
    ///
    /// Returns None for non-GET descriptors, unknown partitions and misses.
    pub async fn match_entry(
        &self, partition: &str, descriptor: &RequestDescriptor,
    ) -> Result<Option<ResponseSnapshot>, Error> {
        if !descriptor.method.is_cacheable() {
            return Ok(None);
        }

        let partition = partition.to_string();
        let key_hash = descriptor.cache_key();
        self.conn
            .call(move |conn| -> Result<Option<ResponseSnapshot>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT status_code, headers_json, body
                     FROM entries WHERE partition = ?1 AND key_hash = ?2",
                )?;

                let result = stmt.query_row(params![partition, key_hash], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?, row.get::<_, Vec<u8>>(2)?))
                });

                let (status_code, headers_json, body) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let status = u16::try_from(status_code)
                    .map_err(|_| Error::CorruptSnapshot(format!("status code out of range: {status_code}")))?;
                let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;

                Ok(Some(ResponseSnapshot::new(status, headers, body)))
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a partition.
    pub async fn entry_count(&self, partition: &str) -> Result<u64, Error> {
        let partition = partition.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE partition = ?1", params![partition], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
