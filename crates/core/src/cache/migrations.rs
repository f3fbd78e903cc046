//! Versioned schema migrations.
//!
//! Applied versions are recorded in `_migrations`. Each pending migration
//! runs in its own transaction together with its version row, so a failed
//! batch leaves the schema at the previous version.

use super::Error;
use tokio_rusqlite::{Connection, params, rusqlite};

/// Ordered `(version, sql)` pairs. Versions only ever grow.
const MIGRATIONS: &[(i64, &str)] = &[(1, include_str!("../../migrations/001_partitions.sql"))];

/// Bring the schema up to the latest version.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> { apply_pending(conn, MIGRATIONS) })
        .await
        .map_err(Error::from)
}

fn apply_pending(conn: &mut rusqlite::Connection, migrations: &[(i64, &str)]) -> Result<(), Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
    )?;

    let current: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;

    for (version, sql) in migrations.iter().filter(|(version, _)| *version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(sql)
            .map_err(|e| Error::MigrationFailed(format!("version {version}: {e}")))?;
        tx.execute(
            "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
            params![version, chrono::Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;
        tracing::debug!(version, "applied cache migration");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn applied_versions(conn: &Connection) -> Vec<i64> {
        conn.call(|conn| -> Result<Vec<i64>, rusqlite::Error> {
            let mut stmt = conn.prepare("SELECT version FROM _migrations ORDER BY version")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .unwrap()
    }

    async fn object_exists(conn: &Connection, kind: &'static str, name: &'static str) -> bool {
        conn.call(move |conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2)",
                [kind, name],
                |row| row.get(0),
            )
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_twice_is_noop() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        run(&conn).await.unwrap();

        assert!(object_exists(&conn, "table", "partitions").await);
        assert!(object_exists(&conn, "table", "entries").await);
        assert_eq!(applied_versions(&conn).await, vec![1]);
    }

    #[tokio::test]
    async fn test_only_newer_versions_applied() {
        const UPGRADE: &[(i64, &str)] = &[
            (1, "CREATE TABLE first (id INTEGER)"),
            (2, "CREATE TABLE second (id INTEGER)"),
        ];
        let conn = Connection::open_in_memory().await.unwrap();
        conn.call(|conn| -> Result<(), Error> { apply_pending(conn, &UPGRADE[..1]) })
            .await
            .unwrap();
        assert!(!object_exists(&conn, "table", "second").await);

        conn.call(|conn| -> Result<(), Error> { apply_pending(conn, UPGRADE) })
            .await
            .unwrap();

        assert!(object_exists(&conn, "table", "second").await);
        assert_eq!(applied_versions(&conn).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_failed_migration_rolls_back() {
        const BROKEN: &[(i64, &str)] = &[(1, "CREATE TABLE a (id INTEGER); CREATE TABLE broken (")];
        let conn = Connection::open_in_memory().await.unwrap();

        let result = conn
            .call(|conn| -> Result<(), Error> { apply_pending(conn, BROKEN) })
            .await
            .map_err(Error::from);

        assert!(matches!(result, Err(Error::MigrationFailed(_))));
        assert!(!object_exists(&conn, "table", "a").await);
        assert!(applied_versions(&conn).await.is_empty());
    }
}
