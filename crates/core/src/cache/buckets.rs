//! Bucket lifecycle: open-or-create, enumerate, delete.

use super::connection::CacheDb;
use crate::Error;
use tokio_rusqlite::{params, rusqlite};

/// Return the id of `name`, creating the bucket if it does not exist.
pub(crate) fn ensure_bucket(conn: &rusqlite::Connection, name: &str) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    conn.query_row("SELECT id FROM buckets WHERE name = ?1", params![name], |row| row.get(0))
}

impl CacheDb {
    /// Open a bucket, creating it if absent.
    ///
    /// Returns true if the bucket was created by this call.
    pub async fn open_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let created = conn.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(created == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a bucket with this name exists.
    pub async fn has_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM buckets WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All bucket names in creation order.
    pub async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM buckets ORDER BY id ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a bucket and every entry in it.
    ///
    /// Returns false if no bucket had that name.
    pub async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM buckets WHERE name = ?1", params![name])?;
                Ok(deleted == 1)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(any(test, feature = "testing"))]
impl CacheDb {
    /// Make every later deletion of bucket `name` fail.
    pub async fn fail_deletes_of(&self, name: &str) -> Result<(), Error> {
        let trigger = format!("fail_delete_{}", name.replace('"', "\"\""));
        let sql = format!(
            "CREATE TRIGGER IF NOT EXISTS \"{trigger}\" BEFORE DELETE ON buckets
             WHEN old.name = '{}' BEGIN SELECT RAISE(ABORT, 'bucket locked'); END",
            name.replace('\'', "''")
        );
        self.conn.call(move |conn| conn.execute_batch(&sql)).await?;
        Ok(())
    }
}
