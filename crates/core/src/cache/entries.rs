//! Entry reads and writes within a bucket.
//!
//! Entries are keyed by [`compute_request_key`]; a write for an existing key
//! replaces every column of the previous entry.

use super::buckets::ensure_bucket;
use super::connection::CacheDb;
use super::hash::compute_request_key;
use super::response::{CacheRequest, StoredResponse};
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::{params, rusqlite};

/// Listing row for a stored entry, without the body.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntrySummary {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub response_type: String,
    pub body_bytes: u64,
    pub stored_at: String,
}

/// Reject writes the cache cannot represent.
fn check_writable(request: &CacheRequest, response: &StoredResponse) -> Result<(), Error> {
    if !request.method.eq_ignore_ascii_case("GET") {
        return Err(Error::InvalidInput(format!("cannot store a {} request", request.method)));
    }
    if response.status == 206 {
        return Err(Error::InvalidInput("partial responses are not stored".into()));
    }
    if response.varies_on_everything() {
        return Err(Error::InvalidInput("responses with Vary: * are not stored".into()));
    }
    Ok(())
}

fn write_entry(
    conn: &rusqlite::Connection, bucket_id: i64, request: &CacheRequest, response: &StoredResponse,
) -> Result<(), Error> {
    let key_hash = compute_request_key(&request.method, &request.url);
    let vary_json = serde_json::to_string(&request.vary_snapshot(response))?;
    let headers_json = serde_json::to_string(&response.headers)?;

    conn.execute(
        "INSERT INTO entries (
            bucket_id, key_hash, method, url, vary_json,
            response_url, status, status_text, response_type, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(bucket_id, key_hash) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            vary_json = excluded.vary_json,
            response_url = excluded.response_url,
            status = excluded.status,
            status_text = excluded.status_text,
            response_type = excluded.response_type,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            bucket_id,
            key_hash,
            request.method.to_ascii_uppercase(),
            &request.url,
            vary_json,
            &response.url,
            response.status,
            &response.status_text,
            response.response_type.as_str(),
            headers_json,
            &response.body,
            chrono::Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Store one response under `request`, creating the bucket if needed.
    pub async fn put_entry(&self, bucket: &str, request: &CacheRequest, response: &StoredResponse) -> Result<(), Error> {
        check_writable(request, response)?;

        let bucket = bucket.to_string();
        let request = request.clone();
        let response = response.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let bucket_id = ensure_bucket(conn, &bucket)?;
                write_entry(conn, bucket_id, &request, &response)
            })
            .await
            .map_err(Error::from)
    }

    /// Store a batch of responses in one transaction.
    ///
    /// Either every entry is written or none is. Re-running the same batch
    /// replaces entries in place and leaves the bucket contents unchanged.
    pub async fn put_batch(&self, bucket: &str, entries: Vec<(CacheRequest, StoredResponse)>) -> Result<usize, Error> {
        for (request, response) in &entries {
            check_writable(request, response)?;
        }

        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<usize, Error> {
                let tx = conn.transaction()?;
                let bucket_id = ensure_bucket(&tx, &bucket)?;
                for (request, response) in &entries {
                    write_entry(&tx, bucket_id, request, response)?;
                }
                tx.commit()?;
                Ok(entries.len())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up the response stored for `request` in `bucket`.
    ///
    /// Returns None when the bucket or entry is absent, when the request is
    /// not a GET, or when the request's headers fail the entry's `Vary` check.
    pub async fn match_entry(&self, bucket: &str, request: &CacheRequest) -> Result<Option<StoredResponse>, Error> {
        if !request.method.eq_ignore_ascii_case("GET") {
            return Ok(None);
        }

        let bucket = bucket.to_string();
        let key_hash = compute_request_key(&request.method, &request.url);
        let stored = self
            .conn
            .call(move |conn| -> Result<Option<(StoredResponse, String)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.response_url, e.status, e.status_text, e.response_type,
                            e.headers_json, e.body, e.vary_json
                     FROM entries e JOIN buckets b ON b.id = e.bucket_id
                     WHERE b.name = ?1 AND e.key_hash = ?2",
                )?;

                let result = stmt.query_row(params![bucket, key_hash], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, Vec<u8>>(5)?,
                        row.get::<_, String>(6)?,
                    ))
                });

                let (url, status, status_text, response_type, headers_json, body, vary_json) = match result {
                    Ok(row) => row,
                    Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
                    Err(e) => return Err(e.into()),
                };

                let response = StoredResponse {
                    url,
                    status,
                    status_text,
                    response_type: response_type.parse()?,
                    headers: serde_json::from_str(&headers_json)?,
                    body,
                };
                Ok(Some((response, vary_json)))
            })
            .await
            .map_err(Error::from)?;

        let Some((response, vary_json)) = stored else {
            return Ok(None);
        };

        let vary: Vec<(String, Option<String>)> = serde_json::from_str(&vary_json)?;
        if request.matches_vary(&response, &vary) { Ok(Some(response)) } else { Ok(None) }
    }

    /// Remove the entry stored for `request`.
    ///
    /// Returns false if nothing was stored under that key.
    pub async fn delete_entry(&self, bucket: &str, request: &CacheRequest) -> Result<bool, Error> {
        let bucket = bucket.to_string();
        let key_hash = compute_request_key(&request.method, &request.url);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE key_hash = ?2
                     AND bucket_id = (SELECT id FROM buckets WHERE name = ?1)",
                    params![bucket, key_hash],
                )?;
                Ok(deleted == 1)
            })
            .await
            .map_err(Error::from)
    }

    /// List entries of a bucket in URL order.
    pub async fn list_entries(&self, bucket: &str) -> Result<Vec<EntrySummary>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntrySummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.method, e.url, e.status, e.response_type, length(e.body), e.stored_at
                     FROM entries e JOIN buckets b ON b.id = e.bucket_id
                     WHERE b.name = ?1
                     ORDER BY e.url ASC",
                )?;
                let entries = stmt
                    .query_map(params![bucket], |row| {
                        Ok(EntrySummary {
                            method: row.get(0)?,
                            url: row.get(1)?,
                            status: row.get(2)?,
                            response_type: row.get(3)?,
                            body_bytes: row.get::<_, i64>(4)? as u64,
                            stored_at: row.get(5)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(entries)
            })
            .await
            .map_err(Error::from)
    }
}
