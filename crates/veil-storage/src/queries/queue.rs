// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable queue operations for deferred message delivery.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::params;

use veil_core::VeilError;
use veil_core::types::{MessageKind, QueueStatus, QueuedMessage};

use crate::database::{Database, fmt_ts, map_tr_err, parse_ts};

const COLUMNS: &str = "id, sender, recipient, message_type, body, media, media_id, mime_type,
                       filename, caption, voice, status, retries, created_at, last_attempt,
                       delivered_at, error";

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<QueuedMessage, rusqlite::Error> {
    let kind_raw: String = row.get(3)?;
    let kind = MessageKind::from_str(&kind_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let status_raw: String = row.get(11)?;
    let status = QueueStatus::from_str(&status_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let retries: i64 = row.get(12)?;
    let created_at: String = row.get(13)?;
    let last_attempt: Option<String> = row.get(14)?;
    let delivered_at: Option<String> = row.get(15)?;
    Ok(QueuedMessage {
        id: row.get(0)?,
        sender: row.get(1)?,
        recipient: row.get(2)?,
        kind,
        body: row.get(4)?,
        media: row.get(5)?,
        media_id: row.get(6)?,
        mime_type: row.get(7)?,
        filename: row.get(8)?,
        caption: row.get(9)?,
        voice: row.get(10)?,
        status,
        retries: retries as u32,
        created_at: parse_ts(&created_at, 13)?,
        last_attempt: last_attempt.as_deref().map(|s| parse_ts(s, 14)).transpose()?,
        delivered_at: delivered_at.as_deref().map(|s| parse_ts(s, 15)).transpose()?,
        error: row.get(16)?,
    })
}

/// Insert a new pending entry. Returns the auto-generated id.
pub async fn insert(db: &Database, msg: &QueuedMessage) -> Result<i64, VeilError> {
    let msg = msg.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO queued_messages
                     (sender, recipient, message_type, body, media, media_id, mime_type, filename,
                      caption, voice, status, retries, created_at, last_attempt, delivered_at, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    msg.sender,
                    msg.recipient,
                    msg.kind.to_string(),
                    msg.body,
                    msg.media,
                    msg.media_id,
                    msg.mime_type,
                    msg.filename,
                    msg.caption,
                    msg.voice,
                    msg.status.to_string(),
                    msg.retries,
                    fmt_ts(msg.created_at),
                    msg.last_attempt.map(fmt_ts),
                    msg.delivered_at.map(fmt_ts),
                    msg.error,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(map_tr_err)
}

/// Look up a single entry by id.
pub async fn get(db: &Database, id: i64) -> Result<Option<QueuedMessage>, VeilError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM queued_messages WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_message) {
                Ok(msg) => Ok(Some(msg)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// All entries eligible for a delivery attempt: `pending`, or `failed`
/// with fewer than `max_retries` attempts. Oldest first.
pub async fn retryable(db: &Database, max_retries: u32) -> Result<Vec<QueuedMessage>, VeilError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM queued_messages
                 WHERE status = 'pending' OR (status = 'failed' AND retries < ?1)
                 ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map(params![max_retries], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an entry delivered, stamping `delivered_at`.
pub async fn mark_delivered(
    db: &Database,
    id: i64,
    delivered_at: DateTime<Utc>,
) -> Result<(), VeilError> {
    let delivered_at = fmt_ts(delivered_at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queued_messages
                 SET status = 'delivered', delivered_at = ?2, error = NULL
                 WHERE id = ?1",
                params![id, delivered_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark an entry cancelled with a reason. Cancelled entries are never retried.
pub async fn mark_cancelled(db: &Database, id: i64, reason: &str) -> Result<(), VeilError> {
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE queued_messages SET status = 'cancelled', error = ?2 WHERE id = ?1",
                params![id, reason],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Record a failed delivery attempt.
///
/// Increments `retries` and stamps `last_attempt`; once the count reaches
/// `max_retries` the entry flips to `failed_permanent`. Both the increment
/// and the status decision happen inside one transaction, so the
/// permanent transition occurs exactly once.
pub async fn record_failure(
    db: &Database,
    id: i64,
    max_retries: u32,
    error: &str,
    now: DateTime<Utc>,
) -> Result<QueueStatus, VeilError> {
    let error = error.to_string();
    let now = fmt_ts(now);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let retries: u32 = tx.query_row(
                "SELECT retries FROM queued_messages WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;

            let new_retries = retries + 1;
            let status = if new_retries >= max_retries {
                QueueStatus::FailedPermanent
            } else {
                QueueStatus::Failed
            };
            tx.execute(
                "UPDATE queued_messages
                 SET status = ?2, retries = ?3, last_attempt = ?4, error = ?5
                 WHERE id = ?1",
                params![id, status.to_string(), new_retries, now, error],
            )?;
            tx.commit()?;
            Ok(status)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete `delivered` and `cancelled` entries older than `cutoff`.
///
/// `failed_permanent` entries are kept for audit.
pub async fn purge_terminal(db: &Database, cutoff: DateTime<Utc>) -> Result<u64, VeilError> {
    let cutoff = fmt_ts(cutoff);
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM queued_messages
                 WHERE status IN ('delivered', 'cancelled') AND created_at < ?1",
                params![cutoff],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_tr_err)
}
