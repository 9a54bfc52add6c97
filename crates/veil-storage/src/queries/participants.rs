// SPDX-FileCopyrightText: 2026 Veil Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Participant pairing-state operations.
//!
//! Every mutation here is a single atomic UPDATE or UPSERT; the matchmaker
//! composes them without holding any cross-statement lock. The one
//! conditional mutation, [`claim_waiting`], is what makes a pairing
//! single-winner when two searches race for the same candidate.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::params;

use veil_core::VeilError;
use veil_core::types::{Participant, ParticipantStatus};

use crate::database::{Database, fmt_ts, map_tr_err, parse_ts};

fn row_to_participant(row: &rusqlite::Row<'_>) -> Result<Participant, rusqlite::Error> {
    let status_raw: String = row.get(1)?;
    let status = ParticipantStatus::from_str(&status_raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let joined_at: String = row.get(3)?;
    let last_search_time: String = row.get(4)?;
    let last_activity: String = row.get(5)?;
    Ok(Participant {
        id: row.get(0)?,
        status,
        partner: row.get(2)?,
        joined_at: parse_ts(&joined_at, 3)?,
        last_search_time: parse_ts(&last_search_time, 4)?,
        last_activity: parse_ts(&last_activity, 5)?,
    })
}

/// Look up a participant by id.
pub async fn get_participant(db: &Database, id: &str) -> Result<Option<Participant>, VeilError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, status, partner, joined_at, last_search_time, last_activity
                 FROM participants WHERE id = ?1",
            )?;
            match stmt.query_row(params![id], row_to_participant) {
                Ok(p) => Ok(Some(p)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Create or reset a participant to `waiting` with no partner.
///
/// First-time callers get a fresh record with `joined_at = now`; existing
/// records keep their original `joined_at` and refresh `last_search_time`.
pub async fn upsert_waiting(db: &Database, id: &str, now: DateTime<Utc>) -> Result<(), VeilError> {
    let id = id.to_string();
    let now = fmt_ts(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO participants (id, status, partner, joined_at, last_search_time, last_activity)
                 VALUES (?1, 'waiting', NULL, ?2, ?2, ?2)
                 ON CONFLICT(id) DO UPDATE SET
                     status = 'waiting',
                     partner = NULL,
                     last_search_time = excluded.last_search_time,
                     last_activity = excluded.last_activity",
                params![id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Reset a participant to `idle` with no partner. A no-op for unknown ids.
pub async fn set_idle(db: &Database, id: &str) -> Result<(), VeilError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE participants SET status = 'idle', partner = NULL WHERE id = ?1",
                params![id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically claim a waiting candidate for pairing.
///
/// The `status = 'waiting'` predicate is evaluated inside the UPDATE, so
/// of two racing claims on the same candidate exactly one sees a changed
/// row and wins.
pub async fn claim_waiting(db: &Database, id: &str, partner_id: &str) -> Result<bool, VeilError> {
    let id = id.to_string();
    let partner_id = partner_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE participants SET status = 'chatting', partner = ?2
                 WHERE id = ?1 AND status = 'waiting'",
                params![id, partner_id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(map_tr_err)
}

/// Set a participant to `chatting` with the given partner.
pub async fn set_chatting(db: &Database, id: &str, partner_id: &str) -> Result<(), VeilError> {
    let id = id.to_string();
    let partner_id = partner_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE participants SET status = 'chatting', partner = ?2 WHERE id = ?1",
                params![id, partner_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Ids of all other participants currently waiting, oldest search first.
///
/// FIFO by `last_search_time` substitutes for scan order so the longest
/// waiter is offered first.
pub async fn waiting_candidates(db: &Database, exclude_id: &str) -> Result<Vec<String>, VeilError> {
    let exclude_id = exclude_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id FROM participants
                 WHERE status = 'waiting' AND id != ?1
                 ORDER BY last_search_time ASC",
            )?;
            let rows = stmt.query_map(params![exclude_id], |row| row.get(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}

/// Partner ids matched with `id` at or after `since`.
pub async fn recent_partner_ids(
    db: &Database,
    id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<String>, VeilError> {
    let id = id.to_string();
    let since = fmt_ts(since);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT partner_id FROM recent_partners
                 WHERE participant_id = ?1 AND matched_at >= ?2",
            )?;
            let rows = stmt.query_map(params![id, since], |row| row.get(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}

/// Record that `id` was matched with `partner_id` at `matched_at`.
pub async fn record_recent_partner(
    db: &Database,
    id: &str,
    partner_id: &str,
    matched_at: DateTime<Utc>,
) -> Result<(), VeilError> {
    let id = id.to_string();
    let partner_id = partner_id.to_string();
    let matched_at = fmt_ts(matched_at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO recent_partners (participant_id, partner_id, matched_at)
                 VALUES (?1, ?2, ?3)",
                params![id, partner_id, matched_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete recent-partner entries older than `cutoff`, for all participants.
pub async fn purge_recent_partners(db: &Database, cutoff: DateTime<Utc>) -> Result<u64, VeilError> {
    let cutoff = fmt_ts(cutoff);
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM recent_partners WHERE matched_at < ?1",
                params![cutoff],
            )?;
            Ok(removed as u64)
        })
        .await
        .map_err(map_tr_err)
}

/// Refresh a participant's `last_activity` timestamp.
pub async fn touch_activity(db: &Database, id: &str, now: DateTime<Utc>) -> Result<(), VeilError> {
    let id = id.to_string();
    let now = fmt_ts(now);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE participants SET last_activity = ?2 WHERE id = ?1",
                params![id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
