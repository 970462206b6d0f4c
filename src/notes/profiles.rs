//! Profile and note lifecycle: create, list, and cascade deletion across both
//! stores.
//!
//! The primary store is the source of truth for existence. Mirror deletion is
//! best-effort: a failure after the primary delete succeeded is logged and
//! reported as `mirror_synced: false`, not as a failure of the delete itself.

use rusqlite::Connection;
use serde::Serialize;

use crate::error::ServiceError;
use crate::notes::types::{Category, Note, Profile, Record};
use crate::notes::{kv, mirror};

/// Result of a note or profile deletion.
#[derive(Debug, Serialize)]
pub struct DeleteOutcome {
    pub id: String,
    /// `false` when the mirror cleanup failed and stale rows may linger until
    /// the next overwrite or delete.
    pub mirror_synced: bool,
}

/// Create a profile for `user_id`. Enforces the per-user profile limit before
/// any write happens.
pub fn create_profile(
    primary: &Connection,
    mirror_conn: &Connection,
    user_id: &str,
    name: &str,
    avatar: Option<String>,
    description: String,
    profile_limit: usize,
) -> Result<Profile, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::InvalidInput("profile name is required".into()));
    }

    let existing = list_profiles(primary, user_id)?;
    if existing.len() >= profile_limit {
        return Err(ServiceError::ProfileLimitReached(profile_limit));
    }

    let profile = Profile {
        id: uuid::Uuid::now_v7().to_string(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        avatar,
        description,
        created_at: chrono::Utc::now().to_rfc3339(),
    };

    kv::set(
        primary,
        &kv::profile_key(user_id, &profile.id),
        &Record::Profile(profile.clone()),
    )?;
    mirror::upsert_profile(
        mirror_conn,
        &profile.id,
        user_id,
        &profile.name,
        &profile.created_at,
    )?;

    tracing::info!(user = %user_id, profile = %profile.id, "profile created");
    Ok(profile)
}

/// All profiles owned by `user_id`.
///
/// The shared prefix also covers categories and notes; the record kind picks
/// out the profiles.
pub fn list_profiles(primary: &Connection, user_id: &str) -> Result<Vec<Profile>, ServiceError> {
    let records = kv::list_by_prefix(primary, &kv::user_prefix(user_id))?;
    Ok(records
        .into_iter()
        .filter_map(|r| match r {
            Record::Profile(p) => Some(p),
            _ => None,
        })
        .collect())
}

/// A profile's categories.
pub fn list_categories(
    primary: &Connection,
    user_id: &str,
    profile_id: &str,
) -> Result<Vec<Category>, ServiceError> {
    let records = kv::list_by_prefix(primary, &kv::category_prefix(user_id, profile_id))?;
    Ok(records
        .into_iter()
        .filter_map(|r| match r {
            Record::Category(c) => Some(c),
            _ => None,
        })
        .collect())
}

/// A profile's notes.
pub fn list_notes(
    primary: &Connection,
    user_id: &str,
    profile_id: &str,
) -> Result<Vec<Note>, ServiceError> {
    let records = kv::list_by_prefix(primary, &kv::note_prefix(user_id, profile_id))?;
    Ok(records
        .into_iter()
        .filter_map(|r| match r {
            Record::Note(n) => Some(n),
            _ => None,
        })
        .collect())
}

/// Delete a profile and cascade to its categories, notes, and mirror rows.
pub fn delete_profile(
    primary: &mut Connection,
    mirror_conn: &Connection,
    user_id: &str,
    profile_id: &str,
) -> Result<DeleteOutcome, ServiceError> {
    // Profile record plus every child key under the colon-terminated prefix.
    let mut keys =
        kv::list_keys_by_prefix(primary, &kv::profile_children_prefix(user_id, profile_id))?;
    keys.push(kv::profile_key(user_id, profile_id));
    kv::delete_many(primary, &keys)?;

    let mirror_synced = match mirror::delete_profile(mirror_conn, profile_id) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(profile = %profile_id, error = %e, "mirror cleanup failed on profile delete");
            false
        }
    };

    tracing::info!(
        user = %user_id,
        profile = %profile_id,
        removed = keys.len(),
        mirror_synced,
        "profile deleted"
    );

    Ok(DeleteOutcome {
        id: profile_id.to_string(),
        mirror_synced,
    })
}

/// Delete one note from both stores. Deleting an absent note is a no-op ack.
pub fn delete_note(
    primary: &Connection,
    mirror_conn: &Connection,
    user_id: &str,
    profile_id: &str,
    note_id: &str,
) -> Result<DeleteOutcome, ServiceError> {
    kv::delete(primary, &kv::note_key(user_id, profile_id, note_id))?;

    let mirror_synced = match mirror::delete_memory(mirror_conn, note_id) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(note = %note_id, error = %e, "mirror cleanup failed on note delete");
            false
        }
    };

    Ok(DeleteOutcome {
        id: note_id.to_string(),
        mirror_synced,
    })
}
