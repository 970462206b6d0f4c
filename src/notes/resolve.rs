//! Profile name-to-identifier resolution.
//!
//! Queries may address a profile by id or by display name. Ids pass through
//! unchanged with no existence check at this layer; names resolve against the
//! user's profiles in the primary store.

use rusqlite::Connection;

use crate::error::ServiceError;
use crate::notes::kv;
use crate::notes::types::Record;

/// An optional restriction of an operation to one profile.
#[derive(Debug, Clone)]
pub enum ProfileScope {
    Id(String),
    Name(String),
}

/// Resolve a scope to a profile id for `user_id`.
///
/// Name matching is case-insensitive and whitespace-trimmed exact match. When
/// several profiles carry the same display name the first in listing order
/// wins; the store does not guarantee that order, so which one that is must
/// not be relied upon.
pub fn resolve(
    conn: &Connection,
    user_id: &str,
    scope: &ProfileScope,
) -> Result<String, ServiceError> {
    match scope {
        ProfileScope::Id(id) => Ok(id.clone()),
        ProfileScope::Name(name) => {
            let needle = name.trim().to_lowercase();
            if needle.is_empty() {
                return Err(ServiceError::InvalidInput("profile name is empty".into()));
            }

            let records = kv::list_by_prefix(conn, &kv::user_prefix(user_id))?;
            for record in records {
                if let Record::Profile(profile) = record {
                    if profile.name.trim().to_lowercase() == needle {
                        return Ok(profile.id);
                    }
                }
            }

            Err(ServiceError::ProfileNotFound(name.clone()))
        }
    }
}
