//! Primary key-value store access.
//!
//! One JSON record per namespaced key in the `kv` table. Keys follow
//! `user:{userId}:profile:{profileId}[:category:{cid} | :note:{nid}]`; the key
//! builders below are the only place that layout is spelled out. Listing is by
//! key prefix; its order is unspecified and callers must not depend on it.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::ServiceError;
use crate::notes::types::Record;

// ── Key builders ──────────────────────────────────────────────────────────────

/// Prefix covering all of a user's profiles, categories, and notes.
pub fn user_prefix(user_id: &str) -> String {
    format!("user:{user_id}:profile:")
}

pub fn profile_key(user_id: &str, profile_id: &str) -> String {
    format!("user:{user_id}:profile:{profile_id}")
}

/// Prefix covering a profile's child records (categories and notes) but not
/// the profile record itself. The trailing colon keeps a profile id from
/// matching other ids it happens to be a prefix of.
pub fn profile_children_prefix(user_id: &str, profile_id: &str) -> String {
    format!("user:{user_id}:profile:{profile_id}:")
}

pub fn category_key(user_id: &str, profile_id: &str, category_id: &str) -> String {
    format!("user:{user_id}:profile:{profile_id}:category:{category_id}")
}

pub fn category_prefix(user_id: &str, profile_id: &str) -> String {
    format!("user:{user_id}:profile:{profile_id}:category:")
}

pub fn note_key(user_id: &str, profile_id: &str, note_id: &str) -> String {
    format!("user:{user_id}:profile:{profile_id}:note:{note_id}")
}

pub fn note_prefix(user_id: &str, profile_id: &str) -> String {
    format!("user:{user_id}:profile:{profile_id}:note:")
}

// ── Operations ────────────────────────────────────────────────────────────────

/// Insert or overwrite the record at `key`.
pub fn set(conn: &Connection, key: &str, record: &Record) -> Result<(), ServiceError> {
    let value = serde_json::to_string(record)?;
    conn.execute(
        "INSERT INTO kv (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )?;
    Ok(())
}

/// Fetch the record at `key`, if any.
pub fn get(conn: &Connection, key: &str) -> Result<Option<Record>, ServiceError> {
    let value: Option<String> = conn
        .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
            row.get(0)
        })
        .optional()?;

    match value {
        Some(v) => Ok(Some(serde_json::from_str(&v)?)),
        None => Ok(None),
    }
}

/// Delete the record at `key`. Deleting an absent key is a no-op.
pub fn delete(conn: &Connection, key: &str) -> Result<(), ServiceError> {
    conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
    Ok(())
}

/// Delete a batch of keys in one transaction.
pub fn delete_many(conn: &mut Connection, keys: &[String]) -> Result<(), ServiceError> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare("DELETE FROM kv WHERE key = ?1")?;
        for key in keys {
            stmt.execute(params![key])?;
        }
    }
    tx.commit()?;
    Ok(())
}

/// List all records whose key starts with `prefix`. Order is unspecified.
pub fn list_by_prefix(conn: &Connection, prefix: &str) -> Result<Vec<Record>, ServiceError> {
    let pattern = format!("{}%", escape_like(prefix));
    let mut stmt = conn.prepare("SELECT value FROM kv WHERE key LIKE ?1 ESCAPE '\\'")?;
    let values = stmt
        .query_map(params![pattern], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    values
        .iter()
        .map(|v| serde_json::from_str(v).map_err(ServiceError::from))
        .collect()
}

/// List all keys starting with `prefix` (for cascade deletes).
pub fn list_keys_by_prefix(conn: &Connection, prefix: &str) -> Result<Vec<String>, ServiceError> {
    let pattern = format!("{}%", escape_like(prefix));
    let mut stmt = conn.prepare("SELECT key FROM kv WHERE key LIKE ?1 ESCAPE '\\'")?;
    let keys = stmt
        .query_map(params![pattern], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(keys)
}

/// Escape LIKE metacharacters so a prefix is matched literally.
fn escape_like(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::notes::types::{Category, Note, Profile};

    fn test_profile(id: &str, name: &str) -> Record {
        Record::Profile(Profile {
            id: id.into(),
            user_id: "u1".into(),
            name: name.into(),
            avatar: None,
            description: String::new(),
            created_at: "2026-01-01T00:00:00Z".into(),
        })
    }

    fn test_note(id: &str, profile_id: &str, entry: &str) -> Record {
        Record::Note(Note {
            id: id.into(),
            profile_id: profile_id.into(),
            user_id: "u1".into(),
            category_id: None,
            entry: entry.into(),
            embedding: vec![1.0, 0.0],
            created_at: "2026-01-01T00:00:00Z".into(),
            updated_at: "2026-01-01T00:00:00Z".into(),
        })
    }

    #[test]
    fn set_get_delete_roundtrip() {
        let conn = db::open_memory_primary().unwrap();
        let key = profile_key("u1", "p1");

        set(&conn, &key, &test_profile("p1", "Mom")).unwrap();
        let fetched = get(&conn, &key).unwrap().unwrap();
        assert!(matches!(fetched, Record::Profile(p) if p.name == "Mom"));

        delete(&conn, &key).unwrap();
        assert!(get(&conn, &key).unwrap().is_none());
    }

    #[test]
    fn set_overwrites_existing_key() {
        let conn = db::open_memory_primary().unwrap();
        let key = profile_key("u1", "p1");

        set(&conn, &key, &test_profile("p1", "Mom")).unwrap();
        set(&conn, &key, &test_profile("p1", "Mother")).unwrap();

        let fetched = get(&conn, &key).unwrap().unwrap();
        assert!(matches!(fetched, Record::Profile(p) if p.name == "Mother"));

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn prefix_listing_returns_intermixed_records() {
        let conn = db::open_memory_primary().unwrap();

        set(&conn, &profile_key("u1", "p1"), &test_profile("p1", "Mom")).unwrap();
        set(
            &conn,
            &category_key("u1", "p1", "c1"),
            &Record::Category(Category {
                id: "c1".into(),
                profile_id: "p1".into(),
                name: "Hobbies".into(),
                created_at: "2026-01-01T00:00:00Z".into(),
            }),
        )
        .unwrap();
        set(&conn, &note_key("u1", "p1", "n1"), &test_note("n1", "p1", "gardening")).unwrap();

        // Another user's records must not leak in
        set(&conn, &profile_key("u2", "p9"), &test_profile("p9", "Dad")).unwrap();

        let records = list_by_prefix(&conn, &user_prefix("u1")).unwrap();
        assert_eq!(records.len(), 3);

        let profiles: Vec<_> = records
            .iter()
            .filter(|r| matches!(r, Record::Profile(_)))
            .collect();
        assert_eq!(profiles.len(), 1);
    }

    #[test]
    fn children_prefix_excludes_sibling_profile_ids() {
        let conn = db::open_memory_primary().unwrap();

        // "p1" is a string prefix of "p10"; the trailing colon must keep
        // p10's children out of p1's listing.
        set(&conn, &note_key("u1", "p1", "n1"), &test_note("n1", "p1", "a")).unwrap();
        set(&conn, &note_key("u1", "p10", "n2"), &test_note("n2", "p10", "b")).unwrap();

        let keys = list_keys_by_prefix(&conn, &profile_children_prefix("u1", "p1")).unwrap();
        assert_eq!(keys, vec![note_key("u1", "p1", "n1")]);
    }

    #[test]
    fn delete_many_removes_batch() {
        let mut conn = db::open_memory_primary().unwrap();

        set(&conn, &note_key("u1", "p1", "n1"), &test_note("n1", "p1", "a")).unwrap();
        set(&conn, &note_key("u1", "p1", "n2"), &test_note("n2", "p1", "b")).unwrap();
        set(&conn, &note_key("u1", "p1", "n3"), &test_note("n3", "p1", "c")).unwrap();

        let keys = vec![note_key("u1", "p1", "n1"), note_key("u1", "p1", "n3")];
        delete_many(&mut conn, &keys).unwrap();

        let remaining = list_keys_by_prefix(&conn, &note_prefix("u1", "p1")).unwrap();
        assert_eq!(remaining, vec![note_key("u1", "p1", "n2")]);
    }

    #[test]
    fn like_metacharacters_in_ids_match_literally() {
        let conn = db::open_memory_primary().unwrap();

        set(&conn, &profile_key("u_1", "p1"), &test_profile("p1", "Mom")).unwrap();
        set(&conn, &profile_key("u21", "p2"), &test_profile("p2", "Dad")).unwrap();

        // Without escaping, the underscore in "u_1" would match "u21" too.
        let records = list_by_prefix(&conn, &user_prefix("u_1")).unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(&records[0], Record::Profile(p) if p.name == "Mom"));
    }
}
