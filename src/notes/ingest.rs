//! Write path: batch ingestion of categories and notes for one profile.
//!
//! [`submit`] is the single entry point. It resolves the profile's display
//! name once, assigns missing ids, then fans out one task per category and
//! per note. A note task embeds the entry, writes the full note to the
//! primary store, and upserts the mirror row. The operation fans in and
//! succeeds only if every branch succeeded; nothing already written is rolled
//! back, so a retry with the same ids overwrites instead of duplicating.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;

use crate::embedding::EmbeddingProvider;
use crate::error::ServiceError;
use crate::notes::types::{Category, MemoryRow, Note, Profile, Record};
use crate::notes::{kv, lock_conn, mirror};

/// One category in a submit batch. A missing id means "create".
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitCategory {
    pub id: Option<String>,
    pub name: String,
}

/// One note in a submit batch. A missing id means "create"; resubmitting an
/// existing id overwrites that note.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitNote {
    pub id: Option<String>,
    pub category_id: Option<String>,
    #[serde(default)]
    pub entry: String,
}

/// Acknowledgement returned from a successful submit.
#[derive(Debug, Serialize)]
pub struct SubmitAck {
    pub profile_id: String,
    pub category_ids: Vec<String>,
    pub note_ids: Vec<String>,
}

/// Batch-persist categories and notes for one profile.
///
/// Category and note writes are dispatched concurrently; ordering between
/// individual writes is not guaranteed. A failed branch does not cancel
/// siblings already in flight; the first error is surfaced after all
/// branches finish.
pub async fn submit(
    primary: Arc<Mutex<Connection>>,
    mirror: Arc<Mutex<Connection>>,
    provider: Arc<dyn EmbeddingProvider>,
    embed_timeout: Duration,
    user_id: String,
    profile_id: String,
    categories: Vec<SubmitCategory>,
    notes: Vec<SubmitNote>,
) -> Result<SubmitAck, ServiceError> {
    // Resolve the profile's display name once per submit, not per note.
    let profile = {
        let primary = Arc::clone(&primary);
        let user = user_id.clone();
        let pid = profile_id.clone();
        tokio::task::spawn_blocking(move || -> Result<Profile, ServiceError> {
            let conn = lock_conn(&primary)?;
            match kv::get(&conn, &kv::profile_key(&user, &pid))? {
                Some(Record::Profile(profile)) => Ok(profile),
                _ => Err(ServiceError::ProfileNotFound(pid)),
            }
        })
        .await
        .map_err(|e| ServiceError::StoreUnavailable(format!("profile lookup failed: {e}")))??
    };

    // Assign ids up front so the ack can report them and tasks own final data.
    let categories: Vec<Category> = categories
        .into_iter()
        .map(|c| Category {
            id: c.id.unwrap_or_else(|| uuid::Uuid::now_v7().to_string()),
            profile_id: profile_id.clone(),
            name: c.name,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
        .collect();
    let notes: Vec<(String, SubmitNote)> = notes
        .into_iter()
        .map(|n| {
            let id = n
                .id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
            (id, n)
        })
        .collect();

    let category_ids: Vec<String> = categories.iter().map(|c| c.id.clone()).collect();
    let note_ids: Vec<String> = notes.iter().map(|(id, _)| id.clone()).collect();

    tracing::info!(
        user = %user_id,
        profile = %profile_id,
        categories = categories.len(),
        notes = notes.len(),
        "submit started"
    );

    let mut tasks: JoinSet<Result<(), ServiceError>> = JoinSet::new();

    for category in categories {
        let primary = Arc::clone(&primary);
        let user = user_id.clone();
        tasks.spawn_blocking(move || {
            let conn = lock_conn(&primary)?;
            let key = kv::category_key(&user, &category.profile_id, &category.id);
            kv::set(&conn, &key, &Record::Category(category))
        });
    }

    for (note_id, note) in notes {
        let primary = Arc::clone(&primary);
        let mirror = Arc::clone(&mirror);
        let provider = Arc::clone(&provider);
        let user = user_id.clone();
        let pid = profile_id.clone();
        let profile_name = profile.name.clone();

        tasks.spawn(async move {
            // Embed first; a provider failure fails this branch before any
            // write for this note happens.
            let entry = note.entry.clone();
            let embedding = tokio::time::timeout(
                embed_timeout,
                tokio::task::spawn_blocking(move || provider.embed(&entry)),
            )
            .await
            .map_err(|_| ServiceError::Timeout(embed_timeout))?
            .map_err(|e| ServiceError::EmbeddingUnavailable(format!("embed task failed: {e}")))??;

            tokio::task::spawn_blocking(move || -> Result<(), ServiceError> {
                let now = chrono::Utc::now().to_rfc3339();
                let key = kv::note_key(&user, &pid, &note_id);

                // Preserve the original creation timestamp on overwrite.
                let created_at = {
                    let conn = lock_conn(&primary)?;
                    match kv::get(&conn, &key)? {
                        Some(Record::Note(existing)) => existing.created_at,
                        _ => now.clone(),
                    }
                };

                let record = Note {
                    id: note_id.clone(),
                    profile_id: pid.clone(),
                    user_id: user.clone(),
                    category_id: note.category_id.clone(),
                    entry: note.entry.clone(),
                    embedding: embedding.clone(),
                    created_at: created_at.clone(),
                    updated_at: now.clone(),
                };

                {
                    let conn = lock_conn(&primary)?;
                    kv::set(&conn, &key, &Record::Note(record))?;
                }

                let row = MemoryRow {
                    id: note_id,
                    user_id: user,
                    profile_id: pid,
                    profile_name,
                    entry: note.entry,
                    embedding,
                    created_at,
                    updated_at: now,
                };
                let conn = lock_conn(&mirror)?;
                mirror::upsert_memory(&conn, &row)
            })
            .await
            .map_err(|e| ServiceError::StoreUnavailable(format!("write task failed: {e}")))?
        });
    }

    // Fan-in: drain every branch, keep the first error. Siblings already in
    // flight run to completion either way.
    let mut first_error: Option<ServiceError> = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined
            .unwrap_or_else(|e| Err(ServiceError::StoreUnavailable(format!("task panicked: {e}"))));
        if let Err(e) = result {
            if first_error.is_none() {
                first_error = Some(e);
            }
        }
    }

    if let Some(e) = first_error {
        tracing::warn!(user = %user_id, profile = %profile_id, error = %e, "submit failed");
        return Err(e);
    }

    tracing::info!(user = %user_id, profile = %profile_id, "submit complete");

    Ok(SubmitAck {
        profile_id,
        category_ids,
        note_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::notes::profiles;

    /// Deterministic embedder: a spike at (entry length mod dims). Empty
    /// entries embed to the zero vector, like the real provider.
    struct StubProvider {
        dims: usize,
        fail: bool,
    }

    impl EmbeddingProvider for StubProvider {
        fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
            if text.trim().is_empty() {
                return Ok(vec![0.0; self.dims]);
            }
            if self.fail {
                return Err(ServiceError::EmbeddingUnavailable("stub down".into()));
            }
            let mut v = vec![0.0; self.dims];
            v[text.len() % self.dims] = 1.0;
            Ok(v)
        }

        fn dimensions(&self) -> usize {
            self.dims
        }
    }

    struct Fixture {
        primary: Arc<Mutex<Connection>>,
        mirror: Arc<Mutex<Connection>>,
        profile_id: String,
    }

    fn fixture() -> Fixture {
        let primary = db::open_memory_primary().unwrap();
        let mirror_conn = db::open_memory_mirror().unwrap();
        let profile =
            profiles::create_profile(&primary, &mirror_conn, "u1", "Mom", None, String::new(), 5)
                .unwrap();
        Fixture {
            primary: Arc::new(Mutex::new(primary)),
            mirror: Arc::new(Mutex::new(mirror_conn)),
            profile_id: profile.id,
        }
    }

    fn provider(fail: bool) -> Arc<dyn EmbeddingProvider> {
        Arc::new(StubProvider { dims: 8, fail })
    }

    fn note(entry: &str) -> SubmitNote {
        SubmitNote {
            id: None,
            category_id: None,
            entry: entry.into(),
        }
    }

    #[tokio::test]
    async fn submit_assigns_ids_and_persists_both_stores() {
        let fx = fixture();

        let ack = submit(
            Arc::clone(&fx.primary),
            Arc::clone(&fx.mirror),
            provider(false),
            Duration::from_secs(5),
            "u1".into(),
            fx.profile_id.clone(),
            vec![SubmitCategory {
                id: None,
                name: "Hobbies".into(),
            }],
            vec![note("loves gardening")],
        )
        .await
        .unwrap();

        assert_eq!(ack.category_ids.len(), 1);
        assert_eq!(ack.note_ids.len(), 1);

        let primary = fx.primary.lock().unwrap();
        let notes = profiles::list_notes(&primary, "u1", &fx.profile_id).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, ack.note_ids[0]);
        assert_eq!(notes[0].entry, "loves gardening");
        assert_eq!(notes[0].embedding.len(), 8);

        let cats = profiles::list_categories(&primary, "u1", &fx.profile_id).unwrap();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].name, "Hobbies");
        drop(primary);

        let mirror_conn = fx.mirror.lock().unwrap();
        let rows = mirror::candidates_for_user(&mirror_conn, "u1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, ack.note_ids[0]);
        assert_eq!(rows[0].profile_name, "Mom");
    }

    #[tokio::test]
    async fn resubmit_same_id_overwrites_without_duplicating() {
        let fx = fixture();

        let ack = submit(
            Arc::clone(&fx.primary),
            Arc::clone(&fx.mirror),
            provider(false),
            Duration::from_secs(5),
            "u1".into(),
            fx.profile_id.clone(),
            vec![],
            vec![note("original entry")],
        )
        .await
        .unwrap();
        let note_id = ack.note_ids[0].clone();

        submit(
            Arc::clone(&fx.primary),
            Arc::clone(&fx.mirror),
            provider(false),
            Duration::from_secs(5),
            "u1".into(),
            fx.profile_id.clone(),
            vec![],
            vec![SubmitNote {
                id: Some(note_id.clone()),
                category_id: None,
                entry: "revised entry".into(),
            }],
        )
        .await
        .unwrap();

        let primary = fx.primary.lock().unwrap();
        let notes = profiles::list_notes(&primary, "u1", &fx.profile_id).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, note_id);
        assert_eq!(notes[0].entry, "revised entry");
        drop(primary);

        let mirror_conn = fx.mirror.lock().unwrap();
        let rows = mirror::candidates_for_user(&mirror_conn, "u1").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entry, "revised entry");
    }

    #[tokio::test]
    async fn empty_entry_gets_zero_embedding() {
        let fx = fixture();

        let ack = submit(
            Arc::clone(&fx.primary),
            Arc::clone(&fx.mirror),
            provider(false),
            Duration::from_secs(5),
            "u1".into(),
            fx.profile_id.clone(),
            vec![],
            vec![note("   ")],
        )
        .await
        .unwrap();

        let primary = fx.primary.lock().unwrap();
        let notes = profiles::list_notes(&primary, "u1", &fx.profile_id).unwrap();
        assert_eq!(notes[0].id, ack.note_ids[0]);
        assert!(notes[0].embedding.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn provider_failure_fails_the_whole_submit() {
        let fx = fixture();

        let err = submit(
            Arc::clone(&fx.primary),
            Arc::clone(&fx.mirror),
            provider(true),
            Duration::from_secs(5),
            "u1".into(),
            fx.profile_id.clone(),
            vec![SubmitCategory {
                id: None,
                name: "Hobbies".into(),
            }],
            vec![note("this will not embed")],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::EmbeddingUnavailable(_)));

        // The failed note never reached either store.
        let primary = fx.primary.lock().unwrap();
        assert!(profiles::list_notes(&primary, "u1", &fx.profile_id)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unknown_profile_is_profile_not_found() {
        let fx = fixture();

        let err = submit(
            Arc::clone(&fx.primary),
            Arc::clone(&fx.mirror),
            provider(false),
            Duration::from_secs(5),
            "u1".into(),
            "no-such-profile".into(),
            vec![],
            vec![note("orphan")],
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::ProfileNotFound(_)));
    }
}
