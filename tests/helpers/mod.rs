#![allow(dead_code)]

use dossier::db;
use dossier::embedding::EmbeddingProvider;
use dossier::notes::ingest::{self, SubmitAck, SubmitNote};
use dossier::notes::profiles;
use dossier::notes::types::Profile;
use dossier::ServiceError;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DIMS: usize = 64;

/// Shared fixture: both in-memory stores plus a deterministic embedder.
pub struct TestStores {
    pub primary: Arc<Mutex<Connection>>,
    pub mirror: Arc<Mutex<Connection>>,
    pub provider: Arc<dyn EmbeddingProvider>,
}

pub fn test_stores() -> TestStores {
    TestStores {
        primary: Arc::new(Mutex::new(db::open_memory_primary().unwrap())),
        mirror: Arc::new(Mutex::new(db::open_memory_mirror().unwrap())),
        provider: Arc::new(StubEmbedder { dims: DIMS }),
    }
}

/// Deterministic token-bag embedder: each lowercase whitespace token adds a
/// spike at an FNV-1a hash position. Identical texts embed identically, texts
/// sharing tokens have positive similarity, and empty text embeds to the zero
/// vector like the real provider.
pub struct StubEmbedder {
    pub dims: usize,
}

impl EmbeddingProvider for StubEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        if text.trim().is_empty() {
            return Ok(vec![0.0; self.dims]);
        }
        let mut v = vec![0.0f32; self.dims];
        for token in text.to_lowercase().split_whitespace() {
            v[(fnv1a(token.as_bytes()) % self.dims as u64) as usize] += 1.0;
        }
        Ok(v)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Generate a deterministic embedding with a spike at position `seed`.
/// Each seed produces a distinct, orthogonal vector.
pub fn test_embedding(seed: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; DIMS];
    v[seed % DIMS] = 1.0;
    v
}

/// Create a profile directly through the lifecycle module.
pub fn create_profile(stores: &TestStores, user_id: &str, name: &str) -> Profile {
    let primary = stores.primary.lock().unwrap();
    let mirror = stores.mirror.lock().unwrap();
    profiles::create_profile(&primary, &mirror, user_id, name, None, String::new(), 5).unwrap()
}

/// Submit a batch of plain-text notes to a profile.
pub async fn submit_entries(
    stores: &TestStores,
    user_id: &str,
    profile_id: &str,
    entries: &[&str],
) -> SubmitAck {
    let notes: Vec<SubmitNote> = entries
        .iter()
        .map(|entry| SubmitNote {
            id: None,
            category_id: None,
            entry: entry.to_string(),
        })
        .collect();

    ingest::submit(
        Arc::clone(&stores.primary),
        Arc::clone(&stores.mirror),
        Arc::clone(&stores.provider),
        Duration::from_secs(5),
        user_id.to_string(),
        profile_id.to_string(),
        Vec::new(),
        notes,
    )
    .await
    .unwrap()
}
