pub mod ingest;
pub mod kv;
pub mod mirror;
pub mod profiles;
pub mod resolve;
pub mod search;
pub mod types;

use rusqlite::Connection;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::ServiceError;

/// Lock a shared store connection, mapping a poisoned mutex to
/// [`ServiceError::StoreUnavailable`].
pub(crate) fn lock_conn(
    conn: &Arc<Mutex<Connection>>,
) -> Result<MutexGuard<'_, Connection>, ServiceError> {
    conn.lock()
        .map_err(|e| ServiceError::StoreUnavailable(format!("store lock poisoned: {e}")))
}

/// Encode an f32 embedding as little-endian bytes for BLOB storage.
pub fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Decode a BLOB back into an f32 embedding. Trailing partial chunks are
/// dropped, so a truncated blob yields a shorter vector rather than garbage.
pub fn bytes_to_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_bytes_roundtrip() {
        let v = vec![0.0f32, 1.0, -2.5, 3.25];
        assert_eq!(bytes_to_embedding(&embedding_to_bytes(&v)), v);
    }

    #[test]
    fn truncated_blob_drops_partial_chunk() {
        let mut bytes = embedding_to_bytes(&[1.0f32, 2.0]);
        bytes.pop();
        assert_eq!(bytes_to_embedding(&bytes).len(), 1);
    }
}
