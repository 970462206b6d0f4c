//! Similarity search: embed the query, rank candidate notes by cosine
//! similarity, return the top matches.
//!
//! The ranking is deliberately boring: a stable descending sort over
//! in-process cosine scores. Ties keep their original candidate order, a
//! degenerate (zero or wrong-length) vector scores 0 instead of failing, and
//! an empty candidate set is a result, not an error.

use rusqlite::Connection;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::embedding::EmbeddingProvider;
use crate::error::ServiceError;
use crate::notes::resolve::{self, ProfileScope};
use crate::notes::types::MemoryRow;
use crate::notes::{lock_conn, mirror};

// ── Public types ──────────────────────────────────────────────────────────────

/// A single ranked search result.
#[derive(Debug, Clone, Serialize)]
pub struct RankedNote {
    pub id: String,
    pub entry: String,
    pub profile_id: String,
    /// Cosine similarity rendered as a percentage, e.g. `"87.3%"`.
    pub similarity: String,
    /// Convenience link: a web search over the entry text.
    pub search_url: String,
}

/// Response from a search call.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<RankedNote>,
    pub total_candidates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Full search path: resolve scope → collect candidates → embed query → rank.
///
/// Candidates come from the mirror. Rows left stale by a failed best-effort
/// delete are accepted for the documented staleness window rather than
/// re-checked against the primary store per query.
pub async fn search(
    primary: Arc<Mutex<Connection>>,
    mirror: Arc<Mutex<Connection>>,
    provider: Arc<dyn EmbeddingProvider>,
    embed_timeout: Duration,
    max_results: usize,
    user_id: String,
    query: String,
    scope: Option<ProfileScope>,
) -> Result<SearchResponse, ServiceError> {
    // 1. Resolve the optional profile scope.
    let profile_id = match scope {
        Some(scope) => {
            let primary = Arc::clone(&primary);
            let user = user_id.clone();
            Some(
                tokio::task::spawn_blocking(move || {
                    let conn = lock_conn(&primary)?;
                    resolve::resolve(&conn, &user, &scope)
                })
                .await
                .map_err(|e| ServiceError::StoreUnavailable(format!("resolve task failed: {e}")))??,
            )
        }
        None => None,
    };

    // 2. Collect candidates in insertion order.
    let candidates = {
        let mirror = Arc::clone(&mirror);
        let user = user_id.clone();
        tokio::task::spawn_blocking(move || {
            let conn = lock_conn(&mirror)?;
            match &profile_id {
                Some(pid) => mirror::candidates_for_profile(&conn, &user, pid),
                None => mirror::candidates_for_user(&conn, &user),
            }
        })
        .await
        .map_err(|e| ServiceError::StoreUnavailable(format!("candidate task failed: {e}")))??
    };

    if candidates.is_empty() {
        return Ok(SearchResponse {
            results: Vec::new(),
            total_candidates: 0,
            message: Some("no notes to search in this scope".into()),
        });
    }

    // 3. Embed the query. Empty queries become the zero vector inside the
    //    provider and score 0 against everything.
    let query_embedding = {
        let provider = Arc::clone(&provider);
        tokio::time::timeout(
            embed_timeout,
            tokio::task::spawn_blocking(move || provider.embed(&query)),
        )
        .await
        .map_err(|_| ServiceError::Timeout(embed_timeout))?
        .map_err(|e| ServiceError::EmbeddingUnavailable(format!("embed task failed: {e}")))??
    };

    // 4–6. Score, sort, truncate, decorate.
    let total_candidates = candidates.len();
    let results = rank(&candidates, &query_embedding, max_results);

    tracing::debug!(
        user = %user_id,
        candidates = total_candidates,
        returned = results.len(),
        "search ranked"
    );

    Ok(SearchResponse {
        results,
        total_candidates,
        message: None,
    })
}

/// Rank candidates by cosine similarity to the query embedding.
///
/// The sort is stable and the input order is the insertion order, so notes
/// with identical scores come back in the order they were stored. Output is
/// truncated to `limit`.
pub fn rank(candidates: &[MemoryRow], query: &[f32], limit: usize) -> Vec<RankedNote> {
    let mut scored: Vec<(&MemoryRow, f64)> = candidates
        .iter()
        .map(|row| (row, cosine_similarity(query, &row.embedding)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(limit);

    scored
        .into_iter()
        .map(|(row, score)| RankedNote {
            id: row.id.clone(),
            entry: row.entry.clone(),
            profile_id: row.profile_id.clone(),
            similarity: format!("{:.1}%", score * 100.0),
            search_url: external_search_url(&row.entry),
        })
        .collect()
}

/// Cosine similarity in `[-1, 1]`.
///
/// Returns exactly 0 when the lengths differ or either vector has zero
/// magnitude: never NaN, never an error. A note embedded under a previous
/// provider dimensionality scores 0 instead of aborting the whole search.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Build the convenience web-search link for an entry.
fn external_search_url(entry: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(entry.as_bytes()).collect();
    format!("https://duckduckgo.com/?q={encoded}")
}
