//! Core record type definitions.
//!
//! Defines [`Record`] (the tagged union stored in the primary key-value store),
//! its [`Profile`], [`Category`], and [`Note`] payloads, and [`MemoryRow`] (the
//! mirror projection of a note used by the retrieval path).

use serde::{Deserialize, Serialize};

/// A record in the primary key-value store.
///
/// Profiles, categories, and notes all live under the `user:{u}:profile:`
/// key prefix, so a prefix listing returns them intermixed. The `kind` tag is
/// the explicit discriminant callers match on to pick out one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Profile(Profile),
    Category(Category),
    Note(Note),
}

/// A named profile owned by one user. Display names are not enforced unique
/// per user; name-based lookup treats them as such.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub description: String,
    pub created_at: String,
}

/// A category under a profile. Editing context only; categories carry
/// no semantic content for search and have no mirror projection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub profile_id: String,
    pub name: String,
    pub created_at: String,
}

/// A free-text note attached to a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub profile_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    pub entry: String,
    /// Fixed-length vector, dimensionality set by the embedding provider.
    /// All-zero for empty entries. A note persisted through the ingestion
    /// path always has one.
    pub embedding: Vec<f32>,
    pub created_at: String,
    pub updated_at: String,
}

/// Mirror projection of a [`Note`], keyed for similarity search.
///
/// `id` equals the note id. `profile_name` is denormalized at write time and
/// goes stale if the profile is later renamed. Accepted trade-off.
#[derive(Debug, Clone)]
pub struct MemoryRow {
    pub id: String,
    pub user_id: String,
    pub profile_id: String,
    pub profile_name: String,
    pub entry: String,
    pub embedding: Vec<f32>,
    pub created_at: String,
    pub updated_at: String,
}
