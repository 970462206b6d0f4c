//! Dossier — attach free-text notes to named profiles and get them back by meaning.
//!
//! Notes are embedded into fixed-length vectors at submit time and written to two
//! stores: a key-value primary store (the system of record for the editing UI) and
//! a denormalized mirror optimized for retrieval. A search query is embedded the
//! same way and ranked against stored note vectors by cosine similarity.
//!
//! # Architecture
//!
//! - **Storage**: two SQLite databases — a namespaced `kv` table as the primary
//!   store, and a `memories` projection (note text + embedding, denormalized
//!   profile name) as the search mirror. There is no cross-store transaction;
//!   the ingestion and delete paths keep the two reconciled best-effort.
//! - **Embeddings**: remote OpenAI-compatible embedding API (768 dimensions by
//!   default). Empty text embeds to the zero vector without a remote call.
//! - **Search**: in-process cosine ranking over mirror candidates, stable
//!   descending sort, top 10.
//! - **Transport**: JSON over HTTP (axum), bearer-token authenticated.
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`auth`] — Token verification seam (authentication is an external collaborator)
//! - [`db`] — SQLite initialization and schema for both stores
//! - [`embedding`] — Text-to-vector embedding via a remote provider
//! - [`notes`] — Core engine: records, key-value access, mirror, ingestion,
//!   resolution, and search
//! - [`server`] — HTTP surface exposing the service operations

pub mod auth;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod notes;
pub mod server;

pub use error::ServiceError;
