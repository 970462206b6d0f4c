//! HTTP server wiring and the JSON API surface.
//!
//! Handlers are thin: verify the bearer token, validate, call into [`crate::notes`]
//! on a blocking task, serialize the result. No retrieval or consistency logic
//! lives here.

use anyhow::Result;
use axum::extract::{FromRequestParts, Path, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::Connection;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::auth::{StaticTokenVerifier, TokenVerifier};
use crate::config::DossierConfig;
use crate::db;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::ServiceError;
use crate::notes::ingest::{self, SubmitAck, SubmitCategory, SubmitNote};
use crate::notes::lock_conn;
use crate::notes::profiles::{self, DeleteOutcome};
use crate::notes::resolve::ProfileScope;
use crate::notes::search::{self, SearchResponse};
use crate::notes::types::{Category, Note, Profile};

#[derive(Clone)]
pub struct AppState {
    primary: Arc<Mutex<Connection>>,
    mirror: Arc<Mutex<Connection>>,
    embedding: Arc<dyn EmbeddingProvider>,
    verifier: Arc<dyn TokenVerifier>,
    config: Arc<DossierConfig>,
}

/// Shared setup: open both stores, create the embedding provider and token
/// verifier.
fn setup_shared_state(config: DossierConfig) -> Result<AppState> {
    let primary = db::open_primary(config.resolved_primary_path())?;
    let mirror = db::open_mirror(config.resolved_mirror_path())?;
    tracing::info!("stores ready");

    let provider = embedding::create_provider(&config.embedding)?;
    tracing::info!(provider = %config.embedding.provider, "embedding provider ready");

    let verifier = StaticTokenVerifier::new(&config.auth);

    Ok(AppState {
        primary: Arc::new(Mutex::new(primary)),
        mirror: Arc::new(Mutex::new(mirror)),
        embedding: Arc::from(provider),
        verifier: Arc::new(verifier),
        config: Arc::new(config),
    })
}

/// Start the HTTP server.
pub async fn serve(config: DossierConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!(addr = %bind_addr, "starting dossier server");

    let state = setup_shared_state(config)?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "listening at http://{bind_addr}/api");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to listen for ctrl-c");
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/profiles", post(create_profile).get(list_profiles))
        .route("/api/profiles/{profile_id}", axum::routing::delete(delete_profile))
        .route("/api/profiles/{profile_id}/categories", get(list_categories))
        .route("/api/profiles/{profile_id}/notes", get(list_notes))
        .route("/api/profiles/{profile_id}/submit", post(submit))
        .route(
            "/api/profiles/{profile_id}/notes/{note_id}",
            axum::routing::delete(delete_note),
        )
        .route("/api/search", post(search_notes))
        .with_state(state)
}

// ── Authentication ────────────────────────────────────────────────────────────

/// The authenticated user id, extracted from the `Authorization: Bearer` header
/// before any store access.
struct AuthUser(String);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ServiceError::Unauthorized)?;

        let user_id = state.verifier.verify(token)?;
        Ok(AuthUser(user_id))
    }
}

// ── Request bodies ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CreateProfileRequest {
    name: String,
    avatar: Option<String>,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct SubmitRequest {
    #[serde(default)]
    categories: Vec<SubmitCategory>,
    #[serde(default)]
    notes: Vec<SubmitNote>,
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    query: String,
    profile_id: Option<String>,
    profile_name: Option<String>,
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn create_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CreateProfileRequest>,
) -> Result<Json<Profile>, ServiceError> {
    let limit = state.config.retrieval.profile_limit;
    let profile = tokio::task::spawn_blocking(move || {
        let primary = lock_conn(&state.primary)?;
        let mirror = lock_conn(&state.mirror)?;
        profiles::create_profile(
            &primary,
            &mirror,
            &user_id,
            &req.name,
            req.avatar,
            req.description,
            limit,
        )
    })
    .await
    .map_err(|e| ServiceError::StoreUnavailable(format!("task failed: {e}")))??;

    Ok(Json(profile))
}

async fn list_profiles(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Profile>>, ServiceError> {
    let result = tokio::task::spawn_blocking(move || {
        let primary = lock_conn(&state.primary)?;
        profiles::list_profiles(&primary, &user_id)
    })
    .await
    .map_err(|e| ServiceError::StoreUnavailable(format!("task failed: {e}")))??;

    Ok(Json(result))
}

async fn delete_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(profile_id): Path<String>,
) -> Result<Json<DeleteOutcome>, ServiceError> {
    let outcome = tokio::task::spawn_blocking(move || {
        let mut primary = lock_conn(&state.primary)?;
        let mirror = lock_conn(&state.mirror)?;
        profiles::delete_profile(&mut primary, &mirror, &user_id, &profile_id)
    })
    .await
    .map_err(|e| ServiceError::StoreUnavailable(format!("task failed: {e}")))??;

    Ok(Json(outcome))
}

async fn list_categories(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(profile_id): Path<String>,
) -> Result<Json<Vec<Category>>, ServiceError> {
    let result = tokio::task::spawn_blocking(move || {
        let primary = lock_conn(&state.primary)?;
        profiles::list_categories(&primary, &user_id, &profile_id)
    })
    .await
    .map_err(|e| ServiceError::StoreUnavailable(format!("task failed: {e}")))??;

    Ok(Json(result))
}

async fn list_notes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(profile_id): Path<String>,
) -> Result<Json<Vec<Note>>, ServiceError> {
    let result = tokio::task::spawn_blocking(move || {
        let primary = lock_conn(&state.primary)?;
        profiles::list_notes(&primary, &user_id, &profile_id)
    })
    .await
    .map_err(|e| ServiceError::StoreUnavailable(format!("task failed: {e}")))??;

    Ok(Json(result))
}

async fn submit(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(profile_id): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitAck>, ServiceError> {
    let ack = ingest::submit(
        Arc::clone(&state.primary),
        Arc::clone(&state.mirror),
        Arc::clone(&state.embedding),
        embed_timeout(&state),
        user_id,
        profile_id,
        req.categories,
        req.notes,
    )
    .await?;

    Ok(Json(ack))
}

async fn delete_note(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((profile_id, note_id)): Path<(String, String)>,
) -> Result<Json<DeleteOutcome>, ServiceError> {
    let outcome = tokio::task::spawn_blocking(move || {
        let primary = lock_conn(&state.primary)?;
        let mirror = lock_conn(&state.mirror)?;
        profiles::delete_note(&primary, &mirror, &user_id, &profile_id, &note_id)
    })
    .await
    .map_err(|e| ServiceError::StoreUnavailable(format!("task failed: {e}")))??;

    Ok(Json(outcome))
}

async fn search_notes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ServiceError> {
    // An id scope wins over a name scope when both are supplied.
    let scope = match (req.profile_id, req.profile_name) {
        (Some(id), _) => Some(ProfileScope::Id(id)),
        (None, Some(name)) => Some(ProfileScope::Name(name)),
        (None, None) => None,
    };

    let response = search::search(
        Arc::clone(&state.primary),
        Arc::clone(&state.mirror),
        Arc::clone(&state.embedding),
        embed_timeout(&state),
        state.config.retrieval.max_results,
        user_id,
        req.query,
        scope,
    )
    .await?;

    Ok(Json(response))
}

fn embed_timeout(state: &AppState) -> Duration {
    Duration::from_millis(state.config.embedding.timeout_ms)
}
