// Late Show API - HTTP routes
//
// Handlers lock the shared connection, call the store or projection layer,
// and map the outcome to a status code plus JSON body.

use crate::db;
use crate::error::StoreError;
use crate::projection;
use crate::schema::validate_new_appearance;
use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    /// A panicking handler poisons the mutex; any transaction it held was
    /// rolled back on unwind, so the connection is still usable.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.db.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("database mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    /// 404 `{error}` for a path id with no row
    NotFound(String),
    /// 400 `{errors: [...]}`
    Validation(Vec<String>),
    /// 404 `{errors: [...]}` for a body id with no row
    MissingReference(String),
    /// 500 `{error}`; detail is logged, never returned
    Internal(&'static str),
}

impl ApiError {
    fn resource_not_found() -> Self {
        ApiError::NotFound("Resource not found".to_string())
    }

    /// Log a store failure and hide it behind a generic message
    fn internal(message: &'static str) -> impl FnOnce(StoreError) -> ApiError {
        move |err| {
            error!(error = %err, "{}", message);
            ApiError::Internal(message)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
            }
            ApiError::Validation(errors) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors })))
            }
            ApiError::MissingReference(message) => {
                (StatusCode::NOT_FOUND, Json(json!({ "errors": [message] })))
            }
            ApiError::Internal(message) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": message })))
            }
        }
        .into_response()
    }
}

/// `/episodes/abc` is an unknown route, not a bad request
fn path_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id).map_err(|_| ApiError::resource_not_found())
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET / - API information
async fn home() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to Late Show API",
        "endpoints": {
            "GET /episodes": "List all episodes",
            "GET /episodes/<id>": "Get episode details",
            "DELETE /episodes/<id>": "Delete an episode",
            "GET /guests": "List all guests",
            "GET /appearances": "List all appearances",
            "POST /appearances": "Create a new appearance"
        }
    }))
}

/// GET /episodes - flat episodes ordered by number
async fn list_episodes(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let conn = state.conn();

    let episodes =
        db::list_episodes(&conn).map_err(ApiError::internal("Failed to fetch episodes"))?;

    Ok(Json(episodes))
}

/// GET /episodes/:id - episode with its appearances and their guests
async fn get_episode(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let id = path_id(path)?;
    let conn = state.conn();

    let detail = projection::load_episode_detail(&conn, id)
        .map_err(ApiError::internal("Failed to fetch episode"))?;

    detail
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Episode not found".to_string()))
}

/// DELETE /episodes/:id - episode and its appearances
async fn delete_episode(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = path_id(path)?;
    let mut conn = state.conn();

    match db::delete_episode(&mut conn, id) {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(err) if err.is_not_found() => Err(ApiError::NotFound(err.to_string())),
        Err(err) => Err(ApiError::internal("Failed to delete episode")(err)),
    }
}

/// GET /guests - flat guests ordered by name
async fn list_guests(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let conn = state.conn();

    let guests = db::list_guests(&conn).map_err(ApiError::internal("Failed to fetch guests"))?;

    Ok(Json(guests))
}

/// GET /appearances - every appearance with both parents
async fn list_appearances(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let conn = state.conn();

    let appearances = projection::load_appearance_listing(&conn)
        .map_err(ApiError::internal("Failed to fetch appearances"))?;

    Ok(Json(appearances))
}

/// POST /appearances - link a guest to an episode with a rating
async fn create_appearance(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    // Unparseable JSON is treated the same as an empty body
    let payload: Option<Value> = serde_json::from_slice(&body).ok();

    let new = validate_new_appearance(payload.as_ref()).map_err(|errors| {
        ApiError::Validation(errors.into_iter().map(|e| e.message).collect())
    })?;

    let mut conn = state.conn();

    let (episode_id, guest_id) = resolve_references(&conn, new.episode_id, new.guest_id)?;

    let rating = i64::from(new.rating.get());
    let appearance =
        db::create_appearance(&mut conn, rating, episode_id, guest_id).map_err(|err| match err {
            StoreError::EpisodeNotFound { .. } | StoreError::GuestNotFound { .. } => {
                ApiError::MissingReference(err.to_string())
            }
            StoreError::InvalidRating(e) => ApiError::Validation(vec![e.to_string()]),
            StoreError::Database(_) => ApiError::internal("Failed to create appearance")(err),
        })?;

    let detail = projection::load_appearance_detail(&conn, &appearance)
        .map_err(ApiError::internal("Failed to fetch created appearance"))?
        .ok_or(ApiError::Internal("Failed to fetch created appearance"))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

/// A body id that is not an integer matches no row. Report it the way the
/// store reports a missing row, keeping the episode-first order.
fn resolve_references(
    conn: &Connection,
    episode_id: Option<i64>,
    guest_id: Option<i64>,
) -> Result<(i64, i64), ApiError> {
    let episode_not_found = || ApiError::MissingReference("Episode not found".to_string());

    let episode_id = episode_id.ok_or_else(episode_not_found)?;
    match guest_id {
        Some(guest_id) => Ok((episode_id, guest_id)),
        None => {
            let episode = db::get_episode(conn, episode_id)
                .map_err(ApiError::internal("Failed to create appearance"))?;
            if episode.is_none() {
                return Err(episode_not_found());
            }
            Err(ApiError::MissingReference("Guest not found".to_string()))
        }
    }
}

/// Fallback for unmatched routes
async fn resource_not_found() -> ApiError {
    ApiError::resource_not_found()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic payload");

    error!(panic = detail, "request handler panicked");
    ApiError::Internal("Internal server error").into_response()
}

// ============================================================================
// Router
// ============================================================================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/episodes", get(list_episodes))
        .route("/episodes/:id", get(get_episode).delete(delete_episode))
        .route("/guests", get(list_guests))
        .route("/appearances", get(list_appearances).post(create_appearance))
        .fallback(resource_not_found)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
