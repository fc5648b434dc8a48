//! Endpoints API REST pour la lecture audio Bilibili
//!
//! Ce module définit les handlers HTTP du cœur du lecteur : résolution de
//! manifeste (`/audio/url`), liste des parties (`/audio/parts`) et relais
//! d'octets avec support Range (`/play/url`).

use crate::client::BiliClient;
use crate::error::BiliError;
use crate::models::{DashAudio, Manifest, VideoPart};
use crate::relay::StreamRelay;
use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

/// État partagé de l'application
#[derive(Clone)]
pub struct BiliState {
    pub client: Arc<BiliClient>,
    pub relay: Arc<StreamRelay>,
}

/// Paramètres de /audio/url
#[derive(Debug, Deserialize)]
pub struct AudioUrlParams {
    /// Identifiant du contenu
    pub avid: Option<u64>,
    /// Identifiant de la partie
    pub cid: Option<u64>,
}

/// Paramètres de /audio/parts
#[derive(Debug, Deserialize)]
pub struct PartsParams {
    pub avid: Option<u64>,
}

/// Paramètres de /play/url
#[derive(Debug, Deserialize)]
pub struct PlayParams {
    /// URL média upstream précédemment résolue
    pub url: Option<String>,
}

/// Enveloppe de réponse au format de l'upstream
#[derive(Debug, Serialize)]
pub struct ApiEnvelope<T> {
    pub code: i64,
    pub message: String,
    pub ttl: i64,
    pub data: T,
}

impl<T> ApiEnvelope<T> {
    fn ok(data: T) -> Self {
        Self {
            code: 0,
            message: "0".to_string(),
            ttl: 1,
            data,
        }
    }
}

/// Crée le router Axum avec les endpoints audio
pub fn create_router(state: BiliState) -> Router {
    Router::new()
        .route("/audio/url", get(get_audio_url))
        .route("/audio/parts", get(get_audio_parts))
        .route("/play/url", get(relay_stream))
        .with_state(state)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /audio/url?avid=..&cid=..
/// Resolves the DASH manifest and returns the audio track list
async fn get_audio_url(
    State(state): State<BiliState>,
    Query(params): Query<AudioUrlParams>,
) -> Result<Json<ApiEnvelope<Vec<DashAudio>>>, ApiError> {
    let avid = params.avid.ok_or(BiliError::MissingParameter("avid"))?;
    let cid = params.cid.ok_or(BiliError::MissingParameter("cid"))?;

    match state.client.resolve_manifest(avid, cid).await? {
        Manifest::PreviewOnly => Err(BiliError::PreviewOnly.into()),
        Manifest::Audio(entries) => Ok(Json(ApiEnvelope::ok(entries))),
    }
}

/// GET /audio/parts?avid=..
/// Returns the playable parts of a content item
async fn get_audio_parts(
    State(state): State<BiliState>,
    Query(params): Query<PartsParams>,
) -> Result<Json<ApiEnvelope<Vec<VideoPart>>>, ApiError> {
    let avid = params.avid.ok_or(BiliError::MissingParameter("avid"))?;

    let parts = state.client.get_parts(avid).await?;
    Ok(Json(ApiEnvelope::ok(parts)))
}

/// GET /play/url?url=..
/// Relays the audio bytes from the resolved media URL (Range passthrough)
async fn relay_stream(
    State(state): State<BiliState>,
    Query(params): Query<PlayParams>,
    headers: HeaderMap,
) -> Result<Response, RelayError> {
    let url = params.url.ok_or(BiliError::MissingParameter("url"))?;

    let range = headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok());

    let relayed = state.relay.fetch(&url, range).await?;

    let status = if relayed.partial {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, relayed.content_type.as_str());

    if let Some(value) = &relayed.content_length {
        builder = builder.header(header::CONTENT_LENGTH, value.as_str());
    }
    if let Some(value) = &relayed.content_range {
        builder = builder.header(header::CONTENT_RANGE, value.as_str());
    }
    if let Some(value) = &relayed.accept_ranges {
        builder = builder.header(header::ACCEPT_RANGES, value.as_str());
    }

    Ok(builder.body(Body::from_stream(relayed.stream)).unwrap())
}

// ============ Gestion des erreurs ============

/// Erreur des endpoints de résolution, au format enveloppe `{code, message}`
struct ApiError(BiliError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            BiliError::PreviewOnly => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Les détails upstream restent côté serveur ; le client reçoit un
        // message opaque pour les erreurs non imputables à sa requête.
        let message = match &self.0 {
            e if e.is_client_error() || e.is_preview_only() => e.to_string(),
            e => {
                warn!("audio API error: {}", e);
                "stream resolution failed".to_string()
            }
        };

        let body = Json(serde_json::json!({
            "code": status.as_u16(),
            "message": message
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for ApiError
where
    E: Into<BiliError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Erreur du relais, au format `{ "error": .. }`
struct RelayError(BiliError);

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            e if e.is_client_error() => (StatusCode::BAD_REQUEST, e.to_string()),
            e => {
                warn!("relay error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "failed to fetch upstream audio".to_string(),
                )
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl<E> From<E> for RelayError
where
    E: Into<BiliError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
