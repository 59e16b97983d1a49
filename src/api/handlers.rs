use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::{AuthenticatedUser, MaybeUser};
use crate::error::LinkError;
use crate::links::LinkService;
use crate::models::{
    CreateLinkRequest, DeleteResponse, Link, LinkStats, SearchQuery, UpdateLinkRequest,
};

pub struct AppState {
    pub service: Arc<LinkService>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

impl IntoResponse for LinkError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            LinkError::NotFound => (StatusCode::NOT_FOUND, "Link not found".to_string()),
            LinkError::AliasTaken => (StatusCode::BAD_REQUEST, "Alias already exists".to_string()),
            LinkError::Validation(reason) => (StatusCode::UNPROCESSABLE_ENTITY, reason.clone()),
            LinkError::CodeSpaceExhausted { .. } => {
                tracing::error!(error = %self, "short code allocation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate unique short code".to_string(),
                )
            }
            LinkError::Transient(e) => {
                tracing::error!(error = %e, "storage failure while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

fn cache_control(state: &AppState) -> [(header::HeaderName, String); 1] {
    [(
        header::CACHE_CONTROL,
        format!("public, max-age={}", state.service.cache().ttl().as_secs()),
    )]
}

/// Create a new short link
pub async fn shorten_link(
    State(state): State<Arc<AppState>>,
    MaybeUser(user): MaybeUser,
    Json(payload): Json<CreateLinkRequest>,
) -> Result<Json<Link>, LinkError> {
    let owner_id = user.as_ref().map(|u| u.user_id.as_str());
    let link = state.service.create(payload, owner_id).await?;
    Ok(Json(link))
}

/// Find active links pointing at a URL
pub async fn search_links(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Link>>, LinkError> {
    let links = state.service.search(&query.original_url).await?;
    Ok(Json(links))
}

/// Redirect to the destination of a short code
pub async fn redirect_link(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Response, LinkError> {
    let target = state.service.resolve(&code).await?;
    Ok((cache_control(&state), Redirect::temporary(&target)).into_response())
}

pub async fn link_stats(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Response, LinkError> {
    let stats: LinkStats = state.service.stats(&code).await?;
    Ok((cache_control(&state), Json(stats)).into_response())
}

/// Point an owned link at a new URL
pub async fn update_link(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateLinkRequest>,
) -> Result<Json<Link>, LinkError> {
    let link = state
        .service
        .update_url(&code, &user.user_id, &payload.new_url)
        .await?;
    Ok(Json(link))
}

/// Soft-delete an owned link
pub async fn delete_link(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    user: AuthenticatedUser,
) -> Result<Json<DeleteResponse>, LinkError> {
    state.service.delete(&code, &user.user_id).await?;
    Ok(Json(DeleteResponse {
        status: "success".to_string(),
        message: "Link deleted".to_string(),
    }))
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
