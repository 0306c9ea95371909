use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};

use crate::replies::Suggestion;
use crate::server::error::ApiResult;
use crate::server::state::{AppState, Authenticated};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comment/{id}", post(for_comment))
        .route("/message/{id}", post(for_message))
}

/// POST /replies/comment/{id}
async fn for_comment(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(comment_id): Path<String>,
) -> ApiResult<Json<Suggestion>> {
    let suggestion = state
        .services
        .replies
        .suggest_for_comment(&auth.client, &comment_id)
        .await?;
    Ok(Json(suggestion))
}

/// POST /replies/message/{id}
async fn for_message(
    State(state): State<AppState>,
    auth: Authenticated,
    Path(message_id): Path<String>,
) -> ApiResult<Json<Suggestion>> {
    let suggestion = state
        .services
        .replies
        .suggest_for_message(&auth.client, &message_id)
        .await?;
    Ok(Json(suggestion))
}
