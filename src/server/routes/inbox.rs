use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::novelty::{poll_comments, poll_messages, Flagged};
use crate::replies::ReplyTarget;
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::{AppState, Authenticated};
use crate::social::{comment_info, CommentInfo, SendMessageResponse};

#[derive(Debug, Default, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub only_new: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentItem {
    #[serde(flatten)]
    pub comment: CommentInfo,
    pub is_new: bool,
}

#[derive(Debug, Serialize)]
pub struct MessageItem {
    pub id: String,
    pub text: String,
    pub sender_id: String,
    pub sender: String,
    pub created_time: String,
    pub is_new: bool,
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub recipient_id: Option<String>,
    pub comment_id: Option<String>,
    pub text: String,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/comments", get(comments))
        .route("/messages", get(messages))
        .route("/messages/send", post(send))
}

fn keep(flagged: Vec<Flagged>, only_new: bool) -> Vec<Flagged> {
    flagged
        .into_iter()
        .filter(|f| f.is_new || !only_new)
        .collect()
}

/// GET /comments?only_new=true
async fn comments(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<InboxQuery>,
) -> ApiResult<Json<Vec<CommentItem>>> {
    let flagged = keep(
        poll_comments(&auth.client, &state.services.novelty).await?,
        query.only_new,
    );

    let items = try_join_all(flagged.into_iter().map(|f| {
        let client = &auth.client;
        async move {
            let comment = comment_info(client, &f.id).await?;
            Ok::<_, crate::Error>(CommentItem {
                comment,
                is_new: f.is_new,
            })
        }
    }))
    .await?;

    Ok(Json(items))
}

/// GET /messages?only_new=true
async fn messages(
    State(state): State<AppState>,
    auth: Authenticated,
    Query(query): Query<InboxQuery>,
) -> ApiResult<Json<Vec<MessageItem>>> {
    let items = poll_messages(&auth.client, &state.services.novelty)
        .await?
        .into_iter()
        .filter(|(flag, _)| flag.is_new || !query.only_new)
        .map(|(flag, message)| MessageItem {
            sender: message.from.display_name().to_string(),
            sender_id: message.from.id,
            id: message.id,
            text: message.message,
            created_time: message.created_time,
            is_new: flag.is_new,
        })
        .collect();

    Ok(Json(items))
}

/// Exactly one of `recipient_id` or `comment_id`
///
/// POST /messages/send
async fn send(
    State(state): State<AppState>,
    auth: Authenticated,
    Json(request): Json<SendRequest>,
) -> ApiResult<Json<SendMessageResponse>> {
    let target = match (request.recipient_id, request.comment_id) {
        (Some(user), None) => ReplyTarget::User(user),
        (None, Some(comment)) => ReplyTarget::Comment(comment),
        _ => {
            return Err(ApiError::bad_request(
                "exactly one of recipient_id or comment_id is required",
            ))
        }
    };

    let response = state
        .services
        .replies
        .send_reply(&auth.client, &target, &request.text)
        .await?;
    Ok(Json(response))
}
