use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::server::error::{ApiError, ApiResult};
use crate::server::state::{AppState, Authenticated};
use crate::session::SessionData;
use crate::social::SocialApi;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub user_id: String,
    pub username: String,
    pub account_type: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/session", post(login).get(current).delete(logout))
}

fn cookie(name: &str, value: &str, max_age: u64) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, value, max_age
    ))
    .map_err(|e| ApiError::internal(format!("invalid cookie: {}", e)))
}

/// Register a long-lived Instagram token and open a session for it
///
/// POST /auth/session
async fn login(State(state): State<AppState>, Json(request): Json<LoginRequest>) -> ApiResult<impl IntoResponse> {
    let token = request.access_token.trim();
    if token.is_empty() {
        return Err(ApiError::bad_request("access_token is required"));
    }

    let services = &state.services;
    let profile = services.graph.client(token).me().await.map_err(|e| match e {
        Error::UpstreamFetchFailed { reason, .. } => {
            tracing::warn!("[Server] Access token rejected: {}", reason);
            ApiError::unauthorized("access token rejected by Instagram")
        }
        other => other.into(),
    })?;

    let data = SessionData {
        user_id: profile.user_id,
        username: profile.username,
        access_token: token.to_string(),
        account_type: profile.account_type,
    };
    let session_id = services.sessions.create(&data).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        cookie(
            &services.settings.session.cookie_name,
            &session_id,
            services.settings.session.ttl_secs,
        )?,
    );

    Ok((
        headers,
        Json(SessionResponse {
            session_id,
            user_id: data.user_id,
            username: data.username,
            account_type: data.account_type,
        }),
    ))
}

/// GET /auth/session
async fn current(auth: Authenticated) -> Json<SessionResponse> {
    Json(SessionResponse {
        session_id: auth.session_id,
        user_id: auth.session.user_id,
        username: auth.session.username,
        account_type: auth.session.account_type,
    })
}

/// DELETE /auth/session
async fn logout(State(state): State<AppState>, auth: Authenticated) -> ApiResult<impl IntoResponse> {
    let services = &state.services;
    services.sessions.delete(&auth.session_id).await?;

    let mut headers = HeaderMap::new();
    headers.insert(
        SET_COOKIE,
        cookie(&services.settings.session.cookie_name, "", 0)?,
    );
    Ok((StatusCode::NO_CONTENT, headers))
}
