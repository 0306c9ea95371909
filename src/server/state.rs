use super::error::ApiError;
use crate::services::Services;
use crate::session::SessionData;
use crate::social::InstagramClient;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::sync::Arc;

/// Shared application state accessible from all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub services: Arc<Services>,
}

impl AppState {
    pub fn new(services: Services) -> Self {
        Self {
            services: Arc::new(services),
        }
    }
}

/// Session id from the session cookie, or from `Authorization: Bearer`
pub fn session_id(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let from_cookie = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, id)| id.to_string());

    from_cookie.or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|id| id.trim().to_string())
    })
}

/// A request carrying a live session, with a client bound to its token
pub struct Authenticated {
    pub session_id: String,
    pub session: SessionData,
    pub client: InstagramClient,
}

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let services = &state.services;
        let session_id = session_id(&parts.headers, &services.settings.session.cookie_name)
            .ok_or_else(|| ApiError::unauthorized("not logged in"))?;

        let session = services
            .sessions
            .get(&session_id)
            .await?
            .ok_or_else(|| ApiError::unauthorized("session expired"))?;
        services.sessions.extend(&session_id).await?;

        Ok(Self {
            client: services.graph.client(session.access_token.clone()),
            session_id,
            session,
        })
    }
}
