use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use crate::server::state::AppState;

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    store: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}

/// 200 while the store answers, 503 otherwise
///
/// GET /health
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = state.services.store.exists("health").await.is_ok();

    let response = HealthResponse {
        status: if store_ok { "healthy" } else { "unhealthy" },
        store: if store_ok { "ok" } else { "error" },
    };

    if store_ok {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
