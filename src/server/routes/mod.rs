pub mod analysis;
pub mod auth;
pub mod health;
pub mod inbox;
pub mod replies;

use axum::Router;

use super::state::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(analysis::router())
        .merge(inbox::router())
        .nest("/auth", auth::router())
        .nest("/replies", replies::router())
}
