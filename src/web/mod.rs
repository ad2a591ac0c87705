pub mod auth;
pub mod bookings;
pub mod consultants;
pub mod dashboard;
pub mod hr;
pub mod notifications;
pub mod session;
pub mod stress;
pub mod tasks;

use crate::state::SharedState;
use axum::{routing::get, Router};

async fn health() -> &'static str {
    "OK"
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router(state.clone()))
        .nest("/stress", stress::router(state.clone()))
        .nest("/consultants", consultants::router(state.clone()))
        .nest("/bookings", bookings::router(state.clone()))
        .nest("/tasks", tasks::router(state.clone()))
        .nest("/notifications", notifications::router(state.clone()))
        .nest("/dashboard", dashboard::router(state.clone()))
        .nest("/hr", hr::router(state))
}
