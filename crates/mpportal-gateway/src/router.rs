//! Axum router wiring.
//!
//! Exposes the portal callback route plus operational endpoints.

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::{app_state::AppState, ops, transport};

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.cfg().gateway.max_body_bytes;
    Router::new()
        .route(
            "/v1/portal/:app_id",
            get(transport::portal::handshake).post(transport::portal::push),
        )
        .route("/healthz", get(ops::healthz))
        .route("/ping", get(ops::ping))
        .route("/readyz", get(ops::readyz))
        .route("/metrics", get(ops::metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
