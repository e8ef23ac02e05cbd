//! HTTP surface over the store and the payout engine

pub mod error;
pub mod routes;

pub use error::ApiError;

use crate::{middleware::request_logging, store::Store};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
}

/// Create the API router
pub fn router(store: Arc<Store>) -> Router {
    let state = AppState { store };

    Router::new()
        .route("/", get(routes::greeting))
        .route("/health", get(routes::health_check))
        .route("/status", get(routes::status))
        .route("/players", post(routes::create_player))
        .route("/players/:puuid", get(routes::get_player))
        .route("/circles", post(routes::create_circle))
        .route("/circles/:cuuid/joined", get(routes::list_joined))
        .route("/spaces", post(routes::create_space))
        .route("/spaces/:suuid", get(routes::get_space))
        .route("/spaces/:suuid/models", get(routes::list_models))
        .route("/spaces/:suuid/payouts", get(routes::list_payouts))
        .route("/calculate", post(routes::calculate_payouts))
        .route("/submit", post(routes::submit_model))
        .route("/join", post(routes::join))
        .route("/leave", post(routes::leave))
        .route("/random", post(routes::add_random))
        .route("/delete", post(routes::delete_model))
        .layer(middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
