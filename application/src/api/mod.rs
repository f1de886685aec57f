//! HTTP API definitions.

pub mod contract;
pub mod property;

use axum::{
    routing::{get, post},
    Router,
};

/// Returns the [`Router`] serving all the HTTP API endpoints.
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/contracts", post(contract::create))
        .route("/contracts/:id", get(contract::get))
        .route("/contracts/:id/activate", post(contract::activate))
        .route("/contracts/:id/cancel", post(contract::cancel))
        .route("/contracts/:id/reject", post(contract::reject))
        .route("/properties", post(property::create))
        .route(
            "/properties/:id",
            get(property::get).delete(property::delete),
        )
}
