//! HTTP route handlers for the gateway.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                      - Liveness check
//! GET  /health/ready                - Readiness check (database)
//!
//! # Verification
//! POST /verification/codes          - Issue and deliver a one-time code
//! POST /verification/codes/verify   - Confirm a code
//!
//! # Orders
//! POST /orders                      - Submit a COD order
//!
//! # Webhooks
//! POST /webhooks/app/uninstalled    - Deactivate a shop
//! ```

pub mod orders;
pub mod verification;
pub mod webhooks;

use axum::{Router, routing::post};

use crate::state::AppState;

/// Build the application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/verification/codes", post(verification::request_code))
        .route(
            "/verification/codes/verify",
            post(verification::verify_code),
        )
        .route("/orders", post(orders::submit))
        .route("/webhooks/app/uninstalled", post(webhooks::app_uninstalled))
}
