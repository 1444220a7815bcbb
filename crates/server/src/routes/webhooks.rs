//! Platform webhook handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::state::AppState;

/// Payload of the app/uninstalled webhook. The platform sends the full shop
/// resource; only the domain matters here.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UninstalledPayload {
    pub domain: Option<String>,
    pub myshopify_domain: Option<String>,
}

/// Mark a shop inactive when the app is uninstalled.
///
/// Shops are never hard-deleted; a reinstall reactivates the same row.
/// Always answers 200 so the platform does not retry the webhook.
#[instrument(skip(state, payload))]
pub async fn app_uninstalled(
    State(state): State<AppState>,
    Json(payload): Json<UninstalledPayload>,
) -> Json<Value> {
    let Some(domain) = payload.myshopify_domain.or(payload.domain) else {
        tracing::warn!("Uninstall webhook without a shop domain");
        return Json(json!({ "success": true }));
    };

    match state.shops().deactivate(&domain).await {
        Ok(()) => tracing::info!(shop = %domain, "Shop deactivated"),
        Err(e) => tracing::error!(shop = %domain, error = %e, "Shop deactivation failed"),
    }

    Json(json!({ "success": true }))
}
