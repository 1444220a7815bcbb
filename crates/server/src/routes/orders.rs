//! Order submission route handler.

use axum::{Json, extract::State, http::HeaderMap};
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::services::PendingOrder;
use crate::state::AppState;

/// Submit a COD order.
///
/// The checkout popup posts from the storefront origin, so the browser IP
/// comes from the proxy headers rather than the socket.
#[instrument(skip(state, headers, body), fields(shop = body.shop.as_deref().unwrap_or("")))]
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<PendingOrder>,
) -> Result<Json<Value>> {
    let client_ip = client_ip(&headers);
    let outcome = state.orders().submit(body, client_ip).await?;

    Ok(Json(json!({
        "success": true,
        "orderId": outcome.order_id,
        "orderNumber": outcome.order_number,
        "orderName": outcome.order_name,
        "redirectUrl": outcome.redirect_url,
    })))
}

/// Resolve the browser IP from forwarding headers.
///
/// `x-forwarded-for` may hold a comma-separated chain; the first entry is
/// the original client.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        let first = forwarded.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return Some(first.to_owned());
        }
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
