//! Phone verification route handlers.

use axum::{Json, extract::State};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::instrument;

use crate::error::Result;
use crate::state::AppState;

/// Body of a code request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestCodeBody {
    pub phone_number: Option<String>,
}

/// Body of a code confirmation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyCodeBody {
    pub phone_number: Option<String>,
    pub code: Option<String>,
}

/// Issue a one-time code and deliver it to the phone.
#[instrument(skip(state, body))]
pub async fn request_code(
    State(state): State<AppState>,
    Json(body): Json<RequestCodeBody>,
) -> Result<Json<Value>> {
    let phone = body.phone_number.unwrap_or_default();
    let issued = state.verification().request_code(&phone).await?;

    Ok(Json(json!({
        "success": true,
        "expiresInSeconds": issued.expires_in_seconds,
    })))
}

/// Confirm a submitted code.
#[instrument(skip(state, body))]
pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeBody>,
) -> Result<Json<Value>> {
    let phone = body.phone_number.unwrap_or_default();
    let code = body.code.unwrap_or_default();
    let verified_phone = state.verification().verify_code(&phone, &code).await?;

    Ok(Json(json!({
        "success": true,
        "verified": true,
        "phoneNumber": verified_phone.as_str(),
    })))
}
