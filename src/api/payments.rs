//! Payment endpoints under `/payment`.

use super::{ApiJson, ApiResult, AppState, AuthUser, ok};
use crate::{core::payment, errors::Error};
use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Intent request body.
#[derive(Debug, Deserialize)]
pub struct IntentRequest {
    pub order_id: i64,
}

/// Verification request body.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub intent_id: String,
}

/// `POST /payment/intent`
pub async fn create_intent(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<IntentRequest>,
) -> ApiResult<payment::CheckoutIntent> {
    let checkout = payment::create_order_payment(
        &state.db,
        state.gateway.as_ref(),
        &auth.user,
        body.order_id,
        &state.settings.currency,
    )
    .await?;
    Ok(ok(checkout))
}

/// `POST /payment/verify`
pub async fn verify(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<VerifyRequest>,
) -> ApiResult<payment::PaymentResult> {
    let result = payment::verify_payment(
        &state.db,
        state.gateway.as_ref(),
        &auth.user,
        &body.intent_id,
        state.seller_share_percent(),
    )
    .await?;
    Ok(ok(result))
}

/// `POST /payment/webhook` - signed gateway callback, no session.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Value> {
    let secret = state
        .settings
        .stripe_webhook_secret
        .as_deref()
        .ok_or_else(|| Error::Webhook {
            message: "webhook secret is not configured".to_string(),
        })?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| Error::Webhook {
            message: "missing signature header".to_string(),
        })?;

    let applied = payment::handle_webhook(
        &state.db,
        &body,
        signature,
        secret,
        Utc::now().timestamp(),
        state.seller_share_percent(),
    )
    .await?;
    Ok(ok(json!({ "received": true, "applied": applied.is_some() })))
}
