//! Billing provider webhook: subscription events drive tier transitions.
//!
//! Every event is signed with
//! `X-Billing-Signature: t=<unix seconds>,v1=<hex hmac-sha256(secret, "<t>.<body>")>`.

use crate::api::AppState;
use crate::error::AppError;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::Sha256;
use thiserror::Error;
use tracing::{info, warn};

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_HEADER: &str = "x-billing-signature";
/// Maximum age, in seconds, of a signed event.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub const EVENT_CHECKOUT_COMPLETED: &str = "checkout.session.completed";
pub const EVENT_SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("webhook secret not configured")]
    NotConfigured,
    #[error("missing signature header")]
    MissingSignature,
    #[error("malformed signature header")]
    MalformedSignature,
    #[error("signature timestamp outside tolerance")]
    StaleTimestamp,
    #[error("signature mismatch")]
    SignatureMismatch,
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::InvalidPayload(_) => AppError::BadRequest(err.to_string()),
            _ => AppError::Unauthorized(err.to_string()),
        }
    }
}

fn mac_for(secret: &str, timestamp: i64, body: &[u8]) -> Result<HmacSha256, WebhookError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| WebhookError::NotConfigured)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// Hex signature of `body` signed at `timestamp`.
pub fn sign_payload(secret: &str, timestamp: i64, body: &[u8]) -> Result<String, WebhookError> {
    Ok(hex::encode(
        mac_for(secret, timestamp, body)?.finalize().into_bytes(),
    ))
}

/// Check a signature header against the raw request body.
pub fn verify_signature(
    secret: &str,
    header: &str,
    body: &[u8],
    now_secs: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse::<i64>().ok(),
            Some(("v1", v)) => signature = hex::decode(v).ok(),
            _ => {}
        }
    }
    let (timestamp, signature) = match (timestamp, signature) {
        (Some(t), Some(s)) => (t, s),
        _ => return Err(WebhookError::MalformedSignature),
    };

    let stale = now_secs
        .checked_sub(timestamp)
        .and_then(i64::checked_abs)
        .map_or(true, |age| age > SIGNATURE_TOLERANCE_SECS);
    if stale {
        return Err(WebhookError::StaleTimestamp);
    }

    mac_for(secret, timestamp, body)?
        .verify_slice(&signature)
        .map_err(|_| WebhookError::SignatureMismatch)
}

#[derive(Debug, Deserialize)]
struct BillingEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckoutCompleted {
    customer_id: String,
    customer_email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubscriptionDeleted {
    customer_id: String,
}

fn event_data<T: serde::de::DeserializeOwned>(data: Value) -> Result<T, WebhookError> {
    serde_json::from_value(data).map_err(|e| WebhookError::InvalidPayload(e.to_string()))
}

pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let secret = state
        .config
        .billing_webhook_secret
        .as_deref()
        .ok_or(WebhookError::NotConfigured)?;
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;
    verify_signature(secret, header, &body, Utc::now().timestamp())?;

    let event: BillingEvent = serde_json::from_slice(&body)
        .map_err(|e| WebhookError::InvalidPayload(e.to_string()))?;

    match event.event_type.as_str() {
        EVENT_CHECKOUT_COMPLETED => {
            let data: CheckoutCompleted = event_data(event.data)?;
            match state.services.users.find_by_email(&data.customer_email).await? {
                Some(user) => {
                    state
                        .services
                        .users
                        .upgrade_to_premium(&user, &data.customer_id)
                        .await?;
                }
                None => warn!(customer_id = %data.customer_id, "Checkout for unknown email"),
            }
        }
        EVENT_SUBSCRIPTION_DELETED => {
            let data: SubscriptionDeleted = event_data(event.data)?;
            match state
                .services
                .users
                .find_by_billing_customer_id(&data.customer_id)
                .await?
            {
                Some(user) => {
                    state.services.users.downgrade_to_basic(&user).await?;
                }
                None => warn!(customer_id = %data.customer_id, "Cancellation for unknown customer"),
            }
        }
        other => info!(event_type = other, "Ignoring billing event"),
    }

    Ok(Json(json!({"received": true})))
}
