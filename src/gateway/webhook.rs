//! Webhook signature verification and event parsing.
//!
//! Signatures use the Stripe scheme: the `Stripe-Signature` header carries
//! `t=<unix seconds>` and one or more `v1=<hex>` values, where each value is
//! `HMAC-SHA256(secret, "<t>.<raw body>")`.

use super::PaymentIntent;
use crate::errors::{Error, Result};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed payload before it is treated as a replay.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Payment-related webhook events the service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// `payment_intent.succeeded`
    IntentSucceeded(PaymentIntent),
    /// `payment_intent.payment_failed`
    IntentFailed(PaymentIntent),
    /// `payment_intent.canceled`
    IntentCanceled(PaymentIntent),
    /// Any other event type; acknowledged without action
    Ignored {
        /// Event type as sent by the gateway
        event_type: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

/// Verifies `header` against `payload` and returns the parsed event.
///
/// # Errors
/// Returns [`Error::Webhook`] for a malformed header, a stale timestamp,
/// a signature mismatch, or an unparseable body.
pub fn construct_event(payload: &[u8], header: &str, secret: &str, now: i64) -> Result<WebhookEvent> {
    verify_signature(payload, header, secret, now)?;
    parse_event(payload)
}

/// Checks a `Stripe-Signature` header.
///
/// # Errors
/// Returns [`Error::Webhook`] when the signature is not acceptable.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str, now: i64) -> Result<()> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse().ok(),
            Some(("v1", value)) => {
                if let Ok(bytes) = hex::decode(value) {
                    signatures.push(bytes);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| webhook_error("missing timestamp"))?;
    if signatures.is_empty() {
        return Err(webhook_error("missing v1 signature"));
    }
    let within_tolerance = now
        .checked_sub(timestamp)
        .map(i64::unsigned_abs)
        .is_some_and(|age| age <= SIGNATURE_TOLERANCE_SECS.unsigned_abs());
    if !within_tolerance {
        return Err(webhook_error("timestamp outside tolerance"));
    }

    let matched = signatures.iter().any(|signature| {
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(signature).is_ok()
    });

    if matched {
        Ok(())
    } else {
        Err(webhook_error("signature mismatch"))
    }
}

/// Parses an already-verified event body.
///
/// # Errors
/// Returns [`Error::Webhook`] if the body is not a valid event.
pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent> {
    let raw: RawEvent = serde_json::from_slice(payload)
        .map_err(|e| webhook_error(&format!("invalid event body: {e}")))?;

    let intent = |object: serde_json::Value| -> Result<PaymentIntent> {
        serde_json::from_value(object)
            .map_err(|e| webhook_error(&format!("invalid payment_intent object: {e}")))
    };

    Ok(match raw.event_type.as_str() {
        "payment_intent.succeeded" => WebhookEvent::IntentSucceeded(intent(raw.data.object)?),
        "payment_intent.payment_failed" => WebhookEvent::IntentFailed(intent(raw.data.object)?),
        "payment_intent.canceled" => WebhookEvent::IntentCanceled(intent(raw.data.object)?),
        _ => WebhookEvent::Ignored {
            event_type: raw.event_type,
        },
    })
}

fn webhook_error(message: &str) -> Error {
    Error::Webhook {
        message: message.to_string(),
    }
}

/// Produces a valid signature header for `payload`; used by tests and local tooling.
#[must_use]
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return format!("t={timestamp}"),
    };
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::payment::IntentStatus;

    const SECRET: &str = "whsec_test123secret456";

    fn succeeded_body() -> Vec<u8> {
        br#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{"id":"pi_1","amount":1500,"currency":"usd","status":"succeeded","metadata":{"order_id":"4"}}}}"#.to_vec()
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = succeeded_body();
        let now = 1_700_000_000;
        let header = sign_payload(&body, SECRET, now);

        let event = construct_event(&body, &header, SECRET, now).unwrap();
        let WebhookEvent::IntentSucceeded(intent) = event else {
            panic!("expected succeeded event");
        };
        assert_eq!(intent.id, "pi_1");
        assert_eq!(intent.status, IntentStatus::Succeeded);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = succeeded_body();
        let now = 1_700_000_000;
        let header = sign_payload(&body, "wrong_secret", now);
        let result = verify_signature(&body, &header, SECRET, now);
        assert!(matches!(result.unwrap_err(), Error::Webhook { message: _ }));
    }

    #[test]
    fn test_modified_payload_rejected() {
        let body = succeeded_body();
        let now = 1_700_000_000;
        let header = sign_payload(&body, SECRET, now);
        let tampered = br#"{"id":"evt_1","type":"payment_intent.succeeded","hacked":true}"#;
        assert!(verify_signature(tampered, &header, SECRET, now).is_err());
    }

    #[test]
    fn test_stale_timestamp_rejected() {
        let body = succeeded_body();
        let signed_at = 1_700_000_000;
        let header = sign_payload(&body, SECRET, signed_at);
        let result = verify_signature(&body, &header, SECRET, signed_at + 600);
        assert!(result.is_err());
    }

    #[test]
    fn test_extreme_timestamps_rejected() {
        let body = succeeded_body();
        let now = 1_700_000_000;
        for header in [
            format!("t={},v1=00", i64::MIN),
            format!("t={},v1=00", i64::MAX),
        ] {
            let result = verify_signature(&body, &header, SECRET, now);
            assert!(matches!(result.unwrap_err(), Error::Webhook { message: _ }));
        }
    }

    #[test]
    fn test_missing_parts_rejected() {
        let body = succeeded_body();
        assert!(verify_signature(&body, "v1=abcd", SECRET, 0).is_err());
        assert!(verify_signature(&body, "t=0", SECRET, 0).is_err());
        assert!(verify_signature(&body, "", SECRET, 0).is_err());
    }

    #[test]
    fn test_any_matching_v1_is_enough() {
        let body = succeeded_body();
        let now = 1_700_000_000;
        let good = sign_payload(&body, SECRET, now);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={now},v1=00ff,v1={good_sig}");
        assert!(verify_signature(&body, &header, SECRET, now).is_ok());
    }

    #[test]
    fn test_unrelated_event_ignored() {
        let body = br#"{"id":"evt_2","type":"customer.created","data":{"object":{"id":"cus_1"}}}"#;
        let event = parse_event(body).unwrap();
        assert_eq!(
            event,
            WebhookEvent::Ignored {
                event_type: "customer.created".to_string()
            }
        );
    }
}
