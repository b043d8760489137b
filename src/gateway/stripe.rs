//! Stripe implementation of [`PaymentGateway`] over the REST API.

use super::{CreateIntent, PaymentGateway, PaymentIntent};
use crate::errors::{Error, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// Gateway backed by the Stripe payment intents API.
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    secret_key: String,
    base_url: String,
}

impl std::fmt::Debug for StripeGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeGateway")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    message: Option<String>,
}

impl StripeGateway {
    /// Creates a gateway using the given secret key.
    #[must_use]
    pub fn new(secret_key: String) -> Self {
        Self::with_base_url(secret_key, STRIPE_API_BASE.to_string())
    }

    /// Creates a gateway against a custom API base, e.g. a local stripe-mock.
    #[must_use]
    pub fn with_base_url(secret_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            secret_key,
            base_url,
        }
    }

    async fn parse_response(response: reqwest::Response) -> Result<PaymentIntent> {
        let status = response.status();
        if status.is_success() {
            return response.json::<PaymentIntent>().await.map_err(Into::into);
        }

        let message = response
            .json::<StripeErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or_else(|| format!("Stripe returned HTTP {status}"));
        Err(Error::Gateway { message })
    }
}

/// Encodes intent parameters the way Stripe expects form bodies.
fn intent_form(request: &CreateIntent) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), request.amount.to_string()),
        ("currency".to_string(), request.currency.clone()),
        (
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ),
    ];
    let mut keys: Vec<&String> = request.metadata.keys().collect();
    keys.sort();
    for key in keys {
        form.push((format!("metadata[{key}]"), request.metadata[key].clone()));
    }
    form
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    #[instrument(skip(self, request), fields(amount = request.amount))]
    async fn create_intent(&self, request: CreateIntent) -> Result<PaymentIntent> {
        if request.amount <= 0 {
            return Err(Error::InvalidAmount {
                amount: request.amount,
            });
        }
        let response = self
            .client
            .post(format!("{}/payment_intents", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&intent_form(&request))
            .send()
            .await?;
        let intent = Self::parse_response(response).await?;
        debug!("Created Stripe payment intent {}", intent.id);
        Ok(intent)
    }

    #[instrument(skip(self))]
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        let response = self
            .client
            .get(format!("{}/payment_intents/{intent_id}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await?;
        Self::parse_response(response).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::entities::payment::IntentStatus;
    use std::collections::HashMap;

    #[test]
    fn test_intent_form_encodes_metadata() {
        let request = CreateIntent {
            amount: 2500,
            currency: "usd".to_string(),
            metadata: HashMap::from([
                ("order_id".to_string(), "7".to_string()),
                ("buyer_id".to_string(), "3".to_string()),
            ]),
        };
        let form = intent_form(&request);
        assert!(form.contains(&("amount".to_string(), "2500".to_string())));
        assert!(form.contains(&("metadata[order_id]".to_string(), "7".to_string())));
        assert!(form.contains(&("metadata[buyer_id]".to_string(), "3".to_string())));
    }

    #[test]
    fn test_deserialize_stripe_intent() {
        let body = r#"{
            "id": "pi_123",
            "object": "payment_intent",
            "amount": 4200,
            "currency": "usd",
            "client_secret": "pi_123_secret_abc",
            "status": "requires_payment_method",
            "metadata": {"order_id": "9"}
        }"#;
        let intent: PaymentIntent = serde_json::from_str(body).unwrap();
        assert_eq!(intent.id, "pi_123");
        assert_eq!(intent.status, IntentStatus::RequiresPaymentMethod);
        assert_eq!(intent.metadata.get("order_id").map(String::as_str), Some("9"));
    }
}
