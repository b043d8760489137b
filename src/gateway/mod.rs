//! Payment gateway abstraction.
//!
//! The service never talks to a card network itself. It asks a gateway to
//! create a payment intent, the client confirms that intent directly with the
//! gateway, and the service later learns the outcome either by retrieving the
//! intent or from a signed webhook.

pub mod mock;
pub mod stripe;
pub mod webhook;

use crate::entities::payment::IntentStatus;
use crate::errors::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;

pub use mock::MockGateway;
pub use stripe::StripeGateway;

/// Gateway view of a payment intent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PaymentIntent {
    /// Gateway intent id (e.g. `pi_...`)
    pub id: String,
    /// Secret the client uses to confirm the intent
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Current intent status
    pub status: IntentStatus,
    /// Amount in cents
    pub amount: i64,
    /// Lowercase currency code
    pub currency: String,
    /// Metadata attached at creation
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Parameters for creating a payment intent.
#[derive(Debug, Clone)]
pub struct CreateIntent {
    /// Amount in cents, must be positive
    pub amount: i64,
    /// Lowercase currency code
    pub currency: String,
    /// Free-form metadata echoed back on retrieval and in webhooks
    pub metadata: HashMap<String, String>,
}

/// Payment gateway trait
///
/// Abstraction over payment processors. Only intent creation and retrieval
/// are needed; confirmation happens between the client and the gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a new payment intent.
    async fn create_intent(&self, request: CreateIntent) -> Result<PaymentIntent>;

    /// Fetches the current state of an intent.
    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent>;
}
