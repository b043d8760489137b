//! In-memory payment gateway for development and tests.
//!
//! Intents live in a map. Tests drive status changes with [`MockGateway::set_status`];
//! in auto-confirm mode every retrieved intent reports `succeeded`, which stands
//! in for the client confirming the payment.

use super::{CreateIntent, PaymentGateway, PaymentIntent};
use crate::entities::payment::IntentStatus;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::info;

/// Mock payment gateway keeping intents in memory.
#[derive(Debug, Clone, Default)]
pub struct MockGateway {
    intents: Arc<Mutex<HashMap<String, PaymentIntent>>>,
    auto_confirm: bool,
}

impl MockGateway {
    /// Creates a gateway whose intents only change through `set_status`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a gateway that confirms every intent when it is retrieved.
    #[must_use]
    pub fn auto_confirming() -> Self {
        Self {
            auto_confirm: true,
            ..Self::default()
        }
    }

    /// Forces the status of a stored intent.
    ///
    /// # Errors
    /// Returns [`Error::Gateway`] if the intent is unknown.
    pub fn set_status(&self, intent_id: &str, status: IntentStatus) -> Result<PaymentIntent> {
        let mut intents = self.lock()?;
        let intent = intents.get_mut(intent_id).ok_or_else(|| Error::Gateway {
            message: format!("No such payment_intent: {intent_id}"),
        })?;
        intent.status = status;
        Ok(intent.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, PaymentIntent>>> {
        self.intents.lock().map_err(|_| Error::Gateway {
            message: "mock gateway state poisoned".to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_intent(&self, request: CreateIntent) -> Result<PaymentIntent> {
        if request.amount <= 0 {
            return Err(Error::InvalidAmount {
                amount: request.amount,
            });
        }
        let id = format!("pi_mock_{}", uuid::Uuid::new_v4().simple());
        let intent = PaymentIntent {
            client_secret: Some(format!("{id}_secret_{}", uuid::Uuid::new_v4().simple())),
            id: id.clone(),
            status: IntentStatus::RequiresPaymentMethod,
            amount: request.amount,
            currency: request.currency,
            metadata: request.metadata,
        };
        self.lock()?.insert(id, intent.clone());
        info!(intent_id = %intent.id, amount = intent.amount, "Mock payment intent created");
        Ok(intent)
    }

    async fn retrieve_intent(&self, intent_id: &str) -> Result<PaymentIntent> {
        if self.auto_confirm {
            return self.set_status(intent_id, IntentStatus::Succeeded);
        }
        self.lock()?
            .get(intent_id)
            .cloned()
            .ok_or_else(|| Error::Gateway {
                message: format!("No such payment_intent: {intent_id}"),
            })
    }
}
