//! Payment business logic - Bridges gateway intents to orders and subscriptions.
//!
//! The buyer asks for an intent, confirms it directly with the gateway, and the
//! outcome arrives here either through [`verify_payment`] or a signed webhook.
//! Both paths end in [`apply_intent_status`], which updates the local payment,
//! settles the order or subscription and credits earnings through the guarded
//! ledger functions, all in one database transaction.

use super::{earnings, enrollment};
use crate::{
    entities::{
        Course, Order, Payment, Subscription, course, order, order::OrderKind,
        order::OrderStatus, order::PaymentStatus, payment, payment::IntentStatus, subscription,
        subscription::SubscriptionStatus, user, user::Role,
    },
    errors::{Error, Result},
    gateway::{CreateIntent, PaymentGateway, PaymentIntent, webhook, webhook::WebhookEvent},
};
use chrono::{Duration, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Length of one paid subscription period.
pub const SUBSCRIPTION_PERIOD_DAYS: i64 = 30;

/// What the client needs to confirm a payment with the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutIntent {
    /// Local payment id
    pub payment_id: i64,
    /// Gateway intent id
    pub intent_id: String,
    /// Secret the client confirms with
    pub client_secret: Option<String>,
    /// Amount in cents
    pub amount: i64,
    /// Currency code
    pub currency: String,
    /// Subscription created for this payment, if any
    pub subscription_id: Option<i64>,
}

/// A payment after its intent status was applied.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResult {
    /// Local payment row
    pub payment: payment::Model,
    /// Order paid, if any
    pub order: Option<order::Model>,
    /// Subscription paid, if any
    pub subscription: Option<subscription::Model>,
}

/// How an intent update affects the order or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
    Pending,
}

impl Outcome {
    fn from_status(status: IntentStatus) -> Self {
        match status {
            IntentStatus::Succeeded => Self::Succeeded,
            IntentStatus::Canceled => Self::Failed,
            _ => Self::Pending,
        }
    }
}

/// Creates a gateway intent for an unpaid order owned by `buyer`.
#[instrument(skip(db, gateway, buyer), fields(buyer_id = buyer.id))]
pub async fn create_order_payment(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    buyer: &user::Model,
    order_id: i64,
    currency: &str,
) -> Result<CheckoutIntent> {
    let order = Order::find_by_id(order_id)
        .filter(order::Column::BuyerId.eq(buyer.id))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))?;

    if order.status == OrderStatus::Cancelled {
        return Err(Error::validation(format!("Order {order_id} is cancelled")));
    }
    if order.payment_status == PaymentStatus::Paid {
        return Err(Error::conflict(format!("Order {order_id} is already paid")));
    }
    if order.total_amount <= 0 {
        return Err(Error::InvalidAmount {
            amount: order.total_amount,
        });
    }

    let metadata = HashMap::from([
        ("order_id".to_string(), order.id.to_string()),
        ("buyer_id".to_string(), buyer.id.to_string()),
    ]);
    let intent = gateway
        .create_intent(CreateIntent {
            amount: order.total_amount,
            currency: currency.to_string(),
            metadata: metadata.clone(),
        })
        .await?;

    let txn = db.begin().await?;
    let payment = insert_payment(&txn, &intent, Some(order.id), None, buyer.id, &metadata).await?;

    // A retry after a failed attempt puts the order back to awaiting payment.
    if order.payment_status == PaymentStatus::Failed {
        let mut active: order::ActiveModel = order.into();
        active.payment_status = Set(PaymentStatus::Pending);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?;
    }
    txn.commit().await?;

    info!(order_id, intent_id = %intent.id, amount = intent.amount, "Payment intent created for order");
    Ok(checkout_intent(payment, intent.client_secret))
}

/// Starts a subscription to `course_id` and creates the intent for its first period.
#[instrument(skip(db, gateway, user), fields(user_id = user.id))]
pub async fn create_subscription_payment(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    user: &user::Model,
    course_id: i64,
    currency: &str,
) -> Result<CheckoutIntent> {
    let course = Course::find_by_id(course_id)
        .filter(course::Column::IsDeleted.eq(false))
        .filter(course::Column::IsPublished.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Course", course_id))?;

    let price = course
        .subscription_price
        .ok_or_else(|| Error::validation(format!("Course {course_id} has no subscription plan")))?;
    if price <= 0 {
        return Err(Error::InvalidAmount { amount: price });
    }
    if course.instructor_id == user.id {
        return Err(Error::validation("You cannot subscribe to your own course"));
    }
    let already_enrolled = || Error::conflict(format!("Already enrolled in course {course_id}"));
    if enrollment::has_access(db, user, course_id).await? {
        return Err(already_enrolled());
    }

    // No transaction may be open across the gateway call.
    let mut metadata = HashMap::from([
        ("course_id".to_string(), course_id.to_string()),
        ("buyer_id".to_string(), user.id.to_string()),
    ]);
    let intent = gateway
        .create_intent(CreateIntent {
            amount: price,
            currency: currency.to_string(),
            metadata: metadata.clone(),
        })
        .await?;

    let txn = db.begin().await?;
    if enrollment::has_access(&txn, user, course_id).await? {
        warn!(course_id, intent_id = %intent.id, "Enrolled while creating intent; leaving intent unused");
        return Err(already_enrolled());
    }
    let subscription = subscription::ActiveModel {
        user_id: Set(user.id),
        course_id: Set(course_id),
        status: Set(SubscriptionStatus::Incomplete),
        current_period_start: Set(None),
        current_period_end: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    metadata.insert("subscription_id".to_string(), subscription.id.to_string());
    let payment = insert_payment(&txn, &intent, None, Some(subscription.id), user.id, &metadata).await?;
    txn.commit().await?;

    info!(
        course_id,
        subscription_id = subscription.id,
        intent_id = %intent.id,
        "Payment intent created for subscription"
    );
    Ok(checkout_intent(payment, intent.client_secret))
}

async fn insert_payment<C>(
    db: &C,
    intent: &PaymentIntent,
    order_id: Option<i64>,
    subscription_id: Option<i64>,
    buyer_id: i64,
    metadata: &HashMap<String, String>,
) -> Result<payment::Model>
where
    C: ConnectionTrait,
{
    let now = Utc::now();
    let payment = payment::ActiveModel {
        intent_id: Set(intent.id.clone()),
        order_id: Set(order_id),
        subscription_id: Set(subscription_id),
        buyer_id: Set(buyer_id),
        amount: Set(intent.amount),
        currency: Set(intent.currency.clone()),
        status: Set(intent.status),
        metadata: Set(serde_json::json!(metadata)),
        earnings_credited: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    Ok(payment)
}

fn checkout_intent(payment: payment::Model, client_secret: Option<String>) -> CheckoutIntent {
    CheckoutIntent {
        payment_id: payment.id,
        intent_id: payment.intent_id,
        client_secret,
        amount: payment.amount,
        currency: payment.currency,
        subscription_id: payment.subscription_id,
    }
}

/// Asks the gateway for the intent's current status and applies it.
///
/// Only the paying user or an admin may verify a payment.
#[instrument(skip(db, gateway, actor), fields(actor_id = actor.id))]
pub async fn verify_payment(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    actor: &user::Model,
    intent_id: &str,
    seller_share_percent: u8,
) -> Result<PaymentResult> {
    let payment = Payment::find()
        .filter(payment::Column::IntentId.eq(intent_id))
        .one(db)
        .await?
        .filter(|p| p.buyer_id == actor.id || actor.role == Role::Admin)
        .ok_or_else(|| Error::not_found("Payment", intent_id))?;

    let intent = gateway.retrieve_intent(&payment.intent_id).await?;
    apply_intent_status(db, &intent, seller_share_percent).await
}

/// Applies a gateway intent status to the local payment and what it pays for.
///
/// Safe to call any number of times for the same intent: earnings are only
/// credited once.
pub async fn apply_intent_status(
    db: &DatabaseConnection,
    intent: &PaymentIntent,
    seller_share_percent: u8,
) -> Result<PaymentResult> {
    apply_outcome(db, intent, Outcome::from_status(intent.status), seller_share_percent).await
}

#[instrument(skip(db, intent), fields(intent_id = %intent.id, status = ?intent.status))]
async fn apply_outcome(
    db: &DatabaseConnection,
    intent: &PaymentIntent,
    outcome: Outcome,
    seller_share_percent: u8,
) -> Result<PaymentResult> {
    let txn = db.begin().await?;

    let payment = Payment::find()
        .filter(payment::Column::IntentId.eq(intent.id.as_str()))
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Payment", &intent.id))?;

    if intent.amount != payment.amount {
        warn!(
            expected = payment.amount,
            received = intent.amount,
            "Payment intent amount mismatch"
        );
        return Err(Error::InvalidAmount {
            amount: intent.amount,
        });
    }

    let payment = if payment.status == intent.status {
        payment
    } else {
        let mut active: payment::ActiveModel = payment.into();
        active.status = Set(intent.status);
        active.updated_at = Set(Utc::now());
        active.update(&txn).await?
    };

    let order = match payment.order_id {
        Some(order_id) => Some(settle_order(&txn, order_id, outcome).await?),
        None => None,
    };
    let subscription = match payment.subscription_id {
        Some(subscription_id) => Some(
            settle_subscription(&txn, &payment, subscription_id, outcome, seller_share_percent)
                .await?,
        ),
        None => None,
    };

    // Re-read so the returned row carries the earnings guard.
    let payment = Payment::find_by_id(payment.id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::not_found("Payment", payment.id))?;
    txn.commit().await?;

    Ok(PaymentResult {
        payment,
        order,
        subscription,
    })
}

async fn settle_order<C>(db: &C, order_id: i64, outcome: Outcome) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    let order = Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))?;

    if order.status == OrderStatus::Cancelled {
        warn!(order_id, ?outcome, "Payment update for a cancelled order left untouched");
        return Ok(order);
    }

    let order = match outcome {
        Outcome::Succeeded if order.payment_status != PaymentStatus::Paid => {
            let next = match order.kind {
                OrderKind::Course => OrderStatus::Completed,
                OrderKind::Product => OrderStatus::Processing,
            };
            let status = if order.status == OrderStatus::Pending {
                next
            } else {
                order.status
            };
            let mut active: order::ActiveModel = order.into();
            active.payment_status = Set(PaymentStatus::Paid);
            active.status = Set(status);
            active.updated_at = Set(Utc::now());
            let order = active.update(db).await?;
            info!(order_id, status = order.status.as_str(), "Order paid");
            order
        }
        Outcome::Failed if order.payment_status == PaymentStatus::Pending => {
            let mut active: order::ActiveModel = order.into();
            active.payment_status = Set(PaymentStatus::Failed);
            active.updated_at = Set(Utc::now());
            let order = active.update(db).await?;
            info!(order_id, "Order payment failed");
            order
        }
        _ => order,
    };

    if order.payment_status == PaymentStatus::Paid {
        earnings::credit_order_earnings(db, order_id).await?;
        return Order::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Order", order_id));
    }
    Ok(order)
}

async fn settle_subscription<C>(
    db: &C,
    payment: &payment::Model,
    subscription_id: i64,
    outcome: Outcome,
    seller_share_percent: u8,
) -> Result<subscription::Model>
where
    C: ConnectionTrait,
{
    let subscription = Subscription::find_by_id(subscription_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Subscription", subscription_id))?;

    if outcome != Outcome::Succeeded {
        debug!(subscription_id, ?outcome, "Subscription payment not settled");
        return Ok(subscription);
    }

    let subscription = if subscription.status == SubscriptionStatus::Incomplete {
        let now = Utc::now();
        let mut active: subscription::ActiveModel = subscription.into();
        active.status = Set(SubscriptionStatus::Active);
        active.current_period_start = Set(Some(now));
        active.current_period_end = Set(Some(now + Duration::days(SUBSCRIPTION_PERIOD_DAYS)));
        let subscription = active.update(db).await?;
        info!(subscription_id, "Subscription activated");
        subscription
    } else {
        subscription
    };

    let course = Course::find_by_id(subscription.course_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Course", subscription.course_id))?;
    earnings::credit_subscription_earnings(
        db,
        payment.id,
        subscription.id,
        course.instructor_id,
        payment.amount,
        seller_share_percent,
    )
    .await?;

    Ok(subscription)
}

/// Verifies and applies a gateway webhook.
///
/// Returns `Ok(None)` for events that need no action, including events about
/// intents this service never created.
#[instrument(skip_all)]
pub async fn handle_webhook(
    db: &DatabaseConnection,
    payload: &[u8],
    signature_header: &str,
    secret: &str,
    now: i64,
    seller_share_percent: u8,
) -> Result<Option<PaymentResult>> {
    let event = webhook::construct_event(payload, signature_header, secret, now)?;
    let (intent, outcome) = match event {
        WebhookEvent::IntentSucceeded(intent) => (intent, Outcome::Succeeded),
        WebhookEvent::IntentFailed(intent) | WebhookEvent::IntentCanceled(intent) => {
            (intent, Outcome::Failed)
        }
        WebhookEvent::Ignored { event_type } => {
            debug!(%event_type, "Ignoring webhook event");
            return Ok(None);
        }
    };

    match apply_outcome(db, &intent, outcome, seller_share_percent).await {
        Ok(result) => Ok(Some(result)),
        Err(Error::NotFound { entity: "Payment", .. }) => {
            warn!(intent_id = %intent.id, "Webhook for unknown payment intent acknowledged");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
