//! Payment entity - Local mirror of a gateway payment intent.
//!
//! A payment pays either an order or a subscription period. `status` copies the
//! gateway's intent status verbatim; `earnings_credited` guards subscription
//! earnings the way `orders.earnings_credited` guards order earnings.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Gateway payment intent status
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    #[sea_orm(string_value = "requires_payment_method")]
    RequiresPaymentMethod,
    #[sea_orm(string_value = "requires_confirmation")]
    RequiresConfirmation,
    #[sea_orm(string_value = "requires_action")]
    RequiresAction,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "requires_capture")]
    RequiresCapture,
    #[sea_orm(string_value = "canceled")]
    Canceled,
    #[sea_orm(string_value = "succeeded")]
    Succeeded,
}

/// Payment database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Gateway payment intent id
    #[sea_orm(unique)]
    pub intent_id: String,
    /// Order paid by this payment
    pub order_id: Option<i64>,
    /// Subscription period paid by this payment
    pub subscription_id: Option<i64>,
    /// Paying user
    pub buyer_id: i64,
    /// Amount in cents
    pub amount: i64,
    /// ISO currency code, lowercase
    pub currency: String,
    /// Last known intent status
    pub status: IntentStatus,
    /// Metadata sent to the gateway with the intent
    pub metadata: Json,
    /// Whether earnings for this payment were credited (subscriptions only)
    pub earnings_credited: bool,
    /// When the intent was created
    pub created_at: DateTimeUtc,
    /// When the status last changed
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Order this payment pays, if any
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    /// Subscription this payment pays, if any
    #[sea_orm(
        belongs_to = "super::subscription::Entity",
        from = "Column::SubscriptionId",
        to = "super::subscription::Column::Id"
    )]
    Subscription,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl Related<super::subscription::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscription.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
