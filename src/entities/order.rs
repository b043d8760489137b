//! Order entity - A buyer's purchase of products or course access.
//!
//! Orders are created at checkout, mutated by payment verification and by
//! seller status updates, and never hard-deleted. `earnings_credited` is the
//! guard that keeps seller earnings from being credited twice.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What an order buys
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Physical products, shipped to an address
    #[sea_orm(string_value = "product")]
    Product,
    /// Course access, delivered immediately on payment
    #[sea_orm(string_value = "course")]
    Course,
}

/// Fulfilment status of an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum OrderStatus {
    /// Created, awaiting payment
    #[sea_orm(string_value = "Pending")]
    Pending,
    /// Paid, being fulfilled
    #[sea_orm(string_value = "Processing")]
    Processing,
    /// Fulfilled
    #[sea_orm(string_value = "Completed")]
    Completed,
    /// Cancelled by a seller or admin
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Wire and database spelling of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Legal transition table. Completed and Cancelled are terminal.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Cancelled)
                | (Self::Processing, Self::Completed | Self::Cancelled)
        )
    }
}

/// Payment status of an order
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
pub enum PaymentStatus {
    /// No successful payment yet
    #[sea_orm(string_value = "Pending")]
    Pending,
    /// A payment intent for the order succeeded
    #[sea_orm(string_value = "Paid")]
    Paid,
    /// The last payment attempt failed or was canceled
    #[sea_orm(string_value = "Failed")]
    Failed,
}

/// Order database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    /// Unique identifier for the order
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Buyer who placed the order
    pub buyer_id: i64,
    /// Products or course access
    pub kind: OrderKind,
    /// Sum of all line totals in cents
    pub total_amount: i64,
    /// Fulfilment status
    pub status: OrderStatus,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Payment method label chosen at checkout (e.g. "card")
    pub payment_method: String,
    /// Shipping address, required for product orders
    pub shipping_line1: Option<String>,
    pub shipping_city: Option<String>,
    pub shipping_postal_code: Option<String>,
    pub shipping_country: Option<String>,
    /// Carrier tracking number set by the seller
    pub tracking_number: Option<String>,
    /// Expected delivery date set by the seller
    pub expected_delivery: Option<Date>,
    /// Whether seller earnings for this order are currently credited
    pub earnings_credited: bool,
    /// When the order was placed
    pub created_at: DateTimeUtc,
    /// When the order was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Order and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One order has many line items
    #[sea_orm(has_many = "super::order_item::Entity")]
    Items,
    /// One order has many payment attempts
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
    /// Each order belongs to one buyer
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::BuyerId",
        to = "super::user::Column::Id"
    )]
    Buyer,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Buyer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
