//! Order item entity - One line of an order.
//!
//! Exactly one of `product_id` / `course_id` is set, matching the order kind.
//! `earnings` is the seller share of `line_total`, fixed when the order is placed.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order item database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Parent order
    pub order_id: i64,
    /// Purchased product, for product orders
    pub product_id: Option<i64>,
    /// Purchased course, for course orders
    pub course_id: Option<i64>,
    /// Seller (or instructor) paid for this line
    pub seller_id: i64,
    /// Units bought; always 1 for courses
    pub quantity: i32,
    /// Unit price at checkout in cents
    pub unit_price: i64,
    /// `unit_price * quantity`
    pub line_total: i64,
    /// Seller share of `line_total`
    pub earnings: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each item belongs to one order
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
