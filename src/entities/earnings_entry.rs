//! Earnings entry entity - Append-only seller ledger.
//!
//! Every change to `users.earnings` is accompanied by exactly one entry here,
//! written in the same database transaction.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Why a ledger entry was written
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Seller share of a paid order
    #[sea_orm(string_value = "sale")]
    Sale,
    /// Instructor share of a subscription payment
    #[sea_orm(string_value = "subscription")]
    Subscription,
    /// Negative entry undoing a sale when its order is cancelled
    #[sea_orm(string_value = "reversal")]
    Reversal,
}

/// Earnings entry database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "earnings_entries")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Seller whose balance changed
    pub seller_id: i64,
    /// Source order, for sales and reversals
    pub order_id: Option<i64>,
    /// Source subscription, for subscription entries
    pub subscription_id: Option<i64>,
    /// Entry kind
    pub kind: EntryKind,
    /// Gross amount the share was computed from (negative for reversals)
    pub gross_amount: i64,
    /// Signed change to the seller balance
    pub amount: i64,
    /// Platform share of `gross_amount`
    pub platform_fee: i64,
    /// When the entry was written
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each entry belongs to one seller
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::SellerId",
        to = "super::user::Column::Id"
    )]
    Seller,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seller.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
