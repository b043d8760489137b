//! User entity - Buyers, sellers and administrators.
//!
//! A user's `earnings` column is the running seller balance. The ledger that
//! explains it lives in `earnings_entries`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Account role controlling which API areas a user may reach
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular buyer / learner
    #[sea_orm(string_value = "user")]
    User,
    /// Can list products and courses and receives earnings
    #[sea_orm(string_value = "seller")]
    Seller,
    /// Full access, including admin dashboards
    #[sea_orm(string_value = "admin")]
    Admin,
}

impl Role {
    /// Wire and database spelling of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Seller => "seller",
            Self::Admin => "admin",
        }
    }
}

/// User database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Display name
    pub name: String,
    /// Login email, stored lowercase
    #[sea_orm(unique)]
    pub email: String,
    /// Argon2id PHC string, never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Account role
    pub role: Role,
    /// Running earnings balance in cents
    pub earnings: i64,
    /// When the account was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between User and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One user has many sessions
    #[sea_orm(has_many = "super::session::Entity")]
    Sessions,
    /// One user has many earnings entries
    #[sea_orm(has_many = "super::earnings_entry::Entity")]
    EarningsEntries,
    /// One user has many subscriptions
    #[sea_orm(has_many = "super::subscription::Entity")]
    Subscriptions,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::earnings_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EarningsEntries.def()
    }
}

impl Related<super::subscription::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subscriptions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
