//! Subscription entity - Time-boxed course access grant.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle of a subscription grant
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    /// Created, first payment not yet succeeded
    #[sea_orm(string_value = "incomplete")]
    Incomplete,
    /// Paid for the current period
    #[sea_orm(string_value = "active")]
    Active,
    /// Cancelled by the user
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

/// Subscription database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "subscriptions")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Subscriber
    pub user_id: i64,
    /// Course the subscription grants access to
    pub course_id: i64,
    /// Lifecycle status
    pub status: SubscriptionStatus,
    /// Start of the paid period, set on activation
    pub current_period_start: Option<DateTimeUtc>,
    /// End of the paid period; access stops afterwards
    pub current_period_end: Option<DateTimeUtc>,
    /// When the subscription was created
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each subscription belongs to one user
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    /// Each subscription is for one course
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
