//! Course entity - Sellable course with an ordered list of lectures.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Course database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "courses")]
pub struct Model {
    /// Unique identifier for the course
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Instructor (a seller) who owns the course and receives its earnings
    pub instructor_id: i64,
    /// Course title
    pub title: String,
    /// Course description
    pub description: String,
    /// One-time purchase price in cents
    pub price: i64,
    /// Monthly subscription price in cents, if subscriptions are offered
    pub subscription_price: Option<i64>,
    /// Media reference for the course thumbnail
    pub thumbnail_url: Option<String>,
    /// Only published courses appear in the catalog and can be bought
    pub is_published: bool,
    /// Soft delete flag
    pub is_deleted: bool,
    /// When the course was created
    pub created_at: DateTimeUtc,
    /// When the course was last modified
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One course has many lectures
    #[sea_orm(has_many = "super::lecture::Entity")]
    Lectures,
    /// Each course belongs to one instructor
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InstructorId",
        to = "super::user::Column::Id"
    )]
    Instructor,
}

impl Related<super::lecture::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lectures.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Instructor.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
