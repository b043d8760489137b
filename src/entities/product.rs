//! Product entity - Physical goods listed by sellers.
//!
//! Products are never hard-deleted; `is_deleted` hides them from the catalog
//! while keeping order history intact.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Unique identifier for the product
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Seller who listed the product
    pub seller_id: i64,
    /// Name of the product
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Unit price in cents
    pub price: i64,
    /// Units available for sale
    pub stock: i32,
    /// Media reference (hosted image URL)
    pub image_url: Option<String>,
    /// Soft delete flag
    pub is_deleted: bool,
    /// When the product was created
    pub created_at: DateTimeUtc,
    /// When the product was last modified
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each product belongs to one seller
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
