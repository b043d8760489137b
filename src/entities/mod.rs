//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod course;
pub mod earnings_entry;
pub mod lecture;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod product;
pub mod session;
pub mod subscription;
pub mod user;

// Re-export specific types to avoid conflicts
pub use course::{Column as CourseColumn, Entity as Course, Model as CourseModel};
pub use earnings_entry::{
    Column as EarningsEntryColumn, Entity as EarningsEntry, Model as EarningsEntryModel,
};
pub use lecture::{Column as LectureColumn, Entity as Lecture, Model as LectureModel};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use order_item::{Column as OrderItemColumn, Entity as OrderItem, Model as OrderItemModel};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use session::{Column as SessionColumn, Entity as Session, Model as SessionModel};
pub use subscription::{
    Column as SubscriptionColumn, Entity as Subscription, Model as SubscriptionModel,
};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
