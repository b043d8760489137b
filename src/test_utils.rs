//! Shared test utilities for the marketplace.
//!
//! This module provides helpers for setting up test databases and creating
//! users, catalog entries and orders with sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{catalog, order, payment},
    entities::{
        course, order::OrderKind, order::OrderStatus, order::PaymentStatus, order_item, product,
        subscription, subscription::SubscriptionStatus, user, user::Role,
    },
    errors::Result,
    gateway::{MockGateway, PaymentGateway},
};
use crate::entities::payment::IntentStatus;
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tracing_subscriber::EnvFilter;

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Routes tracing output through the test harness. Safe to call repeatedly.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with_test_writer()
        .try_init();
}

/// An unsaved user for tests that never reach the database.
pub fn fake_user(id: i64, role: Role) -> user::Model {
    user::Model {
        id,
        name: format!("user{id}"),
        email: format!("user{id}@example.com"),
        password_hash: String::new(),
        role,
        earnings: 0,
        created_at: Utc::now(),
    }
}

/// Inserts a user directly, skipping password hashing.
///
/// The stored hash is not a valid Argon2 string, so these users cannot log in.
/// Use `core::user::register` when a test needs credentials.
pub async fn create_test_user(db: &DatabaseConnection, email: &str, role: Role) -> Result<user::Model> {
    let name = email.split('@').next().unwrap_or(email).to_string();
    let model = user::ActiveModel {
        name: Set(name),
        email: Set(email.to_lowercase()),
        password_hash: Set("not-a-hash".to_string()),
        role: Set(role),
        earnings: Set(0),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Creates a seller.
pub async fn create_test_seller(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    create_test_user(db, email, Role::Seller).await
}

/// Creates a regular buyer.
pub async fn create_test_buyer(db: &DatabaseConnection, email: &str) -> Result<user::Model> {
    create_test_user(db, email, Role::User).await
}

/// Product input with an empty description and no image.
pub fn product_input(name: &str, price: i64, stock: i32) -> catalog::NewProduct {
    catalog::NewProduct {
        name: name.to_string(),
        description: String::new(),
        price,
        stock,
        image_url: None,
    }
}

/// Course input without a subscription plan.
pub fn course_input(title: &str, price: i64) -> catalog::NewCourse {
    catalog::NewCourse {
        title: title.to_string(),
        description: String::new(),
        price,
        subscription_price: None,
        thumbnail_url: None,
    }
}

/// Lecture input with a placeholder video.
pub fn lecture_input(title: &str) -> catalog::NewLecture {
    catalog::NewLecture {
        title: title.to_string(),
        video_url: format!("https://videos.example.com/{}.mp4", title.to_lowercase()),
        duration_secs: 600,
    }
}

/// Creates a live product owned by `seller`.
pub async fn create_stocked_product(
    db: &DatabaseConnection,
    seller: &user::Model,
    name: &str,
    price: i64,
    stock: i32,
) -> Result<product::Model> {
    catalog::create_product(db, seller, product_input(name, price, stock)).await
}

/// Creates an unpublished course that already has one lecture.
pub async fn create_draft_course_with_lecture(
    db: &DatabaseConnection,
    instructor: &user::Model,
    title: &str,
) -> Result<course::Model> {
    let course = catalog::create_course(db, instructor, course_input(title, 1000)).await?;
    catalog::add_lecture(db, instructor, course.id, lecture_input("Welcome")).await?;
    Ok(course)
}

/// Creates a published course with one lecture.
pub async fn create_published_course(
    db: &DatabaseConnection,
    instructor: &user::Model,
    title: &str,
    price: i64,
) -> Result<course::Model> {
    let course = catalog::create_course(db, instructor, course_input(title, price)).await?;
    catalog::add_lecture(db, instructor, course.id, lecture_input("Welcome")).await?;
    catalog::publish_course(db, instructor, course.id).await
}

/// Creates a published course offering a monthly subscription.
pub async fn create_subscription_course(
    db: &DatabaseConnection,
    instructor: &user::Model,
    title: &str,
    subscription_price: i64,
) -> Result<course::Model> {
    let mut input = course_input(title, subscription_price * 10);
    input.subscription_price = Some(subscription_price);
    let course = catalog::create_course(db, instructor, input).await?;
    catalog::add_lecture(db, instructor, course.id, lecture_input("Welcome")).await?;
    catalog::publish_course(db, instructor, course.id).await
}

/// Inserts a paid, completed course order directly, without crediting earnings.
pub async fn insert_paid_course_order(
    db: &DatabaseConnection,
    buyer_id: i64,
    courses: &[&course::Model],
) -> Result<crate::entities::order::Model> {
    let now = Utc::now();
    let total: i64 = courses.iter().map(|c| c.price).sum();
    let order = crate::entities::order::ActiveModel {
        buyer_id: Set(buyer_id),
        kind: Set(OrderKind::Course),
        total_amount: Set(total),
        status: Set(OrderStatus::Completed),
        payment_status: Set(PaymentStatus::Paid),
        payment_method: Set("card".to_string()),
        shipping_line1: Set(None),
        shipping_city: Set(None),
        shipping_postal_code: Set(None),
        shipping_country: Set(None),
        tracking_number: Set(None),
        expected_delivery: Set(None),
        earnings_credited: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    for course in courses {
        order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(None),
            course_id: Set(Some(course.id)),
            seller_id: Set(course.instructor_id),
            quantity: Set(1),
            unit_price: Set(course.price),
            line_total: Set(course.price),
            earnings: Set(course.price * 80 / 100),
            ..Default::default()
        }
        .insert(db)
        .await?;
    }
    Ok(order)
}

/// Inserts a subscription whose period ends `remaining` from now.
pub async fn insert_subscription(
    db: &DatabaseConnection,
    user_id: i64,
    course_id: i64,
    status: SubscriptionStatus,
    remaining: Duration,
) -> Result<subscription::Model> {
    let now = Utc::now();
    let model = subscription::ActiveModel {
        user_id: Set(user_id),
        course_id: Set(course_id),
        status: Set(status),
        current_period_start: Set(Some(now - Duration::days(30))),
        current_period_end: Set(Some(now + remaining)),
        created_at: Set(now),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

fn test_address() -> order::ShippingAddress {
    order::ShippingAddress {
        line1: "1 Market Street".to_string(),
        city: "Springfield".to_string(),
        postal_code: "12345".to_string(),
        country: "US".to_string(),
    }
}

/// Product checkout request for `(product_id, quantity)` lines.
pub fn product_order(lines: &[(i64, i32)], expected_total: Option<i64>) -> order::NewOrder {
    order::NewOrder {
        kind: OrderKind::Product,
        items: lines
            .iter()
            .map(|&(product_id, quantity)| order::NewOrderItem {
                product_id: Some(product_id),
                course_id: None,
                quantity: Some(quantity),
            })
            .collect(),
        shipping_address: Some(test_address()),
        payment_method: None,
        expected_total,
    }
}

/// Course checkout request.
pub fn course_order(course_ids: &[i64]) -> order::NewOrder {
    order::NewOrder {
        kind: OrderKind::Course,
        items: course_ids
            .iter()
            .map(|&course_id| order::NewOrderItem {
                product_id: None,
                course_id: Some(course_id),
                quantity: None,
            })
            .collect(),
        shipping_address: None,
        payment_method: None,
        expected_total: None,
    }
}

/// A product order that went through checkout, payment and verification.
pub struct PaidOrderFixture {
    /// Database holding everything below
    pub db: DatabaseConnection,
    /// Gateway the order was paid through
    pub gateway: MockGateway,
    /// The paid order (status `Processing`)
    pub order_id: i64,
    /// Intent that paid it
    pub intent_id: String,
    /// Product bought, two units, stock ten before checkout
    pub product: product::Model,
    /// Seller of the product
    pub seller: user::Model,
    /// Buyer
    pub buyer: user::Model,
    /// Seller share credited for the order
    pub expected_seller_share: i64,
}

/// Builds a [`PaidOrderFixture`] at the default 80% seller share.
pub async fn paid_product_order_fixture() -> Result<PaidOrderFixture> {
    init_test_tracing();
    let db = setup_test_db().await?;
    let gateway = MockGateway::new();
    let seller = create_test_seller(&db, "seller@example.com").await?;
    let buyer = create_test_buyer(&db, "buyer@example.com").await?;
    let product = create_stocked_product(&db, &seller, "Walnut Desk Organizer", 2500, 10).await?;

    let detail = order::create_order(&db, &buyer, product_order(&[(product.id, 2)], Some(5000)), 80).await?;
    let checkout = payment::create_order_payment(&db, &gateway, &buyer, detail.order.id, "usd").await?;
    gateway.set_status(&checkout.intent_id, IntentStatus::Succeeded)?;
    let intent = gateway.retrieve_intent(&checkout.intent_id).await?;
    payment::apply_intent_status(&db, &intent, 80).await?;

    Ok(PaidOrderFixture {
        db,
        gateway,
        order_id: detail.order.id,
        intent_id: checkout.intent_id,
        product,
        seller,
        buyer,
        expected_seller_share: 4000,
    })
}
