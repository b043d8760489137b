//! Catalog business logic - Products, courses and lectures.
//!
//! Catalog documents are plain records. Writes are restricted to the owning
//! seller or an admin, deletes are soft, and only published, live courses are
//! visible to buyers.

use crate::{
    entities::{Course, Lecture, Product, course, lecture, product, user, user::Role},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*, sea_query::LikeExpr};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fields for a new product.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Unit price in cents
    pub price: i64,
    pub stock: i32,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Partial product update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub image_url: Option<String>,
}

/// Fields for a new course.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCourse {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// One-time price in cents
    pub price: i64,
    /// Monthly price in cents, if subscriptions are offered
    #[serde(default)]
    pub subscription_price: Option<i64>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// Partial course update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub subscription_price: Option<i64>,
    pub thumbnail_url: Option<String>,
}

/// Fields for a new lecture.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLecture {
    pub title: String,
    pub video_url: String,
    #[serde(default)]
    pub duration_secs: i32,
}

/// A course together with its lectures in order.
#[derive(Debug, Clone, Serialize)]
pub struct CourseDetail {
    /// The course itself
    #[serde(flatten)]
    pub course: course::Model,
    /// Lectures sorted by position
    pub lectures: Vec<lecture::Model>,
}

fn require_seller(actor: &user::Model) -> Result<()> {
    match actor.role {
        Role::Seller | Role::Admin => Ok(()),
        Role::User => Err(Error::forbidden("Only sellers can manage the catalog")),
    }
}

fn require_owner(actor: &user::Model, owner_id: i64) -> Result<()> {
    if actor.role == Role::Admin || actor.id == owner_id {
        Ok(())
    } else {
        Err(Error::forbidden("You do not own this listing"))
    }
}

fn validate_price(price: i64) -> Result<()> {
    if price < 0 {
        return Err(Error::InvalidAmount { amount: price });
    }
    Ok(())
}

fn validate_name(name: &str, what: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::validation(format!("{what} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

const LIKE_ESCAPE: char = '\\';

/// Substring match where `%` and `_` in the term are literal characters.
fn contains_pattern(term: &str) -> LikeExpr {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | LIKE_ESCAPE) {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(c);
    }
    escaped.push('%');
    LikeExpr::new(escaped).escape(LIKE_ESCAPE)
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Lists live products, newest first, optionally filtered by a name substring.
pub async fn list_products(
    db: &DatabaseConnection,
    search: Option<&str>,
) -> Result<Vec<product::Model>> {
    let mut query = Product::find().filter(product::Column::IsDeleted.eq(false));
    if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
        query = query.filter(product::Column::Name.like(contains_pattern(term)));
    }
    query
        .order_by_desc(product::Column::CreatedAt)
        .order_by_desc(product::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists a seller's live products.
pub async fn list_products_for_seller(
    db: &DatabaseConnection,
    seller_id: i64,
) -> Result<Vec<product::Model>> {
    Product::find()
        .filter(product::Column::SellerId.eq(seller_id))
        .filter(product::Column::IsDeleted.eq(false))
        .order_by_asc(product::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a live product.
pub async fn get_product(db: &DatabaseConnection, product_id: i64) -> Result<product::Model> {
    Product::find_by_id(product_id)
        .filter(product::Column::IsDeleted.eq(false))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Product", product_id))
}

/// Creates a product owned by `actor`.
pub async fn create_product(
    db: &DatabaseConnection,
    actor: &user::Model,
    input: NewProduct,
) -> Result<product::Model> {
    require_seller(actor)?;
    let name = validate_name(&input.name, "Product name")?;
    validate_price(input.price)?;
    if input.stock < 0 {
        return Err(Error::validation("Stock cannot be negative"));
    }

    let now = Utc::now();
    let created = product::ActiveModel {
        seller_id: Set(actor.id),
        name: Set(name),
        description: Set(input.description),
        price: Set(input.price),
        stock: Set(input.stock),
        image_url: Set(input.image_url),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(product_id = created.id, seller_id = actor.id, "Created product");
    Ok(created)
}

/// Applies a partial update to a product owned by `actor`.
pub async fn update_product(
    db: &DatabaseConnection,
    actor: &user::Model,
    product_id: i64,
    update: ProductUpdate,
) -> Result<product::Model> {
    let existing = get_product(db, product_id).await?;
    require_owner(actor, existing.seller_id)?;

    let mut active: product::ActiveModel = existing.into();
    if let Some(name) = update.name {
        active.name = Set(validate_name(&name, "Product name")?);
    }
    if let Some(description) = update.description {
        active.description = Set(description);
    }
    if let Some(price) = update.price {
        validate_price(price)?;
        active.price = Set(price);
    }
    if let Some(stock) = update.stock {
        if stock < 0 {
            return Err(Error::validation("Stock cannot be negative"));
        }
        active.stock = Set(stock);
    }
    if let Some(image_url) = update.image_url {
        active.image_url = Set(Some(image_url));
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Soft-deletes a product owned by `actor`.
pub async fn delete_product(
    db: &DatabaseConnection,
    actor: &user::Model,
    product_id: i64,
) -> Result<product::Model> {
    let existing = get_product(db, product_id).await?;
    require_owner(actor, existing.seller_id)?;

    let mut active: product::ActiveModel = existing.into();
    active.is_deleted = Set(true);
    active.updated_at = Set(Utc::now());
    let deleted = active.update(db).await?;
    info!(product_id, "Soft-deleted product");
    Ok(deleted)
}

// ---------------------------------------------------------------------------
// Courses
// ---------------------------------------------------------------------------

/// Lists published, live courses ordered by id.
pub async fn list_published_courses(db: &DatabaseConnection) -> Result<Vec<course::Model>> {
    Course::find()
        .filter(course::Column::IsPublished.eq(true))
        .filter(course::Column::IsDeleted.eq(false))
        .order_by_asc(course::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Lists an instructor's live courses, published or not.
pub async fn list_courses_for_instructor(
    db: &DatabaseConnection,
    instructor_id: i64,
) -> Result<Vec<course::Model>> {
    Course::find()
        .filter(course::Column::InstructorId.eq(instructor_id))
        .filter(course::Column::IsDeleted.eq(false))
        .order_by_asc(course::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves a live course regardless of publication.
pub async fn get_course(db: &DatabaseConnection, course_id: i64) -> Result<course::Model> {
    Course::find_by_id(course_id)
        .filter(course::Column::IsDeleted.eq(false))
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Course", course_id))
}

/// Retrieves a course with its lectures.
pub async fn get_course_detail(db: &DatabaseConnection, course_id: i64) -> Result<CourseDetail> {
    let course = get_course(db, course_id).await?;
    let lectures = course
        .find_related(Lecture)
        .order_by_asc(lecture::Column::Position)
        .all(db)
        .await?;
    Ok(CourseDetail { course, lectures })
}

/// Creates an unpublished course owned by `actor`.
pub async fn create_course(
    db: &DatabaseConnection,
    actor: &user::Model,
    input: NewCourse,
) -> Result<course::Model> {
    require_seller(actor)?;
    let title = validate_name(&input.title, "Course title")?;
    validate_price(input.price)?;
    if let Some(monthly) = input.subscription_price {
        if monthly <= 0 {
            return Err(Error::InvalidAmount { amount: monthly });
        }
    }

    let now = Utc::now();
    let created = course::ActiveModel {
        instructor_id: Set(actor.id),
        title: Set(title),
        description: Set(input.description),
        price: Set(input.price),
        subscription_price: Set(input.subscription_price),
        thumbnail_url: Set(input.thumbnail_url),
        is_published: Set(false),
        is_deleted: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    info!(course_id = created.id, instructor_id = actor.id, "Created course");
    Ok(created)
}

/// Applies a partial update to a course owned by `actor`.
pub async fn update_course(
    db: &DatabaseConnection,
    actor: &user::Model,
    course_id: i64,
    update: CourseUpdate,
) -> Result<course::Model> {
    let existing = get_course(db, course_id).await?;
    require_owner(actor, existing.instructor_id)?;

    let mut active: course::ActiveModel = existing.into();
    if let Some(title) = update.title {
        active.title = Set(validate_name(&title, "Course title")?);
    }
    if let Some(description) = update.description {
        active.description = Set(description);
    }
    if let Some(price) = update.price {
        validate_price(price)?;
        active.price = Set(price);
    }
    if let Some(monthly) = update.subscription_price {
        if monthly <= 0 {
            return Err(Error::InvalidAmount { amount: monthly });
        }
        active.subscription_price = Set(Some(monthly));
    }
    if let Some(thumbnail_url) = update.thumbnail_url {
        active.thumbnail_url = Set(Some(thumbnail_url));
    }
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Publishes a course. A course needs at least one lecture to be published.
pub async fn publish_course(
    db: &DatabaseConnection,
    actor: &user::Model,
    course_id: i64,
) -> Result<course::Model> {
    let existing = get_course(db, course_id).await?;
    require_owner(actor, existing.instructor_id)?;

    let lecture_count = existing.find_related(Lecture).count(db).await?;
    if lecture_count == 0 {
        return Err(Error::validation("A course needs at least one lecture to be published"));
    }

    let mut active: course::ActiveModel = existing.into();
    active.is_published = Set(true);
    active.updated_at = Set(Utc::now());
    let published = active.update(db).await?;
    info!(course_id, "Published course");
    Ok(published)
}

/// Soft-deletes a course owned by `actor`.
pub async fn delete_course(
    db: &DatabaseConnection,
    actor: &user::Model,
    course_id: i64,
) -> Result<course::Model> {
    let existing = get_course(db, course_id).await?;
    require_owner(actor, existing.instructor_id)?;

    let mut active: course::ActiveModel = existing.into();
    active.is_deleted = Set(true);
    active.updated_at = Set(Utc::now());
    active.update(db).await.map_err(Into::into)
}

/// Appends a lecture at the end of a course.
pub async fn add_lecture(
    db: &DatabaseConnection,
    actor: &user::Model,
    course_id: i64,
    input: NewLecture,
) -> Result<lecture::Model> {
    let course = get_course(db, course_id).await?;
    require_owner(actor, course.instructor_id)?;
    let title = validate_name(&input.title, "Lecture title")?;
    if input.video_url.trim().is_empty() {
        return Err(Error::validation("Lecture video URL cannot be empty"));
    }
    if input.duration_secs < 0 {
        return Err(Error::validation("Lecture duration cannot be negative"));
    }

    let existing_lectures = course.find_related(Lecture).count(db).await?;
    let position = i32::try_from(existing_lectures)
        .map_err(|_| Error::validation("Course has too many lectures"))?;

    lecture::ActiveModel {
        course_id: Set(course_id),
        title: Set(title),
        video_url: Set(input.video_url.trim().to_string()),
        position: Set(position),
        duration_secs: Set(input.duration_secs),
        ..Default::default()
    }
    .insert(db)
    .await
    .map_err(Into::into)
}
