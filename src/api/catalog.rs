//! Product endpoints under `/products` and course endpoints under `/course`.
//!
//! Every course write drops the cached course listing.

use super::{ApiJson, ApiResult, AppState, AuthUser, SellerUser, ok};
use crate::{
    core::{catalog, enrollment, payment},
    entities::{course, lecture, product, user::Role},
};
use axum::extract::{Path, Query, State};
use serde::Deserialize;

/// `?search=` filter for the product listing.
#[derive(Debug, Default, Deserialize)]
pub struct ProductSearch {
    pub search: Option<String>,
}

/// `GET /products`
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductSearch>,
) -> ApiResult<Vec<product::Model>> {
    Ok(ok(catalog::list_products(&state.db, query.search.as_deref()).await?))
}

/// `GET /products/:id`
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<i64>,
) -> ApiResult<product::Model> {
    Ok(ok(catalog::get_product(&state.db, product_id).await?))
}

/// `POST /products`
pub async fn create_product(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    ApiJson(body): ApiJson<catalog::NewProduct>,
) -> ApiResult<product::Model> {
    Ok(ok(catalog::create_product(&state.db, &seller, body).await?))
}

/// `PUT /products/:id`
pub async fn update_product(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Path(product_id): Path<i64>,
    ApiJson(body): ApiJson<catalog::ProductUpdate>,
) -> ApiResult<product::Model> {
    Ok(ok(
        catalog::update_product(&state.db, &seller, product_id, body).await?,
    ))
}

/// `DELETE /products/:id`
pub async fn delete_product(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Path(product_id): Path<i64>,
) -> ApiResult<product::Model> {
    Ok(ok(catalog::delete_product(&state.db, &seller, product_id).await?))
}

/// `GET /course` - served from the catalog cache.
pub async fn list_courses(State(state): State<AppState>) -> ApiResult<Vec<course::Model>> {
    Ok(ok(state.catalog_cache.published_courses(&state.db).await?))
}

/// `GET /course/:id`
///
/// Drafts are only visible to their instructor and admins. Lecture video
/// URLs are withheld from users without access to the course.
pub async fn get_course(
    State(state): State<AppState>,
    viewer: Option<AuthUser>,
    Path(course_id): Path<i64>,
) -> ApiResult<catalog::CourseDetail> {
    let mut detail = catalog::get_course_detail(&state.db, course_id).await?;
    let viewer = viewer.map(|auth| auth.user);

    let is_staff = viewer
        .as_ref()
        .is_some_and(|u| u.role == Role::Admin || u.id == detail.course.instructor_id);
    if !detail.course.is_published && !is_staff {
        return Err(crate::errors::Error::not_found("Course", course_id));
    }

    let has_access = match &viewer {
        Some(user) => enrollment::has_access(&state.db, user, course_id).await?,
        None => false,
    };
    if !has_access {
        for lecture in &mut detail.lectures {
            lecture.video_url.clear();
        }
    }
    Ok(ok(detail))
}

/// `POST /course`
pub async fn create_course(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    ApiJson(body): ApiJson<catalog::NewCourse>,
) -> ApiResult<course::Model> {
    let created = catalog::create_course(&state.db, &seller, body).await?;
    state.catalog_cache.invalidate().await;
    Ok(ok(created))
}

/// `PUT /course/:id`
pub async fn update_course(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Path(course_id): Path<i64>,
    ApiJson(body): ApiJson<catalog::CourseUpdate>,
) -> ApiResult<course::Model> {
    let updated = catalog::update_course(&state.db, &seller, course_id, body).await?;
    state.catalog_cache.invalidate().await;
    Ok(ok(updated))
}

/// `POST /course/:id/publish`
pub async fn publish_course(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Path(course_id): Path<i64>,
) -> ApiResult<course::Model> {
    let published = catalog::publish_course(&state.db, &seller, course_id).await?;
    state.catalog_cache.invalidate().await;
    Ok(ok(published))
}

/// `DELETE /course/:id`
pub async fn delete_course(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Path(course_id): Path<i64>,
) -> ApiResult<course::Model> {
    let deleted = catalog::delete_course(&state.db, &seller, course_id).await?;
    state.catalog_cache.invalidate().await;
    Ok(ok(deleted))
}

/// `POST /course/:id/lectures`
pub async fn add_lecture(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Path(course_id): Path<i64>,
    ApiJson(body): ApiJson<catalog::NewLecture>,
) -> ApiResult<lecture::Model> {
    let created = catalog::add_lecture(&state.db, &seller, course_id, body).await?;
    state.catalog_cache.invalidate().await;
    Ok(ok(created))
}

/// `POST /course/:id/subscribe` - starts a subscription payment.
pub async fn subscribe(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(course_id): Path<i64>,
) -> ApiResult<payment::CheckoutIntent> {
    let checkout = payment::create_subscription_payment(
        &state.db,
        state.gateway.as_ref(),
        &auth.user,
        course_id,
        &state.settings.currency,
    )
    .await?;
    Ok(ok(checkout))
}
