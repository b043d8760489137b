//! Seller endpoints under `/seller` and admin endpoints under `/admin`.

use super::{AdminUser, ApiResult, AppState, SellerUser, ok};
use crate::{
    core::{catalog, dashboard, earnings, order, user as users},
    entities::{course, earnings_entry, order::OrderStatus, product, user},
};
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

/// `?limit=` for the earnings history.
#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u64>,
}

/// `?status=` for the admin order listing.
#[derive(Debug, Default, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
}

/// Balance summary plus ledger entries.
#[derive(Debug, Serialize)]
pub struct EarningsView {
    #[serde(flatten)]
    pub summary: earnings::EarningsSummary,
    pub history: Vec<earnings_entry::Model>,
}

/// `GET /seller/dashboard`
pub async fn seller_dashboard(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> ApiResult<dashboard::SellerDashboard> {
    Ok(ok(dashboard::seller_dashboard(&state.db, seller.id).await?))
}

/// `GET /seller/orders`
pub async fn seller_orders(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> ApiResult<Vec<order::OrderDetail>> {
    Ok(ok(order::list_orders_for_seller(&state.db, seller.id).await?))
}

/// `GET /seller/earnings`
pub async fn seller_earnings(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<EarningsView> {
    let summary = earnings::earnings_summary(&state.db, seller.id).await?;
    let history = earnings::earnings_history(&state.db, seller.id, query.limit).await?;
    Ok(ok(EarningsView { summary, history }))
}

/// `GET /seller/products`
pub async fn seller_products(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> ApiResult<Vec<product::Model>> {
    Ok(ok(catalog::list_products_for_seller(&state.db, seller.id).await?))
}

/// `GET /seller/courses`
pub async fn seller_courses(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> ApiResult<Vec<course::Model>> {
    Ok(ok(catalog::list_courses_for_instructor(&state.db, seller.id).await?))
}

/// `GET /admin/dashboard`
pub async fn admin_dashboard(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<dashboard::AdminDashboard> {
    Ok(ok(dashboard::admin_dashboard(&state.db).await?))
}

/// `GET /admin/orders`
pub async fn admin_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<OrderFilter>,
) -> ApiResult<Vec<crate::entities::order::Model>> {
    Ok(ok(order::list_all_orders(&state.db, filter.status).await?))
}

/// `GET /admin/users`
pub async fn admin_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> ApiResult<Vec<user::Model>> {
    Ok(ok(users::list_users(&state.db).await?))
}
