//! Order endpoints under `/order`.

use super::{ApiJson, ApiResult, AppState, AuthUser, SellerUser, ok};
use crate::core::order;
use crate::entities::order::OrderStatus;
use axum::extract::{Path, State};
use chrono::NaiveDate;
use serde::Deserialize;

/// Status change body.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

/// Tracking body.
#[derive(Debug, Deserialize)]
pub struct TrackingRequest {
    pub tracking_number: String,
    #[serde(default)]
    pub expected_delivery: Option<NaiveDate>,
}

/// `POST /order`
pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<order::NewOrder>,
) -> ApiResult<order::OrderDetail> {
    let detail = order::create_order(&state.db, &auth.user, body, state.seller_share_percent()).await?;
    Ok(ok(detail))
}

/// `GET /order/mine`
pub async fn my_orders(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Vec<order::OrderDetail>> {
    Ok(ok(order::list_orders_for_buyer(&state.db, auth.user.id).await?))
}

/// `GET /order/:id`
pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(order_id): Path<i64>,
) -> ApiResult<order::OrderDetail> {
    Ok(ok(order::get_order(&state.db, &auth.user, order_id).await?))
}

/// `PUT /order/:id/status`
pub async fn update_status(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Path(order_id): Path<i64>,
    ApiJson(body): ApiJson<StatusRequest>,
) -> ApiResult<order::OrderDetail> {
    Ok(ok(
        order::update_order_status(&state.db, &seller, order_id, body.status).await?,
    ))
}

/// `PUT /order/:id/tracking`
pub async fn set_tracking(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    Path(order_id): Path<i64>,
    ApiJson(body): ApiJson<TrackingRequest>,
) -> ApiResult<order::OrderDetail> {
    let detail = order::set_tracking(
        &state.db,
        &seller,
        order_id,
        body.tracking_number,
        body.expected_delivery,
    )
    .await?;
    Ok(ok(detail))
}
