//! Order business logic - Checkout and the order lifecycle.
//!
//! Checkout runs in one database transaction: stock is decremented with a
//! conditional update (`stock >= quantity`), so a shortfall on any line aborts
//! the whole order and leaves every product's stock unchanged. Status changes
//! follow the legal transition table on [`OrderStatus`]; cancelling an order
//! restocks its products and reverses any credited earnings.

use super::{earnings, enrollment};
use crate::{
    entities::{
        Course, Order, OrderItem, Product, course, order, order::OrderKind, order::OrderStatus,
        order::PaymentStatus, order_item, product, user, user::Role,
    },
    errors::{Error, Result},
};
use chrono::{NaiveDate, Utc};
use sea_orm::{QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{info, instrument, warn};

/// One requested line at checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrderItem {
    /// Product to buy (product orders)
    #[serde(default)]
    pub product_id: Option<i64>,
    /// Course to buy (course orders)
    #[serde(default)]
    pub course_id: Option<i64>,
    /// Units; defaults to 1 and is forced to 1 for courses
    #[serde(default)]
    pub quantity: Option<i32>,
}

/// Where a product order ships to.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ShippingAddress {
    pub line1: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// Checkout request.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    /// Products or course access
    pub kind: OrderKind,
    /// Requested lines
    pub items: Vec<NewOrderItem>,
    /// Required for product orders
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
    /// Payment method label; defaults to "card"
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Total the client displayed; must match the computed total when given
    #[serde(default)]
    pub expected_total: Option<i64>,
}

/// An order with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderDetail {
    /// The order
    #[serde(flatten)]
    pub order: order::Model,
    /// Its line items
    pub items: Vec<order_item::Model>,
}

struct PricedLine {
    product_id: Option<i64>,
    course_id: Option<i64>,
    seller_id: i64,
    quantity: i32,
    unit_price: i64,
}

/// Places an order for `buyer`.
#[instrument(skip(db, buyer, input), fields(buyer_id = buyer.id, kind = ?input.kind))]
pub async fn create_order(
    db: &DatabaseConnection,
    buyer: &user::Model,
    input: NewOrder,
    seller_share_percent: u8,
) -> Result<OrderDetail> {
    if input.items.is_empty() {
        return Err(Error::validation("An order needs at least one item"));
    }

    let shipping = match input.kind {
        OrderKind::Product => Some(validate_shipping(input.shipping_address.as_ref())?),
        OrderKind::Course => None,
    };

    let txn = db.begin().await?;

    let lines = match input.kind {
        OrderKind::Product => reserve_products(&txn, buyer, &input.items).await?,
        OrderKind::Course => price_courses(&txn, buyer, &input.items).await?,
    };

    let mut total: i64 = 0;
    let mut line_totals = Vec::with_capacity(lines.len());
    for line in &lines {
        let line_total = line
            .unit_price
            .checked_mul(i64::from(line.quantity))
            .ok_or(Error::InvalidAmount {
                amount: line.unit_price,
            })?;
        total = total
            .checked_add(line_total)
            .ok_or(Error::InvalidAmount { amount: line_total })?;
        line_totals.push(line_total);
    }

    if let Some(expected) = input.expected_total {
        if expected != total {
            return Err(Error::validation(format!(
                "Order total mismatch: expected {expected}, computed {total}"
            )));
        }
    }

    // Free orders have nothing to charge and settle at checkout.
    let (status, payment_status) = if total == 0 {
        match input.kind {
            OrderKind::Course => (OrderStatus::Completed, PaymentStatus::Paid),
            OrderKind::Product => (OrderStatus::Processing, PaymentStatus::Paid),
        }
    } else {
        (OrderStatus::Pending, PaymentStatus::Pending)
    };

    let now = Utc::now();
    let order = order::ActiveModel {
        buyer_id: Set(buyer.id),
        kind: Set(input.kind),
        total_amount: Set(total),
        status: Set(status),
        payment_status: Set(payment_status),
        payment_method: Set(input
            .payment_method
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "card".to_string())),
        shipping_line1: Set(shipping.as_ref().map(|s| s.line1.clone())),
        shipping_city: Set(shipping.as_ref().map(|s| s.city.clone())),
        shipping_postal_code: Set(shipping.as_ref().map(|s| s.postal_code.clone())),
        shipping_country: Set(shipping.as_ref().map(|s| s.country.clone())),
        tracking_number: Set(None),
        expected_delivery: Set(None),
        earnings_credited: Set(false),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(lines.len());
    for (line, line_total) in lines.into_iter().zip(line_totals) {
        let (share, _fee) = earnings::split_earnings(line_total, seller_share_percent);
        let item = order_item::ActiveModel {
            order_id: Set(order.id),
            product_id: Set(line.product_id),
            course_id: Set(line.course_id),
            seller_id: Set(line.seller_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            line_total: Set(line_total),
            earnings: Set(share),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        items.push(item);
    }

    txn.commit().await?;

    info!(
        order_id = order.id,
        total = order.total_amount,
        items = items.len(),
        "Order created"
    );
    Ok(OrderDetail { order, items })
}

fn validate_shipping(address: Option<&ShippingAddress>) -> Result<ShippingAddress> {
    let address =
        address.ok_or_else(|| Error::validation("Shipping address is required for product orders"))?;
    let fields = [
        &address.line1,
        &address.city,
        &address.postal_code,
        &address.country,
    ];
    if fields.iter().any(|f| f.trim().is_empty()) {
        return Err(Error::validation("Shipping address is incomplete"));
    }
    Ok(ShippingAddress {
        line1: address.line1.trim().to_string(),
        city: address.city.trim().to_string(),
        postal_code: address.postal_code.trim().to_string(),
        country: address.country.trim().to_string(),
    })
}

/// Validates product lines and decrements stock for each of them.
async fn reserve_products<C>(
    db: &C,
    buyer: &user::Model,
    items: &[NewOrderItem],
) -> Result<Vec<PricedLine>>
where
    C: ConnectionTrait,
{
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let product_id = item
            .product_id
            .ok_or_else(|| Error::validation("Product orders need a product_id on every item"))?;
        let quantity = item.quantity.unwrap_or(1);
        if quantity < 1 {
            return Err(Error::validation("Quantity must be at least 1"));
        }

        let product = Product::find_by_id(product_id)
            .filter(product::Column::IsDeleted.eq(false))
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Product", product_id))?;
        if product.seller_id == buyer.id {
            return Err(Error::validation("You cannot buy your own product"));
        }

        let reserved = Product::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).sub(quantity),
            )
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::Stock.gte(quantity))
            .exec(db)
            .await?;
        if reserved.rows_affected == 0 {
            let available = Product::find_by_id(product_id)
                .one(db)
                .await?
                .map_or(0, |p| p.stock);
            warn!(product_id, available, requested = quantity, "Insufficient stock");
            return Err(Error::InsufficientStock {
                product_id,
                available,
                requested: quantity,
            });
        }

        lines.push(PricedLine {
            product_id: Some(product_id),
            course_id: None,
            seller_id: product.seller_id,
            quantity,
            unit_price: product.price,
        });
    }
    Ok(lines)
}

/// Validates course lines; each course may appear once and must not be owned already.
async fn price_courses<C>(
    db: &C,
    buyer: &user::Model,
    items: &[NewOrderItem],
) -> Result<Vec<PricedLine>>
where
    C: ConnectionTrait,
{
    let mut owned = enrollment::purchased_course_ids(db, buyer.id).await?;
    owned.extend(enrollment::subscribed_course_ids(db, buyer.id).await?);
    let mut seen = BTreeSet::new();
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        let course_id = item
            .course_id
            .ok_or_else(|| Error::validation("Course orders need a course_id on every item"))?;
        if !seen.insert(course_id) {
            continue;
        }

        let course = Course::find_by_id(course_id)
            .filter(course::Column::IsDeleted.eq(false))
            .filter(course::Column::IsPublished.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| Error::not_found("Course", course_id))?;
        if course.instructor_id == buyer.id {
            return Err(Error::validation("You cannot buy your own course"));
        }
        if owned.contains(&course_id) {
            return Err(Error::conflict(format!(
                "Already enrolled in course {course_id}"
            )));
        }

        lines.push(PricedLine {
            product_id: None,
            course_id: Some(course_id),
            seller_id: course.instructor_id,
            quantity: 1,
            unit_price: course.price,
        });
    }
    Ok(lines)
}

async fn load_detail<C>(db: &C, order: order::Model) -> Result<OrderDetail>
where
    C: ConnectionTrait,
{
    let items = order
        .find_related(OrderItem)
        .order_by_asc(order_item::Column::Id)
        .all(db)
        .await?;
    Ok(OrderDetail { order, items })
}

async fn find_order<C>(db: &C, order_id: i64) -> Result<order::Model>
where
    C: ConnectionTrait,
{
    Order::find_by_id(order_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Order", order_id))
}

/// Whether `seller_id` sells at least one line of the order.
pub async fn seller_has_item<C>(db: &C, order_id: i64, seller_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .filter(order_item::Column::SellerId.eq(seller_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

async fn require_fulfiller<C>(db: &C, actor: &user::Model, order_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    if actor.role == Role::Admin || seller_has_item(db, order_id, actor.id).await? {
        Ok(())
    } else {
        Err(Error::forbidden("Only the order's sellers or an admin can do this"))
    }
}

/// Retrieves an order visible to `actor`: its buyer, one of its sellers, or an admin.
pub async fn get_order(
    db: &DatabaseConnection,
    actor: &user::Model,
    order_id: i64,
) -> Result<OrderDetail> {
    let order = find_order(db, order_id).await?;
    let visible = order.buyer_id == actor.id
        || actor.role == Role::Admin
        || seller_has_item(db, order_id, actor.id).await?;
    if !visible {
        // Hide existence from unrelated users.
        return Err(Error::not_found("Order", order_id));
    }
    load_detail(db, order).await
}

/// Orders placed by `buyer_id`, newest first.
pub async fn list_orders_for_buyer(
    db: &DatabaseConnection,
    buyer_id: i64,
) -> Result<Vec<OrderDetail>> {
    let orders = Order::find()
        .filter(order::Column::BuyerId.eq(buyer_id))
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;
    let mut details = Vec::with_capacity(orders.len());
    for order in orders {
        details.push(load_detail(db, order).await?);
    }
    Ok(details)
}

/// Orders containing at least one line sold by `seller_id`, newest first.
/// Only the seller's own lines are included in each detail.
pub async fn list_orders_for_seller(
    db: &DatabaseConnection,
    seller_id: i64,
) -> Result<Vec<OrderDetail>> {
    let order_ids: Vec<i64> = OrderItem::find()
        .select_only()
        .column(order_item::Column::OrderId)
        .distinct()
        .filter(order_item::Column::SellerId.eq(seller_id))
        .into_tuple()
        .all(db)
        .await?;
    if order_ids.is_empty() {
        return Ok(Vec::new());
    }

    let orders = Order::find()
        .filter(order::Column::Id.is_in(order_ids))
        .order_by_desc(order::Column::Id)
        .all(db)
        .await?;
    let mut details = Vec::with_capacity(orders.len());
    for order in orders {
        let items = order
            .find_related(OrderItem)
            .filter(order_item::Column::SellerId.eq(seller_id))
            .order_by_asc(order_item::Column::Id)
            .all(db)
            .await?;
        details.push(OrderDetail { order, items });
    }
    Ok(details)
}

/// All orders, newest first, optionally filtered by status.
pub async fn list_all_orders(
    db: &DatabaseConnection,
    status: Option<OrderStatus>,
) -> Result<Vec<order::Model>> {
    let mut query = Order::find();
    if let Some(status) = status {
        query = query.filter(order::Column::Status.eq(status));
    }
    query
        .order_by_desc(order::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Moves an order to `next` if the transition is legal.
#[instrument(skip(db, actor), fields(actor_id = actor.id))]
pub async fn update_order_status(
    db: &DatabaseConnection,
    actor: &user::Model,
    order_id: i64,
    next: OrderStatus,
) -> Result<OrderDetail> {
    let txn = db.begin().await?;

    let order = find_order(&txn, order_id).await?;
    require_fulfiller(&txn, actor, order_id).await?;

    if !order.status.can_transition_to(next) {
        return Err(Error::InvalidTransition {
            from: order.status.as_str().to_string(),
            to: next.as_str().to_string(),
        });
    }
    if matches!(next, OrderStatus::Processing | OrderStatus::Completed)
        && order.payment_status != PaymentStatus::Paid
    {
        return Err(Error::validation(format!(
            "Order {order_id} must be paid before it can become {}",
            next.as_str()
        )));
    }

    if next == OrderStatus::Cancelled {
        restock(&txn, order_id).await?;
        earnings::reverse_order_earnings(&txn, order_id).await?;
    }

    let previous = order.status;
    let mut active: order::ActiveModel = order.into();
    active.status = Set(next);
    active.updated_at = Set(Utc::now());
    let updated = active.update(&txn).await?;
    let detail = load_detail(&txn, updated).await?;

    txn.commit().await?;
    info!(order_id, from = previous.as_str(), to = next.as_str(), "Order status changed");
    Ok(detail)
}

async fn restock<C>(db: &C, order_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .filter(order_item::Column::ProductId.is_not_null())
        .all(db)
        .await?;
    for item in items {
        let Some(product_id) = item.product_id else {
            continue;
        };
        Product::update_many()
            .col_expr(
                product::Column::Stock,
                Expr::col(product::Column::Stock).add(item.quantity),
            )
            .filter(product::Column::Id.eq(product_id))
            .exec(db)
            .await?;
    }
    Ok(())
}

/// Records shipment tracking on a product order.
pub async fn set_tracking(
    db: &DatabaseConnection,
    actor: &user::Model,
    order_id: i64,
    tracking_number: String,
    expected_delivery: Option<NaiveDate>,
) -> Result<OrderDetail> {
    let order = find_order(db, order_id).await?;
    require_fulfiller(db, actor, order_id).await?;

    if order.kind != OrderKind::Product {
        return Err(Error::validation("Only product orders can be tracked"));
    }
    if order.status == OrderStatus::Cancelled {
        return Err(Error::validation("Cancelled orders cannot be tracked"));
    }
    let tracking_number = tracking_number.trim().to_string();
    if tracking_number.is_empty() {
        return Err(Error::validation("Tracking number cannot be empty"));
    }

    let mut active: order::ActiveModel = order.into();
    active.tracking_number = Set(Some(tracking_number));
    active.expected_delivery = Set(expected_delivery);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;
    load_detail(db, updated).await
}
