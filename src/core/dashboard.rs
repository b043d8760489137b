//! Dashboard business logic - Read-only aggregations for sellers and admins.
//!
//! Revenue only counts orders that are paid and not cancelled, the same rule
//! the earnings ledger uses to credit sellers.

use super::earnings;
use crate::{
    entities::{
        Course, Order, OrderItem, Product, User, course, earnings_entry, order,
        order::OrderStatus, order::PaymentStatus, order_item, product, user, user::Role,
    },
    errors::{Error, Result},
};
use sea_orm::{JoinType, QuerySelect, prelude::*};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, instrument};

/// Entries shown in the "recent earnings" panel.
const RECENT_ENTRIES: u64 = 10;
/// Sellers listed in the admin top-sellers panel.
const TOP_SELLERS: usize = 5;

/// Sales figures for one product or course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemSales {
    /// Product sold, if a product
    pub product_id: Option<i64>,
    /// Course sold, if a course
    pub course_id: Option<i64>,
    /// Product name or course title
    pub title: String,
    /// Units sold
    pub units: i64,
    /// Gross sales in cents
    pub gross: i64,
    /// Seller share in cents
    pub revenue: i64,
}

/// Seller dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct SellerDashboard {
    /// Seller share over paid, non-cancelled orders
    pub total_revenue: i64,
    /// Gross sales over the same orders
    pub gross_sales: i64,
    /// Units sold
    pub units_sold: i64,
    /// Paid, non-cancelled orders containing the seller's items
    pub order_count: u64,
    /// Paid orders still waiting to be fulfilled
    pub orders_to_fulfil: u64,
    /// Sales per product or course, best first
    pub items: Vec<ItemSales>,
    /// Current earnings balance
    pub balance: i64,
    /// Latest ledger entries
    pub recent_earnings: Vec<earnings_entry::Model>,
}

/// A seller ranked by revenue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopSeller {
    /// Seller id
    pub seller_id: i64,
    /// Seller display name
    pub name: String,
    /// Seller share over paid, non-cancelled orders
    pub revenue: i64,
}

/// Admin dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct AdminDashboard {
    /// Users per role
    pub users_by_role: BTreeMap<String, u64>,
    /// Orders per status
    pub orders_by_status: BTreeMap<String, u64>,
    /// Gross over paid, non-cancelled orders
    pub gross_sales: i64,
    /// Platform share of `gross_sales`
    pub platform_fees: i64,
    /// Gross per month (`YYYY-MM`)
    pub monthly_revenue: BTreeMap<String, i64>,
    /// Best sellers by revenue
    pub top_sellers: Vec<TopSeller>,
}

/// Items in paid, non-cancelled orders, optionally limited to one seller.
async fn settled_items(
    db: &DatabaseConnection,
    seller_id: Option<i64>,
) -> Result<Vec<order_item::Model>> {
    let mut query = OrderItem::find()
        .join(JoinType::InnerJoin, order_item::Relation::Order.def())
        .filter(order::Column::PaymentStatus.eq(PaymentStatus::Paid))
        .filter(order::Column::Status.ne(OrderStatus::Cancelled));
    if let Some(seller_id) = seller_id {
        query = query.filter(order_item::Column::SellerId.eq(seller_id));
    }
    query.all(db).await.map_err(Into::into)
}

/// Builds the dashboard for `seller_id`.
#[instrument(skip(db))]
pub async fn seller_dashboard(db: &DatabaseConnection, seller_id: i64) -> Result<SellerDashboard> {
    let seller = User::find_by_id(seller_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", seller_id))?;
    let items = settled_items(db, Some(seller_id)).await?;
    debug!(items = items.len(), "Loaded settled items");

    let mut order_ids = BTreeSet::new();
    let mut per_item: BTreeMap<(Option<i64>, Option<i64>), ItemSales> = BTreeMap::new();
    for item in &items {
        order_ids.insert(item.order_id);
        let sales = per_item
            .entry((item.product_id, item.course_id))
            .or_insert_with(|| ItemSales {
                product_id: item.product_id,
                course_id: item.course_id,
                title: String::new(),
                units: 0,
                gross: 0,
                revenue: 0,
            });
        sales.units += i64::from(item.quantity);
        sales.gross += item.line_total;
        sales.revenue += item.earnings;
    }

    let titles = item_titles(db, per_item.keys()).await?;
    let mut breakdown: Vec<ItemSales> = per_item
        .into_values()
        .map(|mut sales| {
            let key = (sales.product_id, sales.course_id);
            sales.title = titles.get(&key).cloned().unwrap_or_default();
            sales
        })
        .collect();
    breakdown.sort_by(|a, b| b.revenue.cmp(&a.revenue).then_with(|| a.title.cmp(&b.title)));

    let orders_to_fulfil = if order_ids.is_empty() {
        0
    } else {
        Order::find()
            .filter(order::Column::Id.is_in(order_ids.iter().copied()))
            .filter(order::Column::Status.eq(OrderStatus::Processing))
            .count(db)
            .await?
    };

    Ok(SellerDashboard {
        total_revenue: items.iter().map(|i| i.earnings).sum(),
        gross_sales: items.iter().map(|i| i.line_total).sum(),
        units_sold: items.iter().map(|i| i64::from(i.quantity)).sum(),
        order_count: order_ids.len() as u64,
        orders_to_fulfil,
        items: breakdown,
        balance: seller.earnings,
        recent_earnings: earnings::earnings_history(db, seller_id, Some(RECENT_ENTRIES)).await?,
    })
}

async fn item_titles<'a, I>(
    db: &DatabaseConnection,
    keys: I,
) -> Result<HashMap<(Option<i64>, Option<i64>), String>>
where
    I: Iterator<Item = &'a (Option<i64>, Option<i64>)>,
{
    let (mut product_ids, mut course_ids) = (Vec::new(), Vec::new());
    for (product_id, course_id) in keys {
        product_ids.extend(*product_id);
        course_ids.extend(*course_id);
    }

    let mut titles = HashMap::new();
    if !product_ids.is_empty() {
        for p in Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await?
        {
            titles.insert((Some(p.id), None), p.name);
        }
    }
    if !course_ids.is_empty() {
        for c in Course::find()
            .filter(course::Column::Id.is_in(course_ids))
            .all(db)
            .await?
        {
            titles.insert((None, Some(c.id)), c.title);
        }
    }
    Ok(titles)
}

/// Builds the platform-wide dashboard.
#[instrument(skip(db))]
pub async fn admin_dashboard(db: &DatabaseConnection) -> Result<AdminDashboard> {
    let mut users_by_role = BTreeMap::new();
    for role in [Role::User, Role::Seller, Role::Admin] {
        let count = User::find()
            .filter(user::Column::Role.eq(role))
            .count(db)
            .await?;
        users_by_role.insert(role.as_str().to_string(), count);
    }

    let mut orders_by_status = BTreeMap::new();
    for status in [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ] {
        let count = Order::find()
            .filter(order::Column::Status.eq(status))
            .count(db)
            .await?;
        orders_by_status.insert(status.as_str().to_string(), count);
    }

    let settled_orders = Order::find()
        .filter(order::Column::PaymentStatus.eq(PaymentStatus::Paid))
        .filter(order::Column::Status.ne(OrderStatus::Cancelled))
        .all(db)
        .await?;
    let mut monthly_revenue = BTreeMap::new();
    for order in &settled_orders {
        *monthly_revenue
            .entry(order.created_at.format("%Y-%m").to_string())
            .or_insert(0) += order.total_amount;
    }
    let gross_sales: i64 = settled_orders.iter().map(|o| o.total_amount).sum();

    let items = settled_items(db, None).await?;
    let seller_share: i64 = items.iter().map(|i| i.earnings).sum();

    let mut per_seller: HashMap<i64, i64> = HashMap::new();
    for item in &items {
        *per_seller.entry(item.seller_id).or_insert(0) += item.earnings;
    }
    let mut ranked: Vec<(i64, i64)> = per_seller.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(TOP_SELLERS);

    let names: HashMap<i64, String> = User::find()
        .filter(user::Column::Id.is_in(ranked.iter().map(|(id, _)| *id)))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();
    let top_sellers = ranked
        .into_iter()
        .map(|(seller_id, revenue)| TopSeller {
            seller_id,
            name: names.get(&seller_id).cloned().unwrap_or_default(),
            revenue,
        })
        .collect();

    Ok(AdminDashboard {
        users_by_role,
        orders_by_status,
        gross_sales,
        platform_fees: gross_sales - seller_share,
        monthly_revenue,
        top_sellers,
    })
}
