//! Earnings ledger business logic.
//!
//! This is the single place seller balances change. Each credit or reversal
//! appends ledger entries and adjusts `users.earnings` in the caller's database
//! transaction. A conditional flag flip (`earnings_credited`) on the order or
//! payment acts as the guard, so repeating a credit is a no-op instead of a
//! double payout.

use crate::{
    entities::{
        EarningsEntry, Order, OrderItem, Payment, User, earnings_entry,
        earnings_entry::EntryKind, order, order::OrderStatus, order::PaymentStatus, order_item,
        payment, user,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, QuerySelect, Set, prelude::*, sea_query::Expr};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Splits a gross amount into `(seller_share, platform_fee)`.
///
/// The seller share rounds down; the platform keeps the remainder so the two
/// parts always add up to `gross`. Percentages above 100 are clamped.
#[must_use]
pub fn split_earnings(gross: i64, seller_share_percent: u8) -> (i64, i64) {
    let percent = i128::from(seller_share_percent.min(100));
    // |share| <= |gross| once the percent is clamped, so it fits back in i64.
    let share = i64::try_from(i128::from(gross) * percent / 100).unwrap_or(gross);
    (share, gross - share)
}

/// Balance and lifetime totals for one seller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EarningsSummary {
    /// Current balance in cents
    pub balance: i64,
    /// Sum of gross amounts over all entries
    pub lifetime_gross: i64,
    /// Sum of platform fees over all entries
    pub lifetime_fees: i64,
    /// Number of ledger entries
    pub entry_count: u64,
}

/// Atomically adds `delta` to a user's balance: `earnings = earnings + delta`.
pub async fn apply_balance_delta<C>(db: &C, user_id: i64, delta: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let result = User::update_many()
        .col_expr(
            user::Column::Earnings,
            Expr::col(user::Column::Earnings).add(delta),
        )
        .filter(user::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(Error::not_found("User", user_id));
    }
    Ok(())
}

async fn append_entry<C>(db: &C, entry: earnings_entry::ActiveModel) -> Result<earnings_entry::Model>
where
    C: ConnectionTrait,
{
    let entry = entry.insert(db).await?;
    apply_balance_delta(db, entry.seller_id, entry.amount).await?;
    Ok(entry)
}

/// Credits every seller on a paid order with their share, at most once.
///
/// Returns the entries written; an empty list means the order was already
/// credited, is not paid, or is cancelled.
#[instrument(skip(db))]
pub async fn credit_order_earnings<C>(db: &C, order_id: i64) -> Result<Vec<earnings_entry::Model>>
where
    C: ConnectionTrait,
{
    let guard = Order::update_many()
        .col_expr(order::Column::EarningsCredited, Expr::value(true))
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::EarningsCredited.eq(false))
        .filter(order::Column::PaymentStatus.eq(PaymentStatus::Paid))
        .filter(order::Column::Status.ne(OrderStatus::Cancelled))
        .exec(db)
        .await?;

    if guard.rows_affected == 0 {
        info!(order_id, "Order earnings already credited or order not creditable");
        return Ok(Vec::new());
    }

    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(db)
        .await?;

    // seller -> (gross, share)
    let mut per_seller: BTreeMap<i64, (i64, i64)> = BTreeMap::new();
    for item in &items {
        let totals = per_seller.entry(item.seller_id).or_default();
        totals.0 += item.line_total;
        totals.1 += item.earnings;
    }

    let now = Utc::now();
    let mut entries = Vec::with_capacity(per_seller.len());
    for (seller_id, (gross, share)) in per_seller {
        let entry = append_entry(
            db,
            earnings_entry::ActiveModel {
                seller_id: Set(seller_id),
                order_id: Set(Some(order_id)),
                subscription_id: Set(None),
                kind: Set(EntryKind::Sale),
                gross_amount: Set(gross),
                amount: Set(share),
                platform_fee: Set(gross - share),
                created_at: Set(now),
                ..Default::default()
            },
        )
        .await?;
        info!(order_id, seller_id, amount = share, "Credited seller earnings");
        entries.push(entry);
    }

    Ok(entries)
}

/// Undoes the credited earnings of an order, at most once per credit.
///
/// One negative `reversal` entry is written for each seller whose net
/// earnings on the order are non-zero.
#[instrument(skip(db))]
pub async fn reverse_order_earnings<C>(db: &C, order_id: i64) -> Result<Vec<earnings_entry::Model>>
where
    C: ConnectionTrait,
{
    let guard = Order::update_many()
        .col_expr(order::Column::EarningsCredited, Expr::value(false))
        .filter(order::Column::Id.eq(order_id))
        .filter(order::Column::EarningsCredited.eq(true))
        .exec(db)
        .await?;

    if guard.rows_affected == 0 {
        return Ok(Vec::new());
    }

    let existing = EarningsEntry::find()
        .filter(earnings_entry::Column::OrderId.eq(order_id))
        .all(db)
        .await?;

    // seller -> (gross, amount, fee) net over previous credits and reversals
    let mut net: BTreeMap<i64, (i64, i64, i64)> = BTreeMap::new();
    for entry in &existing {
        let totals = net.entry(entry.seller_id).or_default();
        totals.0 += entry.gross_amount;
        totals.1 += entry.amount;
        totals.2 += entry.platform_fee;
    }

    let now = Utc::now();
    let mut reversals = Vec::new();
    for (seller_id, (gross, amount, fee)) in net {
        if amount == 0 && gross == 0 {
            continue;
        }
        let entry = append_entry(
            db,
            earnings_entry::ActiveModel {
                seller_id: Set(seller_id),
                order_id: Set(Some(order_id)),
                subscription_id: Set(None),
                kind: Set(EntryKind::Reversal),
                gross_amount: Set(-gross),
                amount: Set(-amount),
                platform_fee: Set(-fee),
                created_at: Set(now),
                ..Default::default()
            },
        )
        .await?;
        info!(order_id, seller_id, amount = -amount, "Reversed seller earnings");
        reversals.push(entry);
    }

    Ok(reversals)
}

/// Credits the instructor for one subscription payment, at most once.
#[instrument(skip(db))]
pub async fn credit_subscription_earnings<C>(
    db: &C,
    payment_id: i64,
    subscription_id: i64,
    instructor_id: i64,
    gross: i64,
    seller_share_percent: u8,
) -> Result<Option<earnings_entry::Model>>
where
    C: ConnectionTrait,
{
    let guard = Payment::update_many()
        .col_expr(payment::Column::EarningsCredited, Expr::value(true))
        .filter(payment::Column::Id.eq(payment_id))
        .filter(payment::Column::EarningsCredited.eq(false))
        .exec(db)
        .await?;

    if guard.rows_affected == 0 {
        return Ok(None);
    }

    let (share, fee) = split_earnings(gross, seller_share_percent);
    let entry = append_entry(
        db,
        earnings_entry::ActiveModel {
            seller_id: Set(instructor_id),
            order_id: Set(None),
            subscription_id: Set(Some(subscription_id)),
            kind: Set(EntryKind::Subscription),
            gross_amount: Set(gross),
            amount: Set(share),
            platform_fee: Set(fee),
            created_at: Set(Utc::now()),
            ..Default::default()
        },
    )
    .await?;
    info!(subscription_id, instructor_id, amount = share, "Credited subscription earnings");
    Ok(Some(entry))
}

/// Ledger entries for a seller, newest first.
pub async fn earnings_history(
    db: &DatabaseConnection,
    seller_id: i64,
    limit: Option<u64>,
) -> Result<Vec<earnings_entry::Model>> {
    let mut query = EarningsEntry::find()
        .filter(earnings_entry::Column::SellerId.eq(seller_id))
        .order_by_desc(earnings_entry::Column::CreatedAt)
        .order_by_desc(earnings_entry::Column::Id);
    if let Some(limit) = limit {
        query = query.limit(limit);
    }
    query.all(db).await.map_err(Into::into)
}

/// Balance and lifetime totals for a seller.
pub async fn earnings_summary(db: &DatabaseConnection, seller_id: i64) -> Result<EarningsSummary> {
    let seller = User::find_by_id(seller_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("User", seller_id))?;
    let entries = earnings_history(db, seller_id, None).await?;

    Ok(EarningsSummary {
        balance: seller.earnings,
        lifetime_gross: entries.iter().map(|e| e.gross_amount).sum(),
        lifetime_fees: entries.iter().map(|e| e.platform_fee).sum(),
        entry_count: entries.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn test_split_earnings() {
        assert_eq!(split_earnings(10_000, 80), (8_000, 2_000));
        assert_eq!(split_earnings(999, 80), (799, 200));
        assert_eq!(split_earnings(1, 80), (0, 1));
        assert_eq!(split_earnings(0, 80), (0, 0));
        assert_eq!(split_earnings(1234, 100), (1234, 0));
        assert_eq!(
            split_earnings(i64::MAX, 80),
            (7_378_697_629_483_820_645, 1_844_674_407_370_955_162)
        );
    }

    #[tokio::test]
    async fn test_credit_is_idempotent() -> Result<()> {
        let fx = paid_product_order_fixture().await?;

        // The fixture already credited once through payment verification.
        let again = credit_order_earnings(&fx.db, fx.order_id).await?;
        assert!(again.is_empty());

        let seller = User::find_by_id(fx.seller.id).one(&fx.db).await?;
        assert_eq!(seller.map(|s| s.earnings), Some(fx.expected_seller_share));
        let history = earnings_history(&fx.db, fx.seller.id, None).await?;
        assert_eq!(history.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_reverse_then_summary() -> Result<()> {
        let fx = paid_product_order_fixture().await?;

        let reversals = reverse_order_earnings(&fx.db, fx.order_id).await?;
        assert_eq!(reversals.len(), 1);
        assert_eq!(reversals[0].kind, EntryKind::Reversal);
        assert_eq!(reversals[0].amount, -fx.expected_seller_share);

        // A second reversal finds the guard already flipped.
        assert!(reverse_order_earnings(&fx.db, fx.order_id).await?.is_empty());

        let summary = earnings_summary(&fx.db, fx.seller.id).await?;
        assert_eq!(summary.balance, 0);
        assert_eq!(summary.lifetime_gross, 0);
        assert_eq!(summary.entry_count, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_balance_delta_unknown_user() -> Result<()> {
        let db = setup_test_db().await?;
        let result = apply_balance_delta(&db, 999, 10).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { .. }));
        Ok(())
    }
}
