//! Enrollment business logic - Who can access which course.
//!
//! Access comes from two sources: a paid, non-cancelled course order, or an
//! active subscription whose period has not ended. A user's enrolled courses
//! are the union of both, deduplicated by course id.

use crate::{
    entities::{
        Course, OrderItem, Subscription, course, order, order::OrderStatus,
        order::PaymentStatus, order_item, subscription, subscription::SubscriptionStatus, user,
        user::Role,
    },
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{JoinType, QueryOrder, QuerySelect, Set, prelude::*};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;

/// A course the user can access, with where the access comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrolledCourse {
    /// The course
    pub course: course::Model,
    /// Access through a paid course order
    pub via_purchase: bool,
    /// Access through an active subscription
    pub via_subscription: bool,
}

/// Course ids bought by `user_id` in paid, non-cancelled orders.
pub async fn purchased_course_ids<C>(db: &C, user_id: i64) -> Result<BTreeSet<i64>>
where
    C: ConnectionTrait,
{
    let ids: Vec<Option<i64>> = OrderItem::find()
        .select_only()
        .column(order_item::Column::CourseId)
        .join(JoinType::InnerJoin, order_item::Relation::Order.def())
        .filter(order::Column::BuyerId.eq(user_id))
        .filter(order::Column::PaymentStatus.eq(PaymentStatus::Paid))
        .filter(order::Column::Status.ne(OrderStatus::Cancelled))
        .filter(order_item::Column::CourseId.is_not_null())
        .into_tuple()
        .all(db)
        .await?;
    Ok(ids.into_iter().flatten().collect())
}

/// Course ids covered by `user_id`'s active, unexpired subscriptions.
pub async fn subscribed_course_ids<C>(db: &C, user_id: i64) -> Result<BTreeSet<i64>>
where
    C: ConnectionTrait,
{
    let subscriptions = Subscription::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .filter(subscription::Column::Status.eq(SubscriptionStatus::Active))
        .filter(subscription::Column::CurrentPeriodEnd.gt(Utc::now()))
        .all(db)
        .await?;
    Ok(subscriptions.into_iter().map(|s| s.course_id).collect())
}

/// All courses `user_id` is enrolled in, ordered by course id.
pub async fn enrolled_courses(db: &DatabaseConnection, user_id: i64) -> Result<Vec<EnrolledCourse>> {
    let purchased = purchased_course_ids(db, user_id).await?;
    let subscribed = subscribed_course_ids(db, user_id).await?;
    let all_ids: BTreeSet<i64> = purchased.union(&subscribed).copied().collect();

    if all_ids.is_empty() {
        return Ok(Vec::new());
    }

    let courses = Course::find()
        .filter(course::Column::Id.is_in(all_ids.iter().copied()))
        .order_by_asc(course::Column::Id)
        .all(db)
        .await?;

    Ok(courses
        .into_iter()
        .map(|course| EnrolledCourse {
            via_purchase: purchased.contains(&course.id),
            via_subscription: subscribed.contains(&course.id),
            course,
        })
        .collect())
}

/// Whether `user` may open `course_id`. Owners and admins always can.
pub async fn has_access<C>(db: &C, user: &user::Model, course_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    if user.role == Role::Admin {
        return Ok(true);
    }
    let course = Course::find_by_id(course_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Course", course_id))?;
    if course.instructor_id == user.id {
        return Ok(true);
    }
    if purchased_course_ids(db, user.id).await?.contains(&course_id) {
        return Ok(true);
    }
    Ok(subscribed_course_ids(db, user.id).await?.contains(&course_id))
}

/// Retrieves one of the user's subscriptions.
pub async fn get_subscription(
    db: &DatabaseConnection,
    user_id: i64,
    subscription_id: i64,
) -> Result<subscription::Model> {
    let subscription = Subscription::find_by_id(subscription_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("Subscription", subscription_id))?;
    if subscription.user_id != user_id {
        return Err(Error::not_found("Subscription", subscription_id));
    }
    Ok(subscription)
}

/// Lists a user's subscriptions, newest first.
pub async fn list_subscriptions(
    db: &DatabaseConnection,
    user_id: i64,
) -> Result<Vec<subscription::Model>> {
    Subscription::find()
        .filter(subscription::Column::UserId.eq(user_id))
        .order_by_desc(subscription::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Cancels a subscription. Access ends immediately.
pub async fn cancel_subscription(
    db: &DatabaseConnection,
    user_id: i64,
    subscription_id: i64,
) -> Result<subscription::Model> {
    let existing = get_subscription(db, user_id, subscription_id).await?;
    if existing.status == SubscriptionStatus::Canceled {
        return Err(Error::conflict("Subscription is already canceled"));
    }

    let mut active: subscription::ActiveModel = existing.into();
    active.status = Set(SubscriptionStatus::Canceled);
    let canceled = active.update(db).await?;
    info!(subscription_id, user_id, "Canceled subscription");
    Ok(canceled)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_enrolled_courses_union_is_deduplicated() -> Result<()> {
        let db = setup_test_db().await?;
        let instructor = create_test_seller(&db, "instructor@example.com").await?;
        let learner = create_test_buyer(&db, "learner@example.com").await?;

        let bought = create_published_course(&db, &instructor, "Bought", 4000).await?;
        let both = create_published_course(&db, &instructor, "Both", 4000).await?;
        let subscribed = create_published_course(&db, &instructor, "Subscribed", 4000).await?;
        let _unrelated = create_published_course(&db, &instructor, "Unrelated", 4000).await?;

        insert_paid_course_order(&db, learner.id, &[&bought, &both]).await?;
        insert_subscription(&db, learner.id, both.id, SubscriptionStatus::Active, Duration::days(10)).await?;
        insert_subscription(&db, learner.id, subscribed.id, SubscriptionStatus::Active, Duration::days(10)).await?;

        let enrolled = enrolled_courses(&db, learner.id).await?;
        let ids: Vec<i64> = enrolled.iter().map(|e| e.course.id).collect();
        assert_eq!(ids, vec![bought.id, both.id, subscribed.id]);

        assert!(enrolled[0].via_purchase && !enrolled[0].via_subscription);
        assert!(enrolled[1].via_purchase && enrolled[1].via_subscription);
        assert!(!enrolled[2].via_purchase && enrolled[2].via_subscription);
        Ok(())
    }

    #[tokio::test]
    async fn test_expired_and_canceled_subscriptions_grant_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        let instructor = create_test_seller(&db, "instructor@example.com").await?;
        let learner = create_test_buyer(&db, "learner@example.com").await?;
        let course = create_published_course(&db, &instructor, "Course", 4000).await?;

        insert_subscription(&db, learner.id, course.id, SubscriptionStatus::Active, Duration::days(-1)).await?;
        let live = insert_subscription(&db, learner.id, course.id, SubscriptionStatus::Active, Duration::days(5)).await?;

        assert!(has_access(&db, &learner, course.id).await?);
        cancel_subscription(&db, learner.id, live.id).await?;
        assert!(!has_access(&db, &learner, course.id).await?);
        assert!(enrolled_courses(&db, learner.id).await?.is_empty());

        let result = cancel_subscription(&db, learner.id, live.id).await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { message: _ }));
        Ok(())
    }

    #[tokio::test]
    async fn test_instructor_has_access_to_own_course() -> Result<()> {
        let db = setup_test_db().await?;
        let instructor = create_test_seller(&db, "instructor@example.com").await?;
        let course = create_published_course(&db, &instructor, "Mine", 1000).await?;
        assert!(has_access(&db, &instructor, course.id).await?);
        Ok(())
    }
}
