use crate::auth::repo_types::User;
use crate::auth::services::JwtKeys;
use crate::config::TierRates;
use crate::subscriptions::{repo, repo_types::Subscription, tokens};
use sqlx::PgPool;
use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

/// Billing months are 30-day periods.
pub const DAYS_PER_MONTH: i64 = 30;

pub fn end_date_from(now: OffsetDateTime, months: i32) -> OffsetDateTime {
    now + Duration::days(DAYS_PER_MONTH * months as i64)
}

/// Activate a pending subscription: recompute the expiry window from now,
/// re-resolve the price, mint the access token, persist.
pub async fn activate(
    db: &PgPool,
    keys: &JwtKeys,
    rates: &TierRates,
    sub: Subscription,
) -> anyhow::Result<Subscription> {
    let user = User::find_by_id(db, sub.user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {} not found for subscription {}", sub.user_id, sub.id))?;

    let now = OffsetDateTime::now_utc();
    let end_date = end_date_from(now, sub.months);
    let price = rates.total(&sub.tier, sub.months);
    let token = tokens::mint(
        keys,
        sub.user_id,
        &user.email,
        &sub.tier,
        sub.correlation_id,
        end_date,
    )?;

    let activated = repo::activate(db, sub.id, end_date, price, &token).await?;
    info!(
        subscription_id = %activated.id,
        user_id = %activated.user_id,
        tier = %activated.tier,
        months = activated.months,
        "subscription activated"
    );
    Ok(activated)
}

/// Simulate path: create and activate in one go, no payment session involved.
pub async fn create_simulated(
    db: &PgPool,
    keys: &JwtKeys,
    rates: &TierRates,
    user_id: Uuid,
    tier: &str,
    months: i32,
) -> anyhow::Result<Subscription> {
    let now = OffsetDateTime::now_utc();
    let pending = repo::create_pending(
        db,
        user_id,
        tier,
        months,
        rates.total(tier, months),
        end_date_from(now, months),
        Uuid::new_v4(),
        None,
    )
    .await?;
    activate(db, keys, rates, pending).await
}

#[cfg(test)]
mod window_tests {
    use super::*;

    #[test]
    fn end_date_is_thirty_days_per_month() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(end_date_from(now, 1) - now, Duration::days(30));
        assert_eq!(end_date_from(now, 12) - now, Duration::days(360));
    }
}
