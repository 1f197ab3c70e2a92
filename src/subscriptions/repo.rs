use crate::subscriptions::repo_types::Subscription;
use rust_decimal::Decimal;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

const COLUMNS: &str = "id, user_id, tier, months, start_date, end_date, active, price, \
                       correlation_id, checkout_session_id, api_token, created_at";

/// Persist a pending subscription. Called only after the processor has
/// handed back a session id (or on the simulate path, with none).
#[allow(clippy::too_many_arguments)]
pub async fn create_pending(
    db: &PgPool,
    user_id: Uuid,
    tier: &str,
    months: i32,
    price: Decimal,
    end_date: OffsetDateTime,
    correlation_id: Uuid,
    checkout_session_id: Option<&str>,
) -> anyhow::Result<Subscription> {
    let sub = sqlx::query_as::<_, Subscription>(&format!(
        r#"
        INSERT INTO subscriptions
            (user_id, tier, months, end_date, price, correlation_id, checkout_session_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(tier)
    .bind(months)
    .bind(end_date)
    .bind(price)
    .bind(correlation_id)
    .bind(checkout_session_id)
    .fetch_one(db)
    .await?;
    Ok(sub)
}

/// Session-id match takes priority when correlating webhooks.
pub async fn find_pending_by_session(
    db: &PgPool,
    session_id: &str,
) -> anyhow::Result<Option<Subscription>> {
    let sub = sqlx::query_as::<_, Subscription>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM subscriptions
        WHERE checkout_session_id = $1 AND NOT active
        "#
    ))
    .bind(session_id)
    .fetch_optional(db)
    .await?;
    Ok(sub)
}

/// Fallback correlation: the user's most recently started pending
/// subscription of that tier. Ambiguous when a user runs concurrent
/// checkouts for one tier; kept as specified.
pub async fn find_latest_pending(
    db: &PgPool,
    user_id: Uuid,
    tier: &str,
) -> anyhow::Result<Option<Subscription>> {
    let sub = sqlx::query_as::<_, Subscription>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM subscriptions
        WHERE user_id = $1 AND tier = $2 AND NOT active
        ORDER BY start_date DESC
        LIMIT 1
        "#
    ))
    .bind(user_id)
    .bind(tier)
    .fetch_optional(db)
    .await?;
    Ok(sub)
}

pub async fn activate(
    db: &PgPool,
    id: Uuid,
    end_date: OffsetDateTime,
    price: Decimal,
    api_token: &str,
) -> anyhow::Result<Subscription> {
    let sub = sqlx::query_as::<_, Subscription>(&format!(
        r#"
        UPDATE subscriptions
        SET active = TRUE, end_date = $2, price = $3, api_token = $4
        WHERE id = $1
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(end_date)
    .bind(price)
    .bind(api_token)
    .fetch_one(db)
    .await?;
    Ok(sub)
}

pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Subscription>> {
    let rows = sqlx::query_as::<_, Subscription>(&format!(
        r#"
        SELECT {COLUMNS}
        FROM subscriptions
        WHERE user_id = $1
        ORDER BY start_date DESC
        "#
    ))
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Deactivate, scoped to the owner. Returns rows affected.
pub async fn cancel(db: &PgPool, id: Uuid, user_id: Uuid) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE subscriptions
        SET active = FALSE, api_token = NULL
        WHERE id = $1 AND user_id = $2 AND active
        "#,
    )
    .bind(id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}
