use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{extractors::AuthUser, services::JwtKeys},
    state::AppState,
    subscriptions::{repo, repo_types::Tier, services},
};

use super::dto::{DashboardResponse, SimulateRequest, SubscriptionView};

/// Anything past this makes the 30-day window arithmetic meaningless.
pub const MAX_MONTHS: i32 = 120;

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

pub fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/subscriptions/simulate", post(simulate))
        .route("/subscriptions/:id/cancel", post(cancel))
}

pub(crate) fn validate_plan(tier: &str, months: i32) -> Result<Tier, (StatusCode, String)> {
    let tier = tier
        .parse::<Tier>()
        .map_err(|_| (StatusCode::BAD_REQUEST, "Unknown tier".to_string()))?;
    if !(1..=MAX_MONTHS).contains(&months) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("months must be between 1 and {MAX_MONTHS}"),
        ));
    }
    Ok(tier)
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<DashboardResponse>, (StatusCode, String)> {
    let subscriptions = repo::list_by_user(&state.db, user_id)
        .await
        .map_err(internal)?
        .into_iter()
        .map(SubscriptionView::from)
        .collect();
    Ok(Json(DashboardResponse { subscriptions }))
}

/// Non-production bypass: no payment session, straight to active.
#[instrument(skip(state, payload))]
pub async fn simulate(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SimulateRequest>,
) -> Result<(StatusCode, Json<SubscriptionView>), (StatusCode, String)> {
    let tier = validate_plan(&payload.tier, payload.months)?;

    let keys = JwtKeys::from_ref(&state);
    let sub = services::create_simulated(
        &state.db,
        &keys,
        &state.config.rates,
        user_id,
        tier.as_str(),
        payload.months,
    )
    .await
    .map_err(|e| {
        error!(error = %e, user_id = %user_id, "simulate subscription failed");
        internal(e)
    })?;

    info!(user_id = %user_id, tier = %tier, "subscription simulated");
    Ok((StatusCode::CREATED, Json(SubscriptionView::from(sub))))
}

#[instrument(skip(state))]
pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let updated = repo::cancel(&state.db, id, user_id)
        .await
        .map_err(internal)?;
    if updated == 0 {
        warn!(user_id = %user_id, subscription_id = %id, "cancel matched nothing");
        return Err((StatusCode::NOT_FOUND, "Subscription not found".to_string()));
    }
    info!(user_id = %user_id, subscription_id = %id, "subscription cancelled");
    Ok(StatusCode::NO_CONTENT)
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod plan_tests {
    use super::*;

    #[test]
    fn accepts_known_tiers_and_sane_months() {
        assert_eq!(validate_plan("basic", 1), Ok(Tier::Basic));
        assert_eq!(validate_plan("research", 12), Ok(Tier::Research));
    }

    #[test]
    fn rejects_unknown_tier() {
        let err = validate_plan("gold", 1).unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn rejects_out_of_range_months() {
        assert!(validate_plan("basic", 0).is_err());
        assert!(validate_plan("basic", -3).is_err());
        assert!(validate_plan("basic", MAX_MONTHS + 1).is_err());
    }
}
