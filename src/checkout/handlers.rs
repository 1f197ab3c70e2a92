use axum::{
    body::Bytes,
    extract::{FromRef, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use time::OffsetDateTime;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{extractors::AuthUser, repo_types::User, services::JwtKeys},
    cart,
    payments::SessionRequest,
    state::AppState,
    subscriptions::{self, handlers::validate_plan, services::end_date_from},
};

use super::dto::{CheckoutSessionResponse, LandingQuery, SubscriptionCheckoutRequest};
use super::services::{self, WebhookAction};

pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout/subscription", post(create_subscription_checkout))
        .route("/checkout/cart", post(create_cart_checkout))
        .route("/checkout/success", get(success))
        .route("/checkout/cancel", get(cancel))
}

pub fn webhook_routes() -> Router<AppState> {
    Router::new().route("/webhooks/checkout", post(webhook))
}

const SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Start a subscription purchase. The pending row is persisted only after
/// the processor hands back a session id.
#[instrument(skip(state, payload))]
pub async fn create_subscription_checkout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<SubscriptionCheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutSessionResponse>), (StatusCode, String)> {
    let tier = validate_plan(&payload.tier, payload.months)?;
    let months = payload.months;

    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    let checkout = &state.config.checkout;
    let price = state.config.rates.total(tier.as_str(), months);

    let session = state
        .payments
        .create_checkout_session(SessionRequest {
            amount: price,
            currency: checkout.currency.clone(),
            description: format!("{} subscription ({} months)", tier, months),
            customer_email: Some(user.email.clone()),
            success_url: checkout.success_url.clone(),
            cancel_url: checkout.cancel_url.clone(),
            metadata: vec![
                ("user_id".into(), user_id.to_string()),
                ("tier".into(), tier.as_str().into()),
                ("months".into(), months.to_string()),
            ],
        })
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, "create checkout session failed");
            (StatusCode::BAD_GATEWAY, "Payment processor error".to_string())
        })?;

    let now = OffsetDateTime::now_utc();
    let sub = subscriptions::repo::create_pending(
        &state.db,
        user_id,
        tier.as_str(),
        months,
        price,
        end_date_from(now, months),
        Uuid::new_v4(),
        Some(session.id.as_str()),
    )
    .await
    .map_err(internal)?;

    info!(
        user_id = %user_id,
        subscription_id = %sub.id,
        session_id = %session.id,
        tier = %tier,
        "pending subscription created"
    );
    Ok((
        StatusCode::CREATED,
        Json(CheckoutSessionResponse {
            session_id: session.id,
            checkout_url: session.url,
        }),
    ))
}

/// Start a payment for the user's open cart. No subscription row here; the
/// webhook flips the cart on completion.
#[instrument(skip(state))]
pub async fn create_cart_checkout(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<(StatusCode, Json<CheckoutSessionResponse>), (StatusCode, String)> {
    let cart = cart::repo::find_open_cart(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::BAD_REQUEST, "Cart is empty".to_string()))?;

    let lines = cart::repo::lines_for_cart(&state.db, cart.id)
        .await
        .map_err(internal)?;
    if lines.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Cart is empty".to_string()));
    }
    let total = cart::services::cart_total(&lines);

    let user = User::find_by_id(&state.db, user_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    let checkout = &state.config.checkout;
    let session = state
        .payments
        .create_checkout_session(SessionRequest {
            amount: total,
            currency: checkout.currency.clone(),
            description: format!("Order of {} items", lines.len()),
            customer_email: Some(user.email.clone()),
            success_url: checkout.success_url.clone(),
            cancel_url: checkout.cancel_url.clone(),
            metadata: vec![
                ("user_id".into(), user_id.to_string()),
                ("cart_id".into(), cart.id.to_string()),
            ],
        })
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user_id, cart_id = %cart.id, "create checkout session failed");
            (StatusCode::BAD_GATEWAY, "Payment processor error".to_string())
        })?;

    info!(user_id = %user_id, cart_id = %cart.id, session_id = %session.id, "cart checkout started");
    Ok((
        StatusCode::CREATED,
        Json(CheckoutSessionResponse {
            session_id: session.id,
            checkout_url: session.url,
        }),
    ))
}

/// Completion callback from the processor. Unauthenticated POST by design:
/// the processor cannot present a session. Application-level mismatches are
/// acknowledged so the processor does not retry-storm us; only unparsable or
/// unauthenticated payloads reject.
#[instrument(skip(state, headers, body))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    match &state.config.checkout.webhook_secret {
        Some(secret) => {
            let header = headers
                .get(SIGNATURE_HEADER)
                .and_then(|h| h.to_str().ok())
                .ok_or((
                    StatusCode::BAD_REQUEST,
                    "Missing signature header".to_string(),
                ))?;
            let now = OffsetDateTime::now_utc().unix_timestamp();
            services::verify_signature(secret, header, &body, now).map_err(|e| {
                warn!(error = %e, "webhook signature rejected");
                (StatusCode::BAD_REQUEST, "Invalid signature".to_string())
            })?;
        }
        None => {
            warn!("accepting unsigned webhook (insecure mode)");
        }
    }

    let event: services::WebhookEvent = serde_json::from_slice(&body).map_err(|e| {
        warn!(error = %e, "unparsable webhook payload");
        (StatusCode::BAD_REQUEST, "Unparsable payload".to_string())
    })?;

    match services::route_event(&event) {
        WebhookAction::ActivateSubscription {
            session_id,
            user_id,
            tier,
        } => {
            activate_from_webhook(&state, &session_id, user_id, &tier)
                .await
                .map_err(|e| {
                    error!(error = %e, session_id = %session_id, "webhook activation failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, "activation failed".to_string())
                })?;
        }
        WebhookAction::CompleteCart { cart_id, user_id } => {
            let updated = cart::repo::mark_checked_out(&state.db, cart_id, user_id)
                .await
                .map_err(|e| {
                    error!(error = %e, cart_id = %cart_id, "webhook cart completion failed");
                    (StatusCode::INTERNAL_SERVER_ERROR, "cart completion failed".to_string())
                })?;
            if updated == 0 {
                debug!(cart_id = %cart_id, user_id = %user_id, "webhook cart matched nothing");
            } else {
                info!(cart_id = %cart_id, user_id = %user_id, "cart checked out");
            }
        }
        WebhookAction::Ignore => {
            debug!(kind = %event.kind, "webhook event ignored");
        }
    }

    Ok(Json(json!({ "received": true })))
}

/// Session-id match first; fall back to the user's latest pending
/// subscription of that tier. No match is not an error.
async fn activate_from_webhook(
    state: &AppState,
    session_id: &str,
    user_id: Option<Uuid>,
    tier: &str,
) -> anyhow::Result<()> {
    let mut sub = subscriptions::repo::find_pending_by_session(&state.db, session_id).await?;
    if sub.is_none() {
        if let Some(user_id) = user_id {
            sub = subscriptions::repo::find_latest_pending(&state.db, user_id, tier).await?;
        }
    }

    let Some(sub) = sub else {
        debug!(session_id = %session_id, tier = %tier, "no pending subscription matched");
        return Ok(());
    };

    let keys = JwtKeys::from_ref(state);
    subscriptions::services::activate(&state.db, &keys, &state.config.rates, sub).await?;
    Ok(())
}

#[instrument]
pub async fn success(Query(q): Query<LandingQuery>) -> Json<serde_json::Value> {
    Json(json!({ "status": "success", "session_id": q.session_id }))
}

#[instrument]
pub async fn cancel(Query(q): Query<LandingQuery>) -> Json<serde_json::Value> {
    Json(json!({ "status": "cancelled", "session_id": q.session_id }))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

#[cfg(test)]
mod dto_tests {
    use super::*;

    #[test]
    fn session_response_omits_missing_url() {
        let json = serde_json::to_string(&CheckoutSessionResponse {
            session_id: "cs_1".into(),
            checkout_url: None,
        })
        .unwrap();
        assert!(json.contains("cs_1"));
        assert!(!json.contains("checkout_url"));
    }
}
