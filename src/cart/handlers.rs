use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    cart::{repo, services},
    catalog,
    state::AppState,
};

use super::dto::{AddItemRequest, CartItemView, CartView};

pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/cart", get(view_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/:id", delete(remove_item))
}

#[instrument(skip(state))]
pub async fn view_cart(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<CartView>, (StatusCode, String)> {
    let cart = repo::find_open_cart(&state.db, user_id)
        .await
        .map_err(internal)?;

    let Some(cart) = cart else {
        return Ok(Json(CartView {
            cart_id: None,
            items: Vec::new(),
            total: Decimal::ZERO,
        }));
    };

    let lines = repo::lines_for_cart(&state.db, cart.id)
        .await
        .map_err(internal)?;
    let total = services::cart_total(&lines);
    let items = lines
        .into_iter()
        .map(|l| {
            let subtotal = services::line_subtotal(&l);
            CartItemView {
                id: l.id,
                product_id: l.product_id,
                name: l.name,
                slug: l.slug,
                unit_price: l.price,
                quantity: l.quantity,
                subtotal,
            }
        })
        .collect();

    Ok(Json(CartView {
        cart_id: Some(cart.id),
        items,
        total,
    }))
}

#[instrument(skip(state, payload))]
pub async fn add_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartView>), (StatusCode, String)> {
    let product = catalog::repo::find_by_id(&state.db, payload.product_id)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Product not found".to_string()))?;

    let cart = repo::find_or_create_open_cart(&state.db, user_id)
        .await
        .map_err(internal)?;
    let item = repo::add_item(&state.db, cart.id, product.id)
        .await
        .map_err(internal)?;
    info!(user_id = %user_id, product = %product.slug, quantity = item.quantity, "cart item added");

    let lines = repo::lines_for_cart(&state.db, cart.id)
        .await
        .map_err(internal)?;
    let total = services::cart_total(&lines);
    let items = lines
        .into_iter()
        .map(|l| {
            let subtotal = services::line_subtotal(&l);
            CartItemView {
                id: l.id,
                product_id: l.product_id,
                name: l.name,
                slug: l.slug,
                unit_price: l.price,
                quantity: l.quantity,
                subtotal,
            }
        })
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(CartView {
            cart_id: Some(cart.id),
            items,
            total,
        }),
    ))
}

/// Deleting an item that does not exist, or belongs to another user's cart,
/// is a no-op rather than an error.
#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let removed = repo::remove_item_for_user(&state.db, user_id, id)
        .await
        .map_err(internal)?;
    if removed == 0 {
        debug!(user_id = %user_id, item_id = %id, "remove_item matched nothing");
    }
    Ok(StatusCode::NO_CONTENT)
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
