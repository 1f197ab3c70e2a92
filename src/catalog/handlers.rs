use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, instrument};

use crate::{catalog::repo, state::AppState};

use super::dto::{Pagination, ProductDetails, ProductListItem};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/:slug", get(get_product))
}

#[instrument(skip(state))]
pub async fn list_products(
    State(state): State<AppState>,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<ProductListItem>>, (StatusCode, String)> {
    let products = repo::list_products(&state.db, p.limit, p.offset)
        .await
        .map_err(internal)?;
    let items = products
        .into_iter()
        .map(|p| ProductListItem {
            id: p.id,
            name: p.name,
            slug: p.slug,
            price: p.price,
            stock: p.stock,
            created_at: p.created_at,
        })
        .collect();
    Ok(Json(items))
}

const DETAIL_METRIC_LIMIT: i64 = 50;

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ProductDetails>, (StatusCode, String)> {
    let product = repo::find_by_slug(&state.db, &slug)
        .await
        .map_err(internal)?
        .ok_or((StatusCode::NOT_FOUND, "Product not found".to_string()))?;

    let metrics = match repo::metrics_for_product(&state.db, product.id, DETAIL_METRIC_LIMIT).await
    {
        Ok(m) => m,
        Err(e) => {
            error!(error = %e, slug = %product.slug, "metrics_for_product failed");
            Vec::new()
        }
    };

    Ok(Json(ProductDetails {
        id: product.id,
        name: product.name,
        slug: product.slug,
        description: product.description,
        price: product.price,
        stock: product.stock,
        created_at: product.created_at,
        metrics,
    }))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
