use crate::catalog::repo_types::{EnvironmentalMetric, Product};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn list_products(db: &PgPool, limit: i64, offset: i64) -> anyhow::Result<Vec<Product>> {
    let rows = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, slug, description, price, stock, created_at
        FROM products
        ORDER BY created_at DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_by_slug(db: &PgPool, slug: &str) -> anyhow::Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, slug, description, price, stock, created_at
        FROM products
        WHERE slug = $1
        "#,
    )
    .bind(slug)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        SELECT id, name, slug, description, price, stock, created_at
        FROM products
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(product)
}

/// Newest-first readings for a product detail page.
pub async fn metrics_for_product(
    db: &PgPool,
    product_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<EnvironmentalMetric>> {
    let rows = sqlx::query_as::<_, EnvironmentalMetric>(
        r#"
        SELECT id, product_id, recorded_at, salinity, ph, pollutant_index
        FROM environmental_metrics
        WHERE product_id = $1
        ORDER BY recorded_at DESC
        LIMIT $2
        "#,
    )
    .bind(product_id)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}
