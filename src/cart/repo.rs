use crate::cart::repo_types::{Cart, CartItem, CartLine};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn find_open_cart(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Cart>> {
    let cart = sqlx::query_as::<_, Cart>(
        r#"
        SELECT id, user_id, checked_out, created_at
        FROM carts
        WHERE user_id = $1 AND NOT checked_out
        "#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(cart)
}

/// Find the user's open cart or create one, holding a row lock for the
/// duration so concurrent adds cannot race past the one-open-cart index.
pub async fn find_or_create_open_cart(db: &PgPool, user_id: Uuid) -> anyhow::Result<Cart> {
    let mut tx = db.begin().await?;

    let existing = sqlx::query_as::<_, Cart>(
        r#"
        SELECT id, user_id, checked_out, created_at
        FROM carts
        WHERE user_id = $1 AND NOT checked_out
        FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let cart = match existing {
        Some(c) => c,
        None => {
            // a concurrent insert loses against carts_one_open_per_user
            sqlx::query(
                r#"
                INSERT INTO carts (user_id)
                VALUES ($1)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query_as::<_, Cart>(
                r#"
                SELECT id, user_id, checked_out, created_at
                FROM carts
                WHERE user_id = $1 AND NOT checked_out
                "#,
            )
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?
        }
    };

    tx.commit().await?;
    Ok(cart)
}

/// Add one unit of a product: existing line items increment, new ones start at 1.
pub async fn add_item(db: &PgPool, cart_id: Uuid, product_id: Uuid) -> anyhow::Result<CartItem> {
    let item = sqlx::query_as::<_, CartItem>(
        r#"
        INSERT INTO cart_items (cart_id, product_id)
        VALUES ($1, $2)
        ON CONFLICT (cart_id, product_id)
        DO UPDATE SET quantity = cart_items.quantity + 1
        RETURNING id, cart_id, product_id, quantity, created_at
        "#,
    )
    .bind(cart_id)
    .bind(product_id)
    .fetch_one(db)
    .await?;
    Ok(item)
}

pub async fn lines_for_cart(db: &PgPool, cart_id: Uuid) -> anyhow::Result<Vec<CartLine>> {
    let lines = sqlx::query_as::<_, CartLine>(
        r#"
        SELECT ci.id, ci.product_id, p.name, p.slug, p.price, ci.quantity
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.cart_id = $1
        ORDER BY ci.created_at ASC
        "#,
    )
    .bind(cart_id)
    .fetch_all(db)
    .await?;
    Ok(lines)
}

/// Delete a line item, scoped to carts owned by the user. Zero rows affected
/// (unknown id or someone else's item) is not an error.
pub async fn remove_item_for_user(
    db: &PgPool,
    user_id: Uuid,
    item_id: Uuid,
) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        DELETE FROM cart_items
        WHERE id = $1
          AND cart_id IN (SELECT id FROM carts WHERE user_id = $2)
        "#,
    )
    .bind(item_id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}

/// Logical checkout: the cart survives, flagged as no longer open.
pub async fn mark_checked_out(db: &PgPool, cart_id: Uuid, user_id: Uuid) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE carts
        SET checked_out = TRUE
        WHERE id = $1 AND user_id = $2 AND NOT checked_out
        "#,
    )
    .bind(cart_id)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(result.rows_affected())
}
