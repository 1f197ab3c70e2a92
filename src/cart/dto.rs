use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CartItemView {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub slug: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

/// An absent cart renders as an empty one, never an error.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub cart_id: Option<Uuid>,
    pub items: Vec<CartItemView>,
    pub total: Decimal,
}
