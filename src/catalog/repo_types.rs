use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Product record in the database. The slug is the stable public identity;
/// price and stock are mutable.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub created_at: OffsetDateTime,
}

/// Append-only time-series reading attached to a product.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EnvironmentalMetric {
    pub id: Uuid,
    pub product_id: Uuid,
    pub recorded_at: OffsetDateTime,
    pub salinity: Decimal,
    pub ph: Decimal,
    pub pollutant_index: Decimal,
}
