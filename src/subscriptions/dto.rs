use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::subscriptions::repo_types::Subscription;

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    pub tier: String,
    pub months: i32,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionView {
    pub id: Uuid,
    pub tier: String,
    pub months: i32,
    pub start_date: OffsetDateTime,
    pub end_date: OffsetDateTime,
    pub active: bool,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
}

impl From<Subscription> for SubscriptionView {
    fn from(s: Subscription) -> Self {
        Self {
            id: s.id,
            tier: s.tier,
            months: s.months,
            start_date: s.start_date,
            end_date: s.end_date,
            active: s.active,
            price: s.price,
            api_token: s.api_token,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub subscriptions: Vec<SubscriptionView>,
}
