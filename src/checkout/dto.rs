use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SubscriptionCheckoutRequest {
    pub tier: String,
    pub months: i32,
}

#[derive(Debug, Serialize)]
pub struct CheckoutSessionResponse {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LandingQuery {
    pub session_id: Option<String>,
}
