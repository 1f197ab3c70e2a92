use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payment api error status={status} body={body}")]
    Api { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("amount {0} is not representable in minor units")]
    InvalidAmount(Decimal),
}

/// What we ask the processor to collect.
#[derive(Debug, Clone)]
pub struct SessionRequest {
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    /// Correlation metadata echoed back in the completion webhook.
    pub metadata: Vec<(String, String)>,
}

/// Processor-side session reference returned to the caller.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub id: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait PaymentClient: Send + Sync {
    async fn create_checkout_session(
        &self,
        req: SessionRequest,
    ) -> Result<SessionHandle, PaymentError>;
}

/// Stripe Checkout over the raw HTTP API (form-encoded, bearer auth).
pub struct StripeCheckout {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeCheckout {
    pub fn new(secret_key: &str, api_base: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }
}

/// Convert a 2 dp amount into integer minor units (cents).
pub fn to_minor_units(amount: Decimal) -> Result<i64, PaymentError> {
    let cents = (amount.round_dp(2) * Decimal::ONE_HUNDRED).round();
    match cents.to_i64() {
        Some(v) if v >= 0 => Ok(v),
        _ => Err(PaymentError::InvalidAmount(amount)),
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[async_trait]
impl PaymentClient for StripeCheckout {
    async fn create_checkout_session(
        &self,
        req: SessionRequest,
    ) -> Result<SessionHandle, PaymentError> {
        let unit_amount = to_minor_units(req.amount)?;

        let mut form: Vec<(String, String)> = vec![
            ("mode".into(), "payment".into()),
            ("success_url".into(), req.success_url),
            ("cancel_url".into(), req.cancel_url),
            ("line_items[0][quantity]".into(), "1".into()),
            (
                "line_items[0][price_data][currency]".into(),
                req.currency,
            ),
            (
                "line_items[0][price_data][unit_amount]".into(),
                unit_amount.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]".into(),
                req.description,
            ),
        ];
        if let Some(email) = req.customer_email {
            form.push(("customer_email".into(), email));
        }
        for (key, value) in req.metadata {
            form.push((format!("metadata[{key}]"), value));
        }

        let resp = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(PaymentError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let session = serde_json::from_str::<SessionResponse>(&body)
            .map_err(|e| PaymentError::InvalidResponse(format!("{e}; body={body}")))?;
        info!(session_id = %session.id, "checkout session created");

        Ok(SessionHandle {
            id: session.id,
            url: session.url,
        })
    }
}

#[cfg(test)]
mod minor_units_tests {
    use super::*;

    #[test]
    fn converts_two_dp_amounts() {
        assert_eq!(to_minor_units(Decimal::new(999, 2)).expect("9.99"), 999);
        assert_eq!(to_minor_units(Decimal::new(20000, 2)).expect("200.00"), 20000);
        assert_eq!(to_minor_units(Decimal::ZERO).expect("zero"), 0);
    }

    #[test]
    fn rounds_sub_cent_amounts() {
        // 10.005 -> 10.00 or 10.01 depending on midpoint handling; must stay integral
        let v = to_minor_units(Decimal::new(10_005, 3)).expect("rounds");
        assert!(v == 1000 || v == 1001);
    }

    #[test]
    fn rejects_negative_amounts() {
        let err = to_minor_units(Decimal::new(-100, 2)).unwrap_err();
        assert!(matches!(err, PaymentError::InvalidAmount(_)));
    }
}
