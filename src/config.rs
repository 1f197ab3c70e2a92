use anyhow::bail;
use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub algorithm: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Payment processor settings. The webhook secret is optional, but running
/// without one requires the explicit insecure flag — never a silent default.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutConfig {
    pub secret_key: String,
    pub webhook_secret: Option<String>,
    pub allow_unsigned_webhooks: bool,
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub api_base: String,
}

/// Monthly subscription rates per tier. Single source of truth for pricing:
/// both checkout and the simulate path resolve through this table.
#[derive(Debug, Clone, Deserialize)]
pub struct TierRates {
    pub basic: Decimal,
    pub pro: Decimal,
    pub research: Decimal,
}

impl Default for TierRates {
    fn default() -> Self {
        Self {
            basic: Decimal::new(10_00, 2),
            pro: Decimal::new(50_00, 2),
            research: Decimal::new(200_00, 2),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub checkout: CheckoutConfig,
    pub rates: TierRates,
}

fn env_decimal(key: &str, default: Decimal) -> Decimal {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<Decimal>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;

        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "tidemarket".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "tidemarket-users".into()),
            algorithm: std::env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".into()),
            ttl_minutes: std::env::var("JWT_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
            refresh_ttl_minutes: std::env::var("JWT_REFRESH_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60 * 24 * 14),
        };

        let checkout = CheckoutConfig {
            secret_key: std::env::var("CHECKOUT_SECRET_KEY")?,
            webhook_secret: std::env::var("CHECKOUT_WEBHOOK_SECRET").ok(),
            allow_unsigned_webhooks: std::env::var("CHECKOUT_ALLOW_UNSIGNED")
                .map(|v| v == "true")
                .unwrap_or(false),
            success_url: std::env::var("CHECKOUT_SUCCESS_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api/v1/checkout/success".into()),
            cancel_url: std::env::var("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|_| "http://localhost:8080/api/v1/checkout/cancel".into()),
            currency: std::env::var("CHECKOUT_CURRENCY").unwrap_or_else(|_| "usd".into()),
            api_base: std::env::var("CHECKOUT_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".into()),
        };

        if checkout.webhook_secret.is_none() && !checkout.allow_unsigned_webhooks {
            bail!("CHECKOUT_WEBHOOK_SECRET is not set; set it or opt into CHECKOUT_ALLOW_UNSIGNED=true");
        }

        let defaults = TierRates::default();
        let rates = TierRates {
            basic: env_decimal("TIER_RATE_BASIC", defaults.basic),
            pro: env_decimal("TIER_RATE_PRO", defaults.pro),
            research: env_decimal("TIER_RATE_RESEARCH", defaults.research),
        };

        Ok(Self {
            database_url,
            jwt,
            checkout,
            rates,
        })
    }
}

#[cfg(test)]
mod rates_tests {
    use super::*;

    #[test]
    fn default_rates_match_documented_table() {
        let rates = TierRates::default();
        assert_eq!(rates.basic, Decimal::new(1000, 2));
        assert_eq!(rates.pro, Decimal::new(5000, 2));
        assert_eq!(rates.research, Decimal::new(20000, 2));
    }
}
