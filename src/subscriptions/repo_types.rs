use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

/// Subscription tiers. Stored as lowercase text in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basic,
    Pro,
    Research,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Basic => "basic",
            Tier::Pro => "pro",
            Tier::Research => "research",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Tier::Basic),
            "pro" => Ok(Tier::Pro),
            "research" => Ok(Tier::Research),
            _ => Err(()),
        }
    }
}

/// Subscription record. Pending rows have `active = false` and no token;
/// activation fills in the token and recomputes end_date and price.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tier: String,
    pub months: i32,
    pub start_date: OffsetDateTime,
    pub end_date: OffsetDateTime,
    pub active: bool,
    pub price: Decimal,
    pub correlation_id: Uuid,
    pub checkout_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tier_tests {
    use super::*;

    #[test]
    fn parses_known_tiers() {
        assert_eq!("basic".parse::<Tier>(), Ok(Tier::Basic));
        assert_eq!("pro".parse::<Tier>(), Ok(Tier::Pro));
        assert_eq!("research".parse::<Tier>(), Ok(Tier::Research));
    }

    #[test]
    fn rejects_unknown_tier() {
        assert!("platinum".parse::<Tier>().is_err());
        assert!("".parse::<Tier>().is_err());
    }

    #[test]
    fn round_trips_through_as_str() {
        for tier in [Tier::Basic, Tier::Pro, Tier::Research] {
            assert_eq!(tier.as_str().parse::<Tier>(), Ok(tier));
        }
    }
}
