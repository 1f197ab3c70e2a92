use crate::auth::services::JwtKeys;
use jsonwebtoken::{decode, encode, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

/// Claims carried by a subscription access token. Unlike the auth tokens,
/// the expiry is the subscription's end timestamp, not a fixed TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionClaims {
    pub sub: Uuid,     // user ID
    pub email: String,
    pub tier: String,
    pub sid: Uuid,     // subscription correlation id
    pub iat: usize,
    pub exp: usize,    // == subscription end_date
    pub iss: String,
    pub aud: String,
}

/// Mint the access token for an activated subscription. `expires_at` must be
/// UTC; naive timestamps are assumed UTC before they reach this point.
pub fn mint(
    keys: &JwtKeys,
    user_id: Uuid,
    email: &str,
    tier: &str,
    correlation_id: Uuid,
    expires_at: OffsetDateTime,
) -> anyhow::Result<String> {
    let now = OffsetDateTime::now_utc();
    let claims = SubscriptionClaims {
        sub: user_id,
        email: email.to_string(),
        tier: tier.to_string(),
        sid: correlation_id,
        iat: now.unix_timestamp() as usize,
        exp: expires_at.unix_timestamp() as usize,
        iss: keys.issuer.clone(),
        aud: keys.audience.clone(),
    };
    let token = encode(&Header::new(keys.algorithm), &claims, &keys.encoding)?;
    debug!(user_id = %user_id, tier = %tier, "subscription token minted");
    Ok(token)
}

pub fn verify(keys: &JwtKeys, token: &str) -> anyhow::Result<SubscriptionClaims> {
    let mut validation = Validation::new(keys.algorithm);
    validation.set_audience(std::slice::from_ref(&keys.audience));
    validation.set_issuer(std::slice::from_ref(&keys.issuer));
    let data = decode::<SubscriptionClaims>(token, &keys.decoding, &validation)?;
    Ok(data.claims)
}

#[cfg(test)]
mod token_tests {
    use super::*;
    use crate::state::AppState;
    use axum::extract::FromRef;
    use time::macros::datetime;
    use time::Duration;

    fn make_keys() -> JwtKeys {
        let state = AppState::fake();
        JwtKeys::from_ref(&state)
    }

    #[tokio::test]
    async fn expiry_claim_equals_subscription_end() {
        let keys = make_keys();
        let end = OffsetDateTime::now_utc() + Duration::days(90);
        let token = mint(
            &keys,
            Uuid::new_v4(),
            "diver@example.com",
            "pro",
            Uuid::new_v4(),
            end,
        )
        .expect("mint");
        let claims = verify(&keys, &token).expect("verify");
        assert_eq!(claims.exp, end.unix_timestamp() as usize);
    }

    #[tokio::test]
    async fn naive_end_date_is_read_as_utc() {
        let keys = make_keys();
        // a wall-clock timestamp with no offset, fixed far in the future
        let end = datetime!(2040-06-15 12:00:00).assume_utc();
        let token = mint(
            &keys,
            Uuid::new_v4(),
            "diver@example.com",
            "basic",
            Uuid::new_v4(),
            end,
        )
        .expect("mint");
        let claims = verify(&keys, &token).expect("verify");
        assert_eq!(claims.exp as i64, end.unix_timestamp());
    }

    #[tokio::test]
    async fn claims_round_trip() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let correlation_id = Uuid::new_v4();
        let end = OffsetDateTime::now_utc() + Duration::days(30);
        let token = mint(&keys, user_id, "a@b.co", "research", correlation_id, end).expect("mint");
        assert_eq!(token.matches('.').count(), 2); // compact JWS

        let claims = verify(&keys, &token).expect("verify");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.sid, correlation_id);
        assert_eq!(claims.email, "a@b.co");
        assert_eq!(claims.tier, "research");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let keys = make_keys();
        let end = OffsetDateTime::now_utc() - Duration::days(2);
        let token = mint(
            &keys,
            Uuid::new_v4(),
            "diver@example.com",
            "basic",
            Uuid::new_v4(),
            end,
        )
        .expect("mint");
        assert!(verify(&keys, &token).is_err());
    }
}
