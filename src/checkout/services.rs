use anyhow::{bail, Context};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Replay window for the signature timestamp.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub const COMPLETED_EVENT: &str = "checkout.session.completed";

/// Verify a `t=<unix>,v1=<hex hmac>` signature header over `"{t}.{body}"`.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now_unix: i64,
) -> anyhow::Result<()> {
    let mut timestamp: Option<&str> = None;
    let mut signature: Option<&str> = None;
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => signature = Some(v),
            _ => {}
        }
    }
    let timestamp = timestamp.context("signature header missing timestamp")?;
    let signature = signature.context("signature header missing v1 signature")?;

    let ts: i64 = timestamp.parse().context("signature timestamp not numeric")?;
    if (now_unix - ts).abs() > SIGNATURE_TOLERANCE_SECS {
        bail!("signature timestamp outside tolerance");
    }

    let expected = hex::decode(signature).context("signature not valid hex")?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("hmac key error: {e}"))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    mac.verify_slice(&expected)
        .map_err(|_| anyhow::anyhow!("signature mismatch"))?;
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: SessionObject,
}

#[derive(Debug, Deserialize)]
pub struct SessionObject {
    pub id: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// What a completed-checkout event asks us to do.
#[derive(Debug, PartialEq, Eq)]
pub enum WebhookAction {
    ActivateSubscription {
        session_id: String,
        user_id: Option<Uuid>,
        tier: String,
    },
    CompleteCart {
        cart_id: Uuid,
        user_id: Uuid,
    },
    Ignore,
}

fn metadata_uuid(meta: &HashMap<String, String>, key: &str) -> Option<Uuid> {
    meta.get(key).and_then(|v| Uuid::parse_str(v).ok())
}

/// Decide what an event means from its type and correlation metadata.
/// Anything we cannot place is Ignore: the webhook endpoint acknowledges
/// those rather than making the processor retry.
pub fn route_event(event: &WebhookEvent) -> WebhookAction {
    if event.kind != COMPLETED_EVENT {
        return WebhookAction::Ignore;
    }
    let object = &event.data.object;

    if let Some(tier) = object.metadata.get("tier") {
        return WebhookAction::ActivateSubscription {
            session_id: object.id.clone(),
            user_id: metadata_uuid(&object.metadata, "user_id"),
            tier: tier.clone(),
        };
    }

    if let Some(cart_id) = metadata_uuid(&object.metadata, "cart_id") {
        if let Some(user_id) = metadata_uuid(&object.metadata, "user_id") {
            return WebhookAction::CompleteCart { cart_id, user_id };
        }
    }

    WebhookAction::Ignore
}

#[cfg(test)]
mod signature_tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_valid_signature() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let now = 1_700_000_000;
        let header = sign(SECRET, now, payload);
        assert!(verify_signature(SECRET, &header, payload, now).is_ok());
    }

    #[test]
    fn rejects_wrong_secret() {
        let payload = br#"{"type":"checkout.session.completed"}"#;
        let now = 1_700_000_000;
        let header = sign("other_secret", now, payload);
        assert!(verify_signature(SECRET, &header, payload, now).is_err());
    }

    #[test]
    fn rejects_tampered_payload() {
        let now = 1_700_000_000;
        let header = sign(SECRET, now, br#"{"amount":100}"#);
        assert!(verify_signature(SECRET, &header, br#"{"amount":999}"#, now).is_err());
    }

    #[test]
    fn rejects_stale_timestamp() {
        let payload = b"{}";
        let now = 1_700_000_000;
        let header = sign(SECRET, now - 600, payload);
        assert!(verify_signature(SECRET, &header, payload, now).is_err());
    }

    #[test]
    fn rejects_malformed_header() {
        assert!(verify_signature(SECRET, "garbage", b"{}", 0).is_err());
        assert!(verify_signature(SECRET, "t=123", b"{}", 123).is_err());
        assert!(verify_signature(SECRET, "v1=abcd", b"{}", 0).is_err());
        assert!(verify_signature(SECRET, "t=123,v1=nothex", b"{}", 123).is_err());
    }
}

#[cfg(test)]
mod routing_tests {
    use super::*;

    fn event(kind: &str, id: &str, meta: &[(&str, &str)]) -> WebhookEvent {
        WebhookEvent {
            kind: kind.into(),
            data: EventData {
                object: SessionObject {
                    id: id.into(),
                    metadata: meta
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                },
            },
        }
    }

    #[test]
    fn tier_metadata_routes_to_subscription_activation() {
        let user = Uuid::new_v4();
        let e = event(
            COMPLETED_EVENT,
            "cs_123",
            &[
                ("tier", "pro"),
                ("months", "3"),
                ("user_id", &user.to_string()),
            ],
        );
        assert_eq!(
            route_event(&e),
            WebhookAction::ActivateSubscription {
                session_id: "cs_123".into(),
                user_id: Some(user),
                tier: "pro".into(),
            }
        );
    }

    #[test]
    fn cart_metadata_routes_to_cart_completion() {
        let user = Uuid::new_v4();
        let cart = Uuid::new_v4();
        let e = event(
            COMPLETED_EVENT,
            "cs_456",
            &[
                ("cart_id", &cart.to_string()),
                ("user_id", &user.to_string()),
            ],
        );
        assert_eq!(
            route_event(&e),
            WebhookAction::CompleteCart {
                cart_id: cart,
                user_id: user,
            }
        );
    }

    #[test]
    fn cart_without_user_is_ignored() {
        let cart = Uuid::new_v4();
        let e = event(COMPLETED_EVENT, "cs_789", &[("cart_id", &cart.to_string())]);
        assert_eq!(route_event(&e), WebhookAction::Ignore);
    }

    #[test]
    fn unrecognized_cart_id_is_ignored() {
        let e = event(
            COMPLETED_EVENT,
            "cs_789",
            &[("cart_id", "not-a-uuid"), ("user_id", "also-not")],
        );
        assert_eq!(route_event(&e), WebhookAction::Ignore);
    }

    #[test]
    fn metadata_free_event_is_ignored() {
        let e = event(COMPLETED_EVENT, "cs_000", &[]);
        assert_eq!(route_event(&e), WebhookAction::Ignore);
    }

    #[test]
    fn other_event_types_are_ignored() {
        let e = event("invoice.paid", "in_123", &[("tier", "pro")]);
        assert_eq!(route_event(&e), WebhookAction::Ignore);
    }

    #[test]
    fn parses_processor_payload_shape() {
        let body = br#"{
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {
                "object": {
                    "id": "cs_abc",
                    "metadata": {"tier": "basic", "months": "3", "user_id": "00000000-0000-0000-0000-000000000001"}
                }
            }
        }"#;
        let event: WebhookEvent = serde_json::from_slice(body).expect("parse");
        assert_eq!(event.kind, COMPLETED_EVENT);
        assert_eq!(event.data.object.id, "cs_abc");
        assert_eq!(event.data.object.metadata["tier"], "basic");
    }
}
