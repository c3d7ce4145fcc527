use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use skylane_domain::BillingSnapshot;

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    /// Raw payload failed integrity verification. Always treated as a
    /// potential security event by callers.
    #[error("webhook signature verification failed")]
    Signature,

    #[error("malformed provider event: {0}")]
    Malformed(String),

    #[error("payment provider error: {0}")]
    Provider(String),
}

/// Result of `create_checkout_session`: where to send the customer, and the
/// session id that later webhook events will reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub redirect_url: String,
}

/// Metadata attached to the checkout session and echoed back in events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutMetadata {
    pub user_id: String,
    pub booking_id: String,
}

/// A provider callback event after signature verification and parsing.
/// `payment_status` is the provider's opaque status string; the transition
/// table in skylane-domain decides what it means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub session_id: String,
    pub payment_status: String,
    #[serde(default)]
    pub metadata: Option<CheckoutMetadata>,
    #[serde(default)]
    pub billing: Option<BillingSnapshot>,
}

#[async_trait]
pub trait PaymentClient: Send + Sync {
    /// Create a checkout session with the provider, carrying the booking
    /// and user ids as metadata so the webhook can resolve them later.
    async fn create_checkout_session(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: CheckoutMetadata,
    ) -> Result<CheckoutSession, PaymentError>;
}

type HmacSha256 = Hmac<Sha256>;

/// Compute the hex-encoded HMAC-SHA256 signature for a webhook payload.
/// Used by the mock provider and by tests to produce valid signatures.
pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex_encode(&mac.finalize().into_bytes())
}

/// Verify the payload signature and parse the event. Verification runs
/// before any parsing so a tampered body is rejected without reading it.
pub fn verify_and_parse_event(
    payload: &[u8],
    signature: &str,
    secret: &str,
) -> Result<ProviderEvent, PaymentError> {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    let expected = hex_decode(signature).ok_or(PaymentError::Signature)?;
    // verify_slice is constant-time.
    mac.verify_slice(&expected).map_err(|_| PaymentError::Signature)?;

    serde_json::from_slice(payload).map_err(|e| PaymentError::Malformed(e.to_string()))
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn hex_decode(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}
