use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use skylane_core::payment::{verify_and_parse_event, PaymentError};
use tracing::{error, warn};

use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-provider-signature";

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments", post(handle_payment_webhook))
}

/// POST /v1/webhooks/payments
///
/// Receives payment status updates from the provider. 400 only on signature
/// failure; everything else is acknowledged with 200, because provider-side
/// retries cannot fix a domain-level data problem.
async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let event = match verify_and_parse_event(&body, signature, &state.webhook_secret) {
        Ok(event) => event,
        Err(PaymentError::Signature) => {
            // Potential tamper attempt; no state was read or written.
            warn!("webhook rejected: signature verification failed");
            return StatusCode::BAD_REQUEST;
        }
        Err(err) => {
            error!(error = %err, "webhook payload unusable, acknowledging");
            return StatusCode::OK;
        }
    };

    match state.reconciler.reconcile(&event).await {
        Ok(outcome) => {
            tracing::info!(event_id = %event.id, ?outcome, "webhook handled");
            StatusCode::OK
        }
        Err(err) => {
            // Logged and acknowledged: redelivery would fail the same way.
            error!(event_id = %event.id, error = %err, "webhook reconciliation failed");
            StatusCode::OK
        }
    }
}
