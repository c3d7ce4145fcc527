use axum::{
    extract::{Path, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use skylane_domain::BillingSnapshot;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CheckoutRequest {
    #[serde(default)]
    billing: BillingSnapshot,
}

#[derive(Debug, Serialize)]
struct CheckoutResponse {
    order_id: Uuid,
    session_id: String,
    redirect_url: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/bookings/{id}/checkout", post(initiate_checkout))
}

/// Start payment for a booking: opens a provider checkout session and
/// returns the redirect URL for the customer.
async fn initiate_checkout(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>, AppError> {
    let (order, session) = state.checkout.initiate_checkout(id, req.billing).await?;
    Ok(Json(CheckoutResponse {
        order_id: order.id,
        session_id: session.session_id,
        redirect_url: session.redirect_url,
    }))
}
