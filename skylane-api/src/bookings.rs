use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use skylane_domain::{Booking, BookingStatus, PassengerSpec, PaymentStatus};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct CreateBookingRequest {
    user_id: Uuid,
    flight_id: Uuid,
    /// Pre-computed by the pricing collaborator; not derived here.
    total_amount_cents: i64,
    passengers: Vec<PassengerSpec>,
}

#[derive(Debug, Serialize)]
struct BookingResponse {
    booking_id: Uuid,
    pnr: String,
    status: BookingStatus,
    payment_status: PaymentStatus,
}

impl From<&Booking> for BookingResponse {
    fn from(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id,
            pnr: booking.pnr.clone(),
            status: booking.booking_status,
            payment_status: booking.payment_status,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking))
        .route("/v1/bookings/{id}", get(get_booking).delete(cancel_booking))
        .route(
            "/v1/bookings/{id}/passengers/{passenger_id}",
            axum::routing::delete(remove_passenger),
        )
        .route("/v1/users/{user_id}/bookings", get(list_bookings))
}

async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .bookings
        .create_booking(req.user_id, req.flight_id, req.passengers, req.total_amount_cents)
        .await?;

    info!(booking_id = %booking.id, pnr = %booking.pnr, "booking accepted");
    Ok(Json(BookingResponse::from(&booking)))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    let booking = state.bookings.get_booking(id).await?;
    Ok(Json(booking))
}

async fn list_bookings(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = state.bookings.list_bookings_for_user(user_id).await?;
    Ok(Json(bookings.iter().map(BookingResponse::from).collect()))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state.bookings.cancel_booking(id).await?;
    Ok(Json(BookingResponse::from(&booking)))
}

async fn remove_passenger(
    State(state): State<AppState>,
    Path((id, passenger_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<BookingResponse>, AppError> {
    state.bookings.remove_passenger(id, passenger_id).await?;
    let booking = state.bookings.get_booking(id).await?;
    Ok(Json(BookingResponse::from(&booking)))
}
