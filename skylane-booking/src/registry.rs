use skylane_core::repository::{RepoError, SeatRepository};
use skylane_core::DomainError;
use skylane_domain::Seat;
use std::sync::Arc;
use uuid::Uuid;

/// Per-flight seat inventory. The store's occupancy constraint is the
/// ultimate arbiter for races; this layer re-checks availability up front so
/// the common case fails early with a clean `SeatUnavailable` instead of a
/// late constraint violation.
#[derive(Clone)]
pub struct SeatRegistry {
    seats: Arc<dyn SeatRepository>,
}

impl SeatRegistry {
    pub fn new(seats: Arc<dyn SeatRepository>) -> Self {
        Self { seats }
    }

    /// Resolve a seat on a flight, requiring it to be free.
    pub async fn find_available_seat(
        &self,
        flight_id: Uuid,
        seat_id: Uuid,
    ) -> Result<Seat, DomainError> {
        let seat = self
            .seats
            .get_seat(seat_id)
            .await?
            .filter(|s| s.flight_id == flight_id)
            .ok_or_else(|| DomainError::not_found("seat", seat_id))?;

        if !seat.available || seat.is_occupied() {
            return Err(DomainError::SeatUnavailable {
                flight_id: flight_id.to_string(),
                seat_number: seat.seat_number,
            });
        }
        Ok(seat)
    }

    /// Claim a previously validated seat for a booking. Losing the race to
    /// another request surfaces as `SeatUnavailable`, same as the optimistic
    /// check would have reported.
    pub async fn assign(
        &self,
        seat: &Seat,
        booking_id: Uuid,
        passenger_id: Option<Uuid>,
    ) -> Result<Seat, DomainError> {
        match self.seats.assign_seat(seat.id, booking_id, passenger_id).await {
            Ok(updated) => Ok(updated),
            Err(RepoError::UniqueViolation { .. }) => Err(DomainError::SeatUnavailable {
                flight_id: seat.flight_id.to_string(),
                seat_number: seat.seat_number.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Clear the seat's booking and passenger links and flip it back to
    /// available. Used on cancellation and passenger removal.
    pub async fn release(&self, seat_id: Uuid) -> Result<Seat, DomainError> {
        Ok(self.seats.release_seat(seat_id).await?)
    }

    pub async fn get(&self, seat_id: Uuid) -> Result<Option<Seat>, DomainError> {
        Ok(self.seats.get_seat(seat_id).await?)
    }
}
