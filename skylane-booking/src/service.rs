use crate::registry::SeatRegistry;
use skylane_core::repository::{
    BookingRepository, FlightRepository, PassengerRepository, RepoError, UniqueConstraint,
};
use skylane_core::{pnr, DomainError};
use skylane_domain::{Booking, Passenger, PassengerSpec, Seat};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// The booking aggregate: creation, passenger/seat mutators, cancellation
/// and deletion. All-or-nothing semantics for creation; every mutator keeps
/// the seat availability flag and the booking's id sets in step.
pub struct BookingService {
    flights: Arc<dyn FlightRepository>,
    registry: SeatRegistry,
    passengers: Arc<dyn PassengerRepository>,
    bookings: Arc<dyn BookingRepository>,
}

impl BookingService {
    pub fn new(
        flights: Arc<dyn FlightRepository>,
        registry: SeatRegistry,
        passengers: Arc<dyn PassengerRepository>,
        bookings: Arc<dyn BookingRepository>,
    ) -> Self {
        Self { flights, registry, passengers, bookings }
    }

    /// Create a booking for `user_id` on `flight_id`, seating every
    /// passenger in `specs`. Either every passenger/seat pair commits or
    /// none do: seats are only claimed after the whole list validates, and
    /// any failure past that point rolls every claim back.
    ///
    /// `total_amount_cents` is supplied by the caller; pricing is an
    /// upstream concern.
    pub async fn create_booking(
        &self,
        user_id: Uuid,
        flight_id: Uuid,
        specs: Vec<PassengerSpec>,
        total_amount_cents: i64,
    ) -> Result<Booking, DomainError> {
        if specs.is_empty() {
            return Err(DomainError::Business(
                "a booking requires at least one passenger".to_string(),
            ));
        }

        self.flights
            .get_flight(flight_id)
            .await?
            .ok_or_else(|| DomainError::not_found("flight", flight_id))?;

        // Validate every requested seat before touching any of them.
        let mut requested: HashSet<Uuid> = HashSet::new();
        let mut seats: Vec<Seat> = Vec::with_capacity(specs.len());
        for spec in &specs {
            let seat = self.registry.find_available_seat(flight_id, spec.seat_id).await?;
            if !requested.insert(spec.seat_id) {
                // Two passengers in the same request asked for this seat.
                return Err(DomainError::SeatUnavailable {
                    flight_id: flight_id.to_string(),
                    seat_number: seat.seat_number,
                });
            }
            seats.push(seat);
        }

        let mut booking = Booking::new(
            user_id,
            flight_id,
            pnr::generate(),
            total_amount_cents,
            specs.len() as u32,
        );
        let passengers: Vec<Passenger> = specs
            .into_iter()
            .map(|spec| Passenger {
                id: Uuid::new_v4(),
                booking_id: booking.id,
                full_name: spec.full_name,
                date_of_birth: spec.date_of_birth,
                gender: spec.gender,
                seat_id: spec.seat_id,
            })
            .collect();
        booking.passenger_ids = passengers.iter().map(|p| p.id).collect();
        booking.seat_ids = passengers.iter().map(|p| p.seat_id).collect();

        // Claim the seats. A concurrent booking may have won one of them in
        // the meantime; undo every claim made so far and abort.
        let mut claimed: Vec<Uuid> = Vec::with_capacity(seats.len());
        for (seat, passenger) in seats.iter().zip(&passengers) {
            match self.registry.assign(seat, booking.id, Some(passenger.id)).await {
                Ok(_) => claimed.push(seat.id),
                Err(err) => {
                    self.release_claimed(&claimed).await;
                    return Err(err);
                }
            }
        }

        let mut saved: Vec<Uuid> = Vec::with_capacity(passengers.len());
        for passenger in &passengers {
            if let Err(err) = self.passengers.save_passenger(passenger).await {
                self.undo_creation(&claimed, &saved).await;
                return Err(err.into());
            }
            saved.push(passenger.id);
        }

        match self.bookings.save_booking(&booking).await {
            Ok(()) => {
                info!(booking_id = %booking.id, pnr = %booking.pnr, "booking created");
                Ok(booking)
            }
            Err(RepoError::UniqueViolation { constraint: UniqueConstraint::BookingPnr }) => {
                self.undo_creation(&claimed, &saved).await;
                Err(DomainError::PnrCollision)
            }
            Err(err) => {
                self.undo_creation(&claimed, &saved).await;
                Err(err.into())
            }
        }
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<Booking, DomainError> {
        self.bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("booking", booking_id))
    }

    pub async fn list_bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, DomainError> {
        Ok(self.bookings.bookings_for_user(user_id).await?)
    }

    /// Seat a new passenger on an open booking.
    pub async fn add_passenger(
        &self,
        booking_id: Uuid,
        spec: PassengerSpec,
    ) -> Result<Passenger, DomainError> {
        let mut booking = self.get_open_booking(booking_id).await?;
        let seat = self.registry.find_available_seat(booking.flight_id, spec.seat_id).await?;

        let passenger = Passenger {
            id: Uuid::new_v4(),
            booking_id,
            full_name: spec.full_name,
            date_of_birth: spec.date_of_birth,
            gender: spec.gender,
            seat_id: spec.seat_id,
        };
        self.registry.assign(&seat, booking_id, Some(passenger.id)).await?;

        if let Err(err) = self.passengers.save_passenger(&passenger).await {
            self.release_claimed(&[seat.id]).await;
            return Err(err.into());
        }

        booking.passenger_ids.push(passenger.id);
        booking.seat_ids.push(passenger.seat_id);
        booking.passenger_count += 1;
        self.bookings.save_booking(&booking).await?;
        Ok(passenger)
    }

    /// Remove a passenger from a booking, releasing their seat.
    pub async fn remove_passenger(
        &self,
        booking_id: Uuid,
        passenger_id: Uuid,
    ) -> Result<(), DomainError> {
        let mut booking = self.get_open_booking(booking_id).await?;
        let passenger = self
            .passengers
            .get_passenger(passenger_id)
            .await?
            .filter(|p| p.booking_id == booking_id)
            .ok_or_else(|| DomainError::not_found("passenger", passenger_id))?;

        self.registry.release(passenger.seat_id).await?;
        self.passengers.delete_passenger(passenger_id).await?;

        booking.passenger_ids.retain(|id| *id != passenger_id);
        booking.seat_ids.retain(|id| *id != passenger.seat_id);
        booking.passenger_count = booking.passenger_count.saturating_sub(1);
        self.bookings.save_booking(&booking).await?;
        Ok(())
    }

    /// Attach an additional seat to the booking without a passenger link
    /// (e.g. an extra-seat purchase).
    pub async fn add_seat(&self, booking_id: Uuid, seat_id: Uuid) -> Result<Seat, DomainError> {
        let mut booking = self.get_open_booking(booking_id).await?;
        let seat = self.registry.find_available_seat(booking.flight_id, seat_id).await?;
        let seat = self.registry.assign(&seat, booking_id, None).await?;

        booking.seat_ids.push(seat_id);
        self.bookings.save_booking(&booking).await?;
        Ok(seat)
    }

    /// Detach a seat from the booking and return it to inventory. Seats
    /// still linked to a passenger must go through `remove_passenger`.
    pub async fn remove_seat(&self, booking_id: Uuid, seat_id: Uuid) -> Result<(), DomainError> {
        let mut booking = self.get_open_booking(booking_id).await?;
        if !booking.seat_ids.contains(&seat_id) {
            return Err(DomainError::not_found("seat", seat_id));
        }
        let seat = self
            .registry
            .get(seat_id)
            .await?
            .ok_or_else(|| DomainError::not_found("seat", seat_id))?;
        if seat.passenger_id.is_some() {
            return Err(DomainError::Business(
                "seat is assigned to a passenger; remove the passenger instead".to_string(),
            ));
        }

        self.registry.release(seat_id).await?;
        booking.seat_ids.retain(|id| *id != seat_id);
        self.bookings.save_booking(&booking).await?;
        Ok(())
    }

    /// Cancel a booking: every seat goes back to inventory and both status
    /// fields move to CANCELLED. Confirmed bookings are out of scope for
    /// this path (refunds are a separate flow).
    pub async fn cancel_booking(&self, booking_id: Uuid) -> Result<Booking, DomainError> {
        let mut booking = self.get_open_booking(booking_id).await?;

        for seat_id in &booking.seat_ids {
            self.registry.release(*seat_id).await?;
        }
        booking.cancel();
        self.bookings.save_booking(&booking).await?;
        info!(booking_id = %booking.id, "booking cancelled");
        Ok(booking)
    }

    /// Delete a booking outright. The cascade is explicit and ordered:
    /// seats are released (not deleted — they outlive the booking), then
    /// the owned passengers are deleted, then the booking row itself.
    pub async fn delete_booking(&self, booking_id: Uuid) -> Result<(), DomainError> {
        let booking = self.get_booking(booking_id).await?;

        for seat_id in &booking.seat_ids {
            self.registry.release(*seat_id).await?;
        }
        for passenger_id in &booking.passenger_ids {
            self.passengers.delete_passenger(*passenger_id).await?;
        }
        self.bookings.delete_booking(booking_id).await?;
        info!(booking_id = %booking_id, "booking deleted");
        Ok(())
    }

    async fn get_open_booking(&self, booking_id: Uuid) -> Result<Booking, DomainError> {
        let booking = self.get_booking(booking_id).await?;
        if booking.booking_status.is_terminal() {
            return Err(DomainError::Business(format!(
                "booking {} is {:?} and can no longer be modified",
                booking_id, booking.booking_status
            )));
        }
        Ok(booking)
    }

    async fn release_claimed(&self, seat_ids: &[Uuid]) {
        for seat_id in seat_ids {
            if let Err(err) = self.registry.release(*seat_id).await {
                warn!(seat_id = %seat_id, error = %err, "failed to release seat during rollback");
            }
        }
    }

    async fn undo_creation(&self, seat_ids: &[Uuid], passenger_ids: &[Uuid]) {
        self.release_claimed(seat_ids).await;
        for passenger_id in passenger_ids {
            if let Err(err) = self.passengers.delete_passenger(*passenger_id).await {
                warn!(passenger_id = %passenger_id, error = %err, "failed to delete passenger during rollback");
            }
        }
    }
}
