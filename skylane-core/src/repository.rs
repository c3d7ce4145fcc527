use async_trait::async_trait;
use skylane_domain::{Booking, Flight, Order, Passenger, Seat};
use std::fmt;
use uuid::Uuid;

/// The unique constraints every store implementation must enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueConstraint {
    /// One seat per (flight, seat number) pair.
    SeatFlightNumber,
    /// A seat is claimed by at most one booking.
    SeatOccupancy,
    /// A passenger holds at most one seat.
    PassengerSeat,
    /// Booking references are globally unique.
    BookingPnr,
    /// One order per provider checkout session.
    OrderSessionId,
}

impl fmt::Display for UniqueConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UniqueConstraint::SeatFlightNumber => "seat_flight_number",
            UniqueConstraint::SeatOccupancy => "seat_occupancy",
            UniqueConstraint::PassengerSeat => "passenger_seat",
            UniqueConstraint::BookingPnr => "booking_pnr",
            UniqueConstraint::OrderSessionId => "order_session_id",
        })
    }
}

/// Storage-layer error. The store is the ultimate arbiter for uniqueness
/// (seat occupancy, passenger-seat links, PNR codes, session ids); callers
/// translate `UniqueViolation` into the matching domain error.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: UniqueConstraint },

    #[error("storage failure: {0}")]
    Storage(String),
}

impl RepoError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        RepoError::NotFound { kind, id: id.to_string() }
    }
}

#[async_trait]
pub trait FlightRepository: Send + Sync {
    async fn get_flight(&self, id: Uuid) -> Result<Option<Flight>, RepoError>;
    async fn save_flight(&self, flight: &Flight) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SeatRepository: Send + Sync {
    async fn get_seat(&self, id: Uuid) -> Result<Option<Seat>, RepoError>;

    async fn seats_for_flight(&self, flight_id: Uuid) -> Result<Vec<Seat>, RepoError>;

    /// Insert or update a seat. Fails with `UniqueViolation` on a duplicate
    /// (flight_id, seat_number) pair.
    async fn save_seat(&self, seat: &Seat) -> Result<(), RepoError>;

    /// Atomic compare-and-set claim of a seat. Fails with `UniqueViolation`
    /// when the seat is already occupied, or when the passenger already
    /// holds another seat. This is the serialization point for concurrent
    /// booking attempts on the same seat.
    async fn assign_seat(
        &self,
        seat_id: Uuid,
        booking_id: Uuid,
        passenger_id: Option<Uuid>,
    ) -> Result<Seat, RepoError>;

    /// Clear booking/passenger links and return the seat to inventory.
    async fn release_seat(&self, seat_id: Uuid) -> Result<Seat, RepoError>;
}

#[async_trait]
pub trait PassengerRepository: Send + Sync {
    async fn get_passenger(&self, id: Uuid) -> Result<Option<Passenger>, RepoError>;
    async fn save_passenger(&self, passenger: &Passenger) -> Result<(), RepoError>;
    async fn delete_passenger(&self, id: Uuid) -> Result<(), RepoError>;
    async fn passengers_for_booking(&self, booking_id: Uuid) -> Result<Vec<Passenger>, RepoError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, RepoError>;

    /// Insert or update a booking. Fails with `UniqueViolation` when another
    /// booking already holds the same PNR.
    async fn save_booking(&self, booking: &Booking) -> Result<(), RepoError>;

    async fn delete_booking(&self, id: Uuid) -> Result<(), RepoError>;

    async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, RepoError>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, RepoError>;

    /// Idempotency-key lookup: at most one order exists per provider
    /// checkout session.
    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Order>, RepoError>;

    /// Insert or update an order. Fails with `UniqueViolation` when a
    /// different order already carries the same session id.
    async fn save_order(&self, order: &Order) -> Result<(), RepoError>;
}
