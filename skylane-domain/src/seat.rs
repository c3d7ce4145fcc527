use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single sellable seat. A seat belongs to one flight for its lifetime;
/// `available == false` exactly when `booking_id` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seat {
    pub id: Uuid,
    pub flight_id: Uuid,
    pub seat_number: String,
    pub class: SeatClass,
    pub price_modifier_cents: i64,
    pub available: bool,
    pub booking_id: Option<Uuid>,
    pub passenger_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatClass {
    Economy,
    PremiumEconomy,
    Business,
    First,
}

impl Seat {
    pub fn new(flight_id: Uuid, seat_number: &str, class: SeatClass, price_modifier_cents: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            flight_id,
            seat_number: seat_number.to_string(),
            class,
            price_modifier_cents,
            available: true,
            booking_id: None,
            passenger_id: None,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.booking_id.is_some()
    }

    /// Bind the seat to a booking (and optionally a passenger).
    /// Callers check availability first; this is the side effect only.
    pub fn occupy(&mut self, booking_id: Uuid, passenger_id: Option<Uuid>) {
        self.available = false;
        self.booking_id = Some(booking_id);
        self.passenger_id = passenger_id;
    }

    /// Clear booking and passenger links and return the seat to inventory.
    pub fn release(&mut self) {
        self.available = true;
        self.booking_id = None;
        self.passenger_id = None;
    }
}
