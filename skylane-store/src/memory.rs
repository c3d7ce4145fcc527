use async_trait::async_trait;
use skylane_core::repository::{
    BookingRepository, FlightRepository, OrderRepository, PassengerRepository, RepoError,
    SeatRepository, UniqueConstraint,
};
use skylane_domain::{Booking, Flight, Order, Passenger, Seat};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory store implementing every repository trait. Each operation runs
/// under a single write lock, so the unique-constraint checks and the
/// mutation they guard are atomic, mirroring what the relational store's
/// constraints and row locks provide in production.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    flights: HashMap<Uuid, Flight>,
    seats: HashMap<Uuid, Seat>,
    passengers: HashMap<Uuid, Passenger>,
    bookings: HashMap<Uuid, Booking>,
    orders: HashMap<Uuid, Order>,
    orders_by_session: HashMap<String, Uuid>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a flight and its seat map directly, bypassing constraint
    /// checks. Admin provisioning is outside this core; tests and the local
    /// binary use this to get inventory in place.
    pub async fn seed_flight(&self, flight: Flight, seats: Vec<Seat>) {
        let mut t = self.inner.write().await;
        t.flights.insert(flight.id, flight);
        for seat in seats {
            t.seats.insert(seat.id, seat);
        }
    }

    pub async fn order_count(&self) -> usize {
        self.inner.read().await.orders.len()
    }

    pub async fn passenger_count(&self) -> usize {
        self.inner.read().await.passengers.len()
    }
}

#[async_trait]
impl FlightRepository for MemoryStore {
    async fn get_flight(&self, id: Uuid) -> Result<Option<Flight>, RepoError> {
        Ok(self.inner.read().await.flights.get(&id).cloned())
    }

    async fn save_flight(&self, flight: &Flight) -> Result<(), RepoError> {
        self.inner.write().await.flights.insert(flight.id, flight.clone());
        Ok(())
    }
}

#[async_trait]
impl SeatRepository for MemoryStore {
    async fn get_seat(&self, id: Uuid) -> Result<Option<Seat>, RepoError> {
        Ok(self.inner.read().await.seats.get(&id).cloned())
    }

    async fn seats_for_flight(&self, flight_id: Uuid) -> Result<Vec<Seat>, RepoError> {
        Ok(self
            .inner
            .read()
            .await
            .seats
            .values()
            .filter(|s| s.flight_id == flight_id)
            .cloned()
            .collect())
    }

    async fn save_seat(&self, seat: &Seat) -> Result<(), RepoError> {
        let mut t = self.inner.write().await;
        let duplicate = t.seats.values().any(|s| {
            s.id != seat.id && s.flight_id == seat.flight_id && s.seat_number == seat.seat_number
        });
        if duplicate {
            return Err(RepoError::UniqueViolation { constraint: UniqueConstraint::SeatFlightNumber });
        }
        t.seats.insert(seat.id, seat.clone());
        Ok(())
    }

    async fn assign_seat(
        &self,
        seat_id: Uuid,
        booking_id: Uuid,
        passenger_id: Option<Uuid>,
    ) -> Result<Seat, RepoError> {
        let mut t = self.inner.write().await;
        if let Some(pid) = passenger_id {
            let already_seated = t
                .seats
                .values()
                .any(|s| s.id != seat_id && s.passenger_id == Some(pid));
            if already_seated {
                return Err(RepoError::UniqueViolation { constraint: UniqueConstraint::PassengerSeat });
            }
        }
        let seat = t
            .seats
            .get_mut(&seat_id)
            .ok_or_else(|| RepoError::not_found("seat", seat_id))?;
        if seat.is_occupied() || !seat.available {
            return Err(RepoError::UniqueViolation { constraint: UniqueConstraint::SeatOccupancy });
        }
        seat.occupy(booking_id, passenger_id);
        Ok(seat.clone())
    }

    async fn release_seat(&self, seat_id: Uuid) -> Result<Seat, RepoError> {
        let mut t = self.inner.write().await;
        let seat = t
            .seats
            .get_mut(&seat_id)
            .ok_or_else(|| RepoError::not_found("seat", seat_id))?;
        seat.release();
        Ok(seat.clone())
    }
}

#[async_trait]
impl PassengerRepository for MemoryStore {
    async fn get_passenger(&self, id: Uuid) -> Result<Option<Passenger>, RepoError> {
        Ok(self.inner.read().await.passengers.get(&id).cloned())
    }

    async fn save_passenger(&self, passenger: &Passenger) -> Result<(), RepoError> {
        self.inner.write().await.passengers.insert(passenger.id, passenger.clone());
        Ok(())
    }

    async fn delete_passenger(&self, id: Uuid) -> Result<(), RepoError> {
        self.inner.write().await.passengers.remove(&id);
        Ok(())
    }

    async fn passengers_for_booking(&self, booking_id: Uuid) -> Result<Vec<Passenger>, RepoError> {
        Ok(self
            .inner
            .read()
            .await
            .passengers
            .values()
            .filter(|p| p.booking_id == booking_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, RepoError> {
        Ok(self.inner.read().await.bookings.get(&id).cloned())
    }

    async fn save_booking(&self, booking: &Booking) -> Result<(), RepoError> {
        let mut t = self.inner.write().await;
        let pnr_taken = t
            .bookings
            .values()
            .any(|b| b.id != booking.id && b.pnr == booking.pnr);
        if pnr_taken {
            return Err(RepoError::UniqueViolation { constraint: UniqueConstraint::BookingPnr });
        }
        t.bookings.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn delete_booking(&self, id: Uuid) -> Result<(), RepoError> {
        self.inner.write().await.bookings.remove(&id);
        Ok(())
    }

    async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, RepoError> {
        Ok(self
            .inner
            .read()
            .await
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, RepoError> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn find_by_session_id(&self, session_id: &str) -> Result<Option<Order>, RepoError> {
        let t = self.inner.read().await;
        Ok(t.orders_by_session
            .get(session_id)
            .and_then(|id| t.orders.get(id))
            .cloned())
    }

    async fn save_order(&self, order: &Order) -> Result<(), RepoError> {
        let mut t = self.inner.write().await;
        if let Some(existing) = t.orders_by_session.get(&order.session_id) {
            if *existing != order.id {
                return Err(RepoError::UniqueViolation { constraint: UniqueConstraint::OrderSessionId });
            }
        }
        t.orders_by_session.insert(order.session_id.clone(), order.id);
        t.orders.insert(order.id, order.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use skylane_domain::{BillingSnapshot, FlightStatus, SeatClass};

    fn flight() -> Flight {
        Flight {
            id: Uuid::new_v4(),
            flight_number: "SL101".to_string(),
            origin: "AMS".to_string(),
            destination: "LIS".to_string(),
            departure: Utc::now(),
            arrival: Utc::now(),
            base_price_cents: 12000,
            status: FlightStatus::Scheduled,
        }
    }

    #[tokio::test]
    async fn assign_seat_is_first_writer_wins() {
        let store = MemoryStore::new();
        let f = flight();
        let seat = Seat::new(f.id, "1A", SeatClass::Business, 5000);
        let seat_id = seat.id;
        store.seed_flight(f, vec![seat]).await;

        let winner = Uuid::new_v4();
        let loser = Uuid::new_v4();
        store.assign_seat(seat_id, winner, None).await.unwrap();
        let err = store.assign_seat(seat_id, loser, None).await.unwrap_err();
        assert!(matches!(err, RepoError::UniqueViolation { constraint: UniqueConstraint::SeatOccupancy }));

        let seat = store.get_seat(seat_id).await.unwrap().unwrap();
        assert_eq!(seat.booking_id, Some(winner));
        assert!(!seat.available);
    }

    #[tokio::test]
    async fn passenger_cannot_hold_two_seats() {
        let store = MemoryStore::new();
        let f = flight();
        let s1 = Seat::new(f.id, "2A", SeatClass::Economy, 0);
        let s2 = Seat::new(f.id, "2B", SeatClass::Economy, 0);
        let (s1_id, s2_id) = (s1.id, s2.id);
        store.seed_flight(f, vec![s1, s2]).await;

        let booking_id = Uuid::new_v4();
        let passenger_id = Uuid::new_v4();
        store.assign_seat(s1_id, booking_id, Some(passenger_id)).await.unwrap();
        let err = store
            .assign_seat(s2_id, booking_id, Some(passenger_id))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::UniqueViolation { constraint: UniqueConstraint::PassengerSeat }));
    }

    #[tokio::test]
    async fn duplicate_pnr_is_rejected() {
        let store = MemoryStore::new();
        let a = Booking::new(Uuid::new_v4(), Uuid::new_v4(), "SAMECODE01".to_string(), 100, 1);
        let mut b = Booking::new(Uuid::new_v4(), Uuid::new_v4(), "SAMECODE01".to_string(), 100, 1);
        store.save_booking(&a).await.unwrap();
        let err = store.save_booking(&b).await.unwrap_err();
        assert!(matches!(err, RepoError::UniqueViolation { constraint: UniqueConstraint::BookingPnr }));

        b.pnr = "OTHERCODE1".to_string();
        store.save_booking(&b).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_session_id_is_rejected() {
        let store = MemoryStore::new();
        let a = Order::new(Uuid::new_v4(), Uuid::new_v4(), "cs_1".to_string(), BillingSnapshot::default(), 100);
        let b = Order::new(Uuid::new_v4(), Uuid::new_v4(), "cs_1".to_string(), BillingSnapshot::default(), 100);
        store.save_order(&a).await.unwrap();
        let err = store.save_order(&b).await.unwrap_err();
        assert!(matches!(err, RepoError::UniqueViolation { constraint: UniqueConstraint::OrderSessionId }));

        // Updating the same order in place is fine.
        store.save_order(&a).await.unwrap();
        assert_eq!(store.order_count().await, 1);
        assert_eq!(
            store.find_by_session_id("cs_1").await.unwrap().unwrap().id,
            a.id
        );
    }
}
