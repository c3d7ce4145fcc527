use async_trait::async_trait;
use skylane_core::payment::{CheckoutMetadata, CheckoutSession, PaymentClient, PaymentError};
use skylane_core::repository::{BookingRepository, OrderRepository};
use skylane_core::DomainError;
use skylane_domain::{BillingSnapshot, BookingStatus, Order};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Starts a payment for a booking: opens a provider checkout session and
/// eagerly creates the Order keyed by that session id, so the webhook path
/// usually finds an existing row to update in place.
pub struct CheckoutService {
    payment: Arc<dyn PaymentClient>,
    bookings: Arc<dyn BookingRepository>,
    orders: Arc<dyn OrderRepository>,
    currency: String,
}

impl CheckoutService {
    pub fn new(
        payment: Arc<dyn PaymentClient>,
        bookings: Arc<dyn BookingRepository>,
        orders: Arc<dyn OrderRepository>,
        currency: String,
    ) -> Self {
        Self { payment, bookings, orders, currency }
    }

    pub async fn initiate_checkout(
        &self,
        booking_id: Uuid,
        billing: BillingSnapshot,
    ) -> Result<(Order, CheckoutSession), DomainError> {
        let mut booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("booking", booking_id))?;

        if booking.booking_status == BookingStatus::Confirmed {
            return Err(DomainError::Business(format!(
                "booking {} is already paid",
                booking_id
            )));
        }
        if booking.booking_status == BookingStatus::Cancelled {
            return Err(DomainError::Business(format!(
                "booking {} is cancelled",
                booking_id
            )));
        }

        let metadata = CheckoutMetadata {
            user_id: booking.user_id.to_string(),
            booking_id: booking.id.to_string(),
        };
        let session = self
            .payment
            .create_checkout_session(booking.total_amount_cents, &self.currency, metadata)
            .await
            .map_err(|e| match e {
                PaymentError::Provider(msg) => DomainError::Storage(msg),
                other => DomainError::Business(other.to_string()),
            })?;

        let order = Order::new(
            booking.user_id,
            booking.id,
            session.session_id.clone(),
            billing,
            booking.total_amount_cents,
        );
        self.orders.save_order(&order).await?;

        // Creating the session does not advance the booking; it stays
        // PENDING until the provider reports back.
        booking.order_id = Some(order.id);
        self.bookings.save_booking(&booking).await?;

        info!(booking_id = %booking.id, session_id = %session.session_id, "checkout session created");
        Ok((order, session))
    }
}

/// Stand-in provider for tests and local runs: hands out unique session
/// ids and never talks to a network.
pub struct MockPaymentClient;

#[async_trait]
impl PaymentClient for MockPaymentClient {
    async fn create_checkout_session(
        &self,
        _amount_cents: i64,
        _currency: &str,
        metadata: CheckoutMetadata,
    ) -> Result<CheckoutSession, PaymentError> {
        let session_id = format!("cs_mock_{}", Uuid::new_v4().simple());
        Ok(CheckoutSession {
            redirect_url: format!(
                "https://pay.example.test/checkout/{}?booking={}",
                session_id, metadata.booking_id
            ),
            session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skylane_domain::{Booking, PaymentStatus};
    use skylane_store::MemoryStore;

    async fn pending_booking(store: &MemoryStore) -> Booking {
        let booking = Booking::new(Uuid::new_v4(), Uuid::new_v4(), skylane_core::pnr::generate(), 42000, 2);
        store.save_booking(&booking).await.unwrap();
        booking
    }

    fn service(store: Arc<MemoryStore>) -> CheckoutService {
        CheckoutService::new(
            Arc::new(MockPaymentClient),
            store.clone(),
            store,
            "USD".to_string(),
        )
    }

    #[tokio::test]
    async fn checkout_creates_order_and_links_booking() {
        let store = Arc::new(MemoryStore::new());
        let booking = pending_booking(&store).await;
        let checkout = service(store.clone());

        let (order, session) = checkout
            .initiate_checkout(booking.id, BillingSnapshot::default())
            .await
            .unwrap();

        assert_eq!(order.booking_id, booking.id);
        assert_eq!(order.session_id, session.session_id);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.total_amount_cents, 42000);

        let booking = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(booking.order_id, Some(order.id));
        // Session creation alone never advances the booking.
        assert_eq!(booking.booking_status, BookingStatus::Pending);

        let found = store.find_by_session_id(&session.session_id).await.unwrap().unwrap();
        assert_eq!(found.id, order.id);
    }

    #[tokio::test]
    async fn checkout_for_unknown_booking_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let checkout = service(store);
        let err = checkout
            .initiate_checkout(Uuid::new_v4(), BillingSnapshot::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { kind: "booking", .. }));
    }

    #[tokio::test]
    async fn confirmed_booking_cannot_start_another_checkout() {
        let store = Arc::new(MemoryStore::new());
        let mut booking = pending_booking(&store).await;
        booking.apply_payment_outcome(skylane_domain::PaymentOutcome::Settled);
        store.save_booking(&booking).await.unwrap();

        let checkout = service(store);
        let err = checkout
            .initiate_checkout(booking.id, BillingSnapshot::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Business(_)));
    }
}
