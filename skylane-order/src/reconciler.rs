use skylane_core::payment::ProviderEvent;
use skylane_core::repository::{BookingRepository, OrderRepository, RepoError};
use skylane_core::DomainError;
use skylane_domain::{classify_provider_status, BookingStatus, Order, PaymentStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// What a reconciliation call did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The transition was applied to both booking and order.
    Applied {
        booking_status: BookingStatus,
        payment_status: PaymentStatus,
    },
    /// Fast path: the session's order is already paid (or the booking is
    /// confirmed). Duplicate delivery; nothing written.
    AlreadySettled,
    /// Event carried an unknown status, arrived for a terminal booking, or
    /// lost a concurrent-delivery race. Acknowledged without effect.
    Ignored,
}

/// Translates provider callback events into booking/order state, exactly
/// once per logical event. The order's unique session id is the
/// de-duplication gate; at-least-once and out-of-order delivery both
/// collapse into no-ops here. Deliveries for one booking are serialized:
/// the whole read-classify-write sequence runs under a per-booking lock,
/// the in-process stand-in for the relational store's row lock.
pub struct PaymentReconciler {
    bookings: Arc<dyn BookingRepository>,
    orders: Arc<dyn OrderRepository>,
    booking_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl PaymentReconciler {
    pub fn new(bookings: Arc<dyn BookingRepository>, orders: Arc<dyn OrderRepository>) -> Self {
        Self { bookings, orders, booking_locks: Mutex::new(HashMap::new()) }
    }

    async fn booking_lock(&self, booking_id: Uuid) -> Arc<Mutex<()>> {
        self.booking_locks.lock().await.entry(booking_id).or_default().clone()
    }

    pub async fn reconcile(&self, event: &ProviderEvent) -> Result<ReconcileOutcome, DomainError> {
        let (booking_id, user_id) = resolve_metadata(event)?;

        // Without this, two concurrent deliveries with different statuses
        // could both read the same booking state and race their writes,
        // letting a stale event overwrite a fresher transition.
        let lock = self.booking_lock(booking_id).await;
        let _guard = lock.lock().await;

        let mut booking = self
            .bookings
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| {
                DomainError::Business(format!(
                    "event {} references unknown booking {}",
                    event.id, booking_id
                ))
            })?;

        // Idempotency gate: one order per session id. A settled order (or a
        // confirmed booking) means this event was already processed.
        let existing = self.orders.find_by_session_id(&event.session_id).await?;
        if let Some(order) = &existing {
            if order.is_settled() || booking.booking_status == BookingStatus::Confirmed {
                info!(session_id = %event.session_id, "duplicate delivery for settled session, skipping");
                return Ok(ReconcileOutcome::AlreadySettled);
            }
        }

        let Some(outcome) = classify_provider_status(&event.payment_status) else {
            warn!(
                event_id = %event.id,
                status = %event.payment_status,
                "unrecognized provider payment status, ignoring"
            );
            return Ok(ReconcileOutcome::Ignored);
        };

        if !booking.apply_payment_outcome(outcome) {
            // Terminal booking with no settled order on file (e.g. manually
            // cancelled); the stale event cannot move it.
            info!(booking_id = %booking.id, "booking is terminal, ignoring stale event");
            return Ok(ReconcileOutcome::Ignored);
        }

        // No order yet for this session: the webhook beat (or replaced) the
        // checkout-initiation path. Build one from the event's billing
        // snapshot.
        let mut order = existing.unwrap_or_else(|| {
            Order::new(
                user_id,
                booking.id,
                event.session_id.clone(),
                event.billing.clone().unwrap_or_default(),
                booking.total_amount_cents,
            )
        });
        order.update_payment_status(booking.payment_status);
        booking.order_id = Some(order.id);

        // Order first: it is the authoritative payment record the booking
        // back-references.
        match self.orders.save_order(&order).await {
            Ok(()) => {}
            Err(RepoError::UniqueViolation { .. }) => {
                // A concurrent delivery inserted the order for this session
                // between our lookup and write. That delivery owns the
                // transition.
                warn!(session_id = %event.session_id, "lost concurrent reconcile race, ignoring");
                return Ok(ReconcileOutcome::Ignored);
            }
            Err(e) => return Err(e.into()),
        }
        self.bookings.save_booking(&booking).await?;

        info!(
            booking_id = %booking.id,
            order_id = %order.id,
            booking_status = ?booking.booking_status,
            payment_status = ?booking.payment_status,
            "payment event reconciled"
        );
        Ok(ReconcileOutcome::Applied {
            booking_status: booking.booking_status,
            payment_status: booking.payment_status,
        })
    }
}

fn resolve_metadata(event: &ProviderEvent) -> Result<(Uuid, Uuid), DomainError> {
    let metadata = event.metadata.as_ref().ok_or_else(|| {
        DomainError::Business(format!("event {} carries no metadata", event.id))
    })?;
    let booking_id = Uuid::parse_str(&metadata.booking_id).map_err(|_| {
        DomainError::Business(format!(
            "event {} has unresolvable booking id {:?}",
            event.id, metadata.booking_id
        ))
    })?;
    let user_id = Uuid::parse_str(&metadata.user_id).map_err(|_| {
        DomainError::Business(format!(
            "event {} has unresolvable user id {:?}",
            event.id, metadata.user_id
        ))
    })?;
    Ok((booking_id, user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use skylane_core::payment::CheckoutMetadata;
    use skylane_domain::{BillingSnapshot, Booking};
    use skylane_store::MemoryStore;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    async fn pending_booking(store: &MemoryStore) -> Booking {
        let booking = Booking::new(Uuid::new_v4(), Uuid::new_v4(), skylane_core::pnr::generate(), 50000, 1);
        store.save_booking(&booking).await.unwrap();
        booking
    }

    fn event(booking: &Booking, session_id: &str, status: &str) -> ProviderEvent {
        ProviderEvent {
            id: format!("evt_{}", Uuid::new_v4().simple()),
            event_type: "checkout.session.completed".to_string(),
            session_id: session_id.to_string(),
            payment_status: status.to_string(),
            metadata: Some(CheckoutMetadata {
                user_id: booking.user_id.to_string(),
                booking_id: booking.id.to_string(),
            }),
            billing: Some(BillingSnapshot {
                name: Some("Jo Bloggs".to_string()),
                email: Some("jo@example.test".to_string()),
                ..Default::default()
            }),
        }
    }

    #[tokio::test]
    async fn paid_event_confirms_booking_and_creates_order() {
        let store = Arc::new(MemoryStore::new());
        let booking = pending_booking(&store).await;
        let reconciler = PaymentReconciler::new(store.clone(), store.clone());

        let outcome = reconciler.reconcile(&event(&booking, "cs_1", "paid")).await.unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Applied {
                booking_status: BookingStatus::Confirmed,
                payment_status: PaymentStatus::Paid,
            }
        );

        let booking = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(booking.booking_status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Paid);

        let order = store.find_by_session_id("cs_1").await.unwrap().unwrap();
        assert_eq!(order.booking_id, booking.id);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(booking.order_id, Some(order.id));
        assert_eq!(order.billing.email.as_deref(), Some("jo@example.test"));
    }

    #[tokio::test]
    async fn redelivered_event_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        let booking = pending_booking(&store).await;
        let reconciler = PaymentReconciler::new(store.clone(), store.clone());

        let evt = event(&booking, "cs_dup", "paid");
        reconciler.reconcile(&evt).await.unwrap();
        let first = store.get_booking(booking.id).await.unwrap().unwrap();

        let outcome = reconciler.reconcile(&evt).await.unwrap();
        assert_eq!(outcome, ReconcileOutcome::AlreadySettled);
        assert_eq!(store.order_count().await, 1);

        let second = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(second.booking_status, first.booking_status);
        assert_eq!(second.payment_status, first.payment_status);
    }

    #[tokio::test]
    async fn stale_failure_cannot_regress_a_confirmed_booking() {
        let store = Arc::new(MemoryStore::new());
        let booking = pending_booking(&store).await;
        let reconciler = PaymentReconciler::new(store.clone(), store.clone());

        reconciler.reconcile(&event(&booking, "cs_2", "paid")).await.unwrap();
        let outcome = reconciler
            .reconcile(&event(&booking, "cs_2", "async_payment_failed"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::AlreadySettled);

        let booking = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(booking.booking_status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn failed_then_paid_recovers_on_the_same_session() {
        let store = Arc::new(MemoryStore::new());
        let booking = pending_booking(&store).await;
        let reconciler = PaymentReconciler::new(store.clone(), store.clone());

        reconciler.reconcile(&event(&booking, "cs_3", "failed")).await.unwrap();
        let after_failure = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(after_failure.booking_status, BookingStatus::Pending);
        assert_eq!(after_failure.payment_status, PaymentStatus::Failed);

        reconciler.reconcile(&event(&booking, "cs_3", "paid")).await.unwrap();
        let recovered = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(recovered.booking_status, BookingStatus::Confirmed);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn unpaid_event_moves_booking_to_processing() {
        let store = Arc::new(MemoryStore::new());
        let booking = pending_booking(&store).await;
        let reconciler = PaymentReconciler::new(store.clone(), store.clone());

        let outcome = reconciler.reconcile(&event(&booking, "cs_4", "unpaid")).await.unwrap();
        assert_eq!(
            outcome,
            ReconcileOutcome::Applied {
                booking_status: BookingStatus::Processing,
                payment_status: PaymentStatus::InProgress,
            }
        );
    }

    #[tokio::test]
    async fn existing_order_is_updated_in_place() {
        let store = Arc::new(MemoryStore::new());
        let booking = pending_booking(&store).await;
        let order = Order::new(
            booking.user_id,
            booking.id,
            "cs_eager".to_string(),
            BillingSnapshot::default(),
            booking.total_amount_cents,
        );
        store.save_order(&order).await.unwrap();

        let reconciler = PaymentReconciler::new(store.clone(), store.clone());
        reconciler.reconcile(&event(&booking, "cs_eager", "paid")).await.unwrap();

        assert_eq!(store.order_count().await, 1);
        let updated = store.find_by_session_id("cs_eager").await.unwrap().unwrap();
        assert_eq!(updated.id, order.id);
        assert_eq!(updated.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn missing_metadata_is_a_business_error() {
        let store = Arc::new(MemoryStore::new());
        let booking = pending_booking(&store).await;
        let reconciler = PaymentReconciler::new(store.clone(), store.clone());

        let mut evt = event(&booking, "cs_5", "paid");
        evt.metadata = None;
        let err = reconciler.reconcile(&evt).await.unwrap_err();
        assert!(matches!(err, DomainError::Business(_)));

        let mut evt = event(&booking, "cs_5", "paid");
        evt.metadata.as_mut().unwrap().booking_id = "not-a-uuid".to_string();
        let err = reconciler.reconcile(&evt).await.unwrap_err();
        assert!(matches!(err, DomainError::Business(_)));
    }

    /// Booking repository that parks the first `save_booking` call until the
    /// test releases it, exposing the window between a delivery's read and
    /// its write.
    struct StalledFirstWrite {
        inner: Arc<MemoryStore>,
        armed: AtomicBool,
        reached: Notify,
        release: Notify,
    }

    impl StalledFirstWrite {
        fn new(inner: Arc<MemoryStore>) -> Self {
            Self {
                inner,
                armed: AtomicBool::new(true),
                reached: Notify::new(),
                release: Notify::new(),
            }
        }
    }

    #[async_trait]
    impl BookingRepository for StalledFirstWrite {
        async fn get_booking(&self, id: Uuid) -> Result<Option<Booking>, RepoError> {
            self.inner.get_booking(id).await
        }

        async fn save_booking(&self, booking: &Booking) -> Result<(), RepoError> {
            if self.armed.swap(false, Ordering::SeqCst) {
                self.reached.notify_one();
                self.release.notified().await;
            }
            self.inner.save_booking(booking).await
        }

        async fn delete_booking(&self, id: Uuid) -> Result<(), RepoError> {
            self.inner.delete_booking(id).await
        }

        async fn bookings_for_user(&self, user_id: Uuid) -> Result<Vec<Booking>, RepoError> {
            self.inner.bookings_for_user(user_id).await
        }
    }

    #[tokio::test]
    async fn concurrent_deliveries_for_one_booking_are_serialized() {
        let store = Arc::new(MemoryStore::new());
        let booking = pending_booking(&store).await;

        // Eager order, as the checkout path leaves it: both deliveries will
        // update the same row in place rather than racing an insert.
        let order = Order::new(
            booking.user_id,
            booking.id,
            "cs_race".to_string(),
            BillingSnapshot::default(),
            booking.total_amount_cents,
        );
        store.save_order(&order).await.unwrap();

        let gated = Arc::new(StalledFirstWrite::new(store.clone()));
        let reconciler =
            Arc::new(PaymentReconciler::new(gated.clone(), store.clone()));

        // An "unpaid" delivery enters first and stalls mid-write.
        let unpaid = {
            let reconciler = reconciler.clone();
            let evt = event(&booking, "cs_race", "unpaid");
            tokio::spawn(async move { reconciler.reconcile(&evt).await })
        };
        gated.reached.notified().await;

        // A "paid" delivery for the same session arrives while the first is
        // still in flight.
        let paid = {
            let reconciler = reconciler.clone();
            let evt = event(&booking, "cs_race", "paid");
            tokio::spawn(async move { reconciler.reconcile(&evt).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        gated.release.notify_one();

        unpaid.await.unwrap().unwrap();
        paid.await.unwrap().unwrap();

        // The settled transition lands last; the stale "unpaid" cannot win,
        // and booking and order agree.
        let booking = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(booking.booking_status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
        let order = store.find_by_session_id("cs_race").await.unwrap().unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn unknown_status_string_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        let booking = pending_booking(&store).await;
        let reconciler = PaymentReconciler::new(store.clone(), store.clone());

        let outcome = reconciler
            .reconcile(&event(&booking, "cs_6", "some_future_status"))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Ignored);

        let booking = store.get_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(booking.booking_status, BookingStatus::Pending);
        assert_eq!(store.order_count().await, 0);
    }
}
