use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The consistency boundary for one reservation: the booking row plus the
/// ids of its passengers and seats. Relationships are id references resolved
/// through repositories, never embedded object graphs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub flight_id: Uuid,
    /// 10-character public booking reference, unique across all bookings.
    pub pnr: String,
    pub total_amount_cents: i64,
    pub passenger_count: u32,
    pub booking_status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub passenger_ids: Vec<Uuid>,
    pub seat_ids: Vec<Uuid>,
    /// Back-reference for convenience only; the Order is the authoritative
    /// payment record.
    pub order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Processing,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    InProgress,
    Paid,
    Failed,
    RefundPending,
    Refunded,
    Cancelled,
}

/// What a provider event means for the booking, after collapsing the
/// provider's status vocabulary into the one authoritative transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentOutcome {
    /// Provider reports the session as paid/succeeded.
    Settled,
    /// Payment started but not settled (unpaid, requires action, processing).
    ActionRequired,
    /// Payment failed, was cancelled, or the session expired.
    Failed,
}

/// Collapse a provider payment-status string into a [`PaymentOutcome`].
/// Unknown strings return `None` and are ignorable by callers.
pub fn classify_provider_status(status: &str) -> Option<PaymentOutcome> {
    match status.to_ascii_lowercase().as_str() {
        "paid" | "succeeded" | "complete" | "completed" => Some(PaymentOutcome::Settled),
        "unpaid" | "pending" | "processing" | "in_progress" | "requires_action"
        | "requires_payment_method" => Some(PaymentOutcome::ActionRequired),
        "failed" | "payment_failed" | "canceled" | "cancelled" | "expired" => {
            Some(PaymentOutcome::Failed)
        }
        _ => None,
    }
}

impl Booking {
    pub fn new(
        user_id: Uuid,
        flight_id: Uuid,
        pnr: String,
        total_amount_cents: i64,
        passenger_count: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            flight_id,
            pnr,
            total_amount_cents,
            passenger_count,
            booking_status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            passenger_ids: Vec::new(),
            seat_ids: Vec::new(),
            order_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a payment-driven transition. Returns `false` (no state change)
    /// when the booking is already in a terminal status, which makes stale
    /// or duplicate provider events a no-op.
    pub fn apply_payment_outcome(&mut self, outcome: PaymentOutcome) -> bool {
        if self.booking_status.is_terminal() {
            return false;
        }
        match outcome {
            PaymentOutcome::Settled => {
                self.booking_status = BookingStatus::Confirmed;
                self.payment_status = PaymentStatus::Paid;
            }
            PaymentOutcome::ActionRequired => {
                self.booking_status = BookingStatus::Processing;
                self.payment_status = PaymentStatus::InProgress;
            }
            PaymentOutcome::Failed => {
                // Not auto-cancelled: the booking stays re-payable.
                self.booking_status = BookingStatus::Pending;
                self.payment_status = PaymentStatus::Failed;
            }
        }
        self.updated_at = Utc::now();
        true
    }

    pub fn cancel(&mut self) {
        self.booking_status = BookingStatus::Cancelled;
        self.payment_status = PaymentStatus::Cancelled;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_booking() -> Booking {
        Booking::new(Uuid::new_v4(), Uuid::new_v4(), "ABCDEF1234".to_string(), 25000, 1)
    }

    #[test]
    fn settled_outcome_confirms_booking() {
        let mut booking = pending_booking();
        assert!(booking.apply_payment_outcome(PaymentOutcome::Settled));
        assert_eq!(booking.booking_status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Paid);
    }

    #[test]
    fn action_required_moves_to_processing_then_paid() {
        let mut booking = pending_booking();
        assert!(booking.apply_payment_outcome(PaymentOutcome::ActionRequired));
        assert_eq!(booking.booking_status, BookingStatus::Processing);
        assert_eq!(booking.payment_status, PaymentStatus::InProgress);

        assert!(booking.apply_payment_outcome(PaymentOutcome::Settled));
        assert_eq!(booking.booking_status, BookingStatus::Confirmed);
    }

    #[test]
    fn failure_returns_booking_to_pending() {
        let mut booking = pending_booking();
        booking.apply_payment_outcome(PaymentOutcome::ActionRequired);
        assert!(booking.apply_payment_outcome(PaymentOutcome::Failed));
        assert_eq!(booking.booking_status, BookingStatus::Pending);
        assert_eq!(booking.payment_status, PaymentStatus::Failed);
    }

    #[test]
    fn confirmed_booking_ignores_stale_events() {
        let mut booking = pending_booking();
        booking.apply_payment_outcome(PaymentOutcome::Settled);

        assert!(!booking.apply_payment_outcome(PaymentOutcome::Failed));
        assert_eq!(booking.booking_status, BookingStatus::Confirmed);
        assert_eq!(booking.payment_status, PaymentStatus::Paid);

        assert!(!booking.apply_payment_outcome(PaymentOutcome::ActionRequired));
        assert_eq!(booking.booking_status, BookingStatus::Confirmed);
    }

    #[test]
    fn provider_status_classification() {
        assert_eq!(classify_provider_status("paid"), Some(PaymentOutcome::Settled));
        assert_eq!(classify_provider_status("SUCCEEDED"), Some(PaymentOutcome::Settled));
        assert_eq!(classify_provider_status("unpaid"), Some(PaymentOutcome::ActionRequired));
        assert_eq!(classify_provider_status("requires_action"), Some(PaymentOutcome::ActionRequired));
        assert_eq!(classify_provider_status("expired"), Some(PaymentOutcome::Failed));
        assert_eq!(classify_provider_status("canceled"), Some(PaymentOutcome::Failed));
        assert_eq!(classify_provider_status("something_new"), None);
    }
}
