use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::booking::PaymentStatus;

/// The authoritative payment record for a booking. Keyed by the provider's
/// checkout session id, which doubles as the webhook idempotency key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub booking_id: Uuid,
    /// Unique provider session id (e.g. cs_...).
    pub session_id: String,
    pub payment_status: PaymentStatus,
    pub billing: BillingSnapshot,
    pub total_amount_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Customer billing details captured at checkout time. Snapshot semantics:
/// never updated from the user profile after the fact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingSnapshot {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

impl Order {
    pub fn new(
        user_id: Uuid,
        booking_id: Uuid,
        session_id: String,
        billing: BillingSnapshot,
        total_amount_cents: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            booking_id,
            session_id,
            payment_status: PaymentStatus::Pending,
            billing,
            total_amount_cents,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_payment_status(&mut self, status: PaymentStatus) {
        self.payment_status = status;
        self.updated_at = Utc::now();
    }

    pub fn is_settled(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}
