use skylane_booking::BookingService;
use skylane_order::{CheckoutService, PaymentReconciler};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
    pub checkout: Arc<CheckoutService>,
    pub reconciler: Arc<PaymentReconciler>,
    pub webhook_secret: String,
}
