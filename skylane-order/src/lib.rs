pub mod checkout;
pub mod reconciler;

pub use checkout::{CheckoutService, MockPaymentClient};
pub use reconciler::{PaymentReconciler, ReconcileOutcome};
