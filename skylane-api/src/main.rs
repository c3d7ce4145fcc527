use skylane_api::{app, AppState};
use skylane_booking::{BookingService, SeatRegistry};
use skylane_order::{CheckoutService, MockPaymentClient, PaymentReconciler};
use skylane_store::MemoryStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skylane_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = skylane_store::Config::load().expect("Failed to load config");
    tracing::info!("Starting Skylane API on port {}", config.server.port);

    // In-memory store; the production deployment swaps in the relational
    // implementations of the same repository traits.
    let store = Arc::new(MemoryStore::new());

    let registry = SeatRegistry::new(store.clone());
    let bookings = Arc::new(BookingService::new(
        store.clone(),
        registry,
        store.clone(),
        store.clone(),
    ));
    let checkout = Arc::new(CheckoutService::new(
        Arc::new(MockPaymentClient),
        store.clone(),
        store.clone(),
        config.payment.currency.clone(),
    ));
    let reconciler = Arc::new(PaymentReconciler::new(store.clone(), store.clone()));

    let app_state = AppState {
        bookings,
        checkout,
        reconciler,
        webhook_secret: config.payment.webhook_secret.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
