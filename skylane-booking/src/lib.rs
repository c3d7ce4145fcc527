pub mod registry;
pub mod service;

pub use registry::SeatRegistry;
pub use service::BookingService;
