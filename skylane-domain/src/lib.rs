pub mod booking;
pub mod flight;
pub mod order;
pub mod passenger;
pub mod seat;

pub use booking::{classify_provider_status, Booking, BookingStatus, PaymentOutcome, PaymentStatus};
pub use flight::{Flight, FlightStatus};
pub use order::{BillingSnapshot, Order};
pub use passenger::{Gender, Passenger, PassengerSpec};
pub use seat::{Seat, SeatClass};
