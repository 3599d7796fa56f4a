pub mod booking;
pub mod payment;
pub mod service;

pub use booking::{Booking, BookingStatus};
pub use payment::{cents_to_dollars, dollars_to_cents, Payment, PaymentStatus, PaymentType};
pub use service::Service;
