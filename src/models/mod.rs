pub mod booking;
pub mod status;
pub mod user;

pub use booking::{Booking, BookingPatch, NewBooking, ServiceType};
pub use status::BookingStatus;
pub use user::{Account, Role, Session};
