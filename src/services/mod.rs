pub mod accounts;
pub mod assistant;
pub mod bookings;
pub mod report;
pub mod session;
