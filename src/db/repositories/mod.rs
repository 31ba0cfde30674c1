mod appointment_repository;
mod availability_repository;

pub use appointment_repository::PgBookingLedger;
pub use availability_repository::PgAvailabilityStore;
