pub mod booking_repo;
pub mod lock_repo;
