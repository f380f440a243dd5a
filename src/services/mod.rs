pub mod availability_service;
pub mod booking_service;
