pub mod booking;
pub mod events;
pub mod item;
pub mod money;
pub mod time;
