use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

pub const AGGREGATE_BOOKING: &str = "booking";

pub const BOOKING_REQUESTED: &str = "BookingRequested";
pub const BOOKING_CONFIRMED: &str = "BookingConfirmed";
pub const BOOKING_CANCELLED: &str = "BookingCancelled";
pub const BOOKING_COMPLETED: &str = "BookingCompleted";
pub const BOOKING_RESCHEDULED: &str = "BookingRescheduled";

/// An immutable record of a business fact, published after commit.
/// Consumers must tolerate unknown payload fields.
#[derive(Debug, Clone, Serialize)]
pub struct DomainEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub occurred_at: DateTime<Utc>,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub payload: Value,
}

impl DomainEvent {
    pub fn for_booking(event_type: &str, booking_id: Uuid, payload: Value) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.to_string(),
            occurred_at: Utc::now(),
            aggregate_type: AGGREGATE_BOOKING.to_string(),
            aggregate_id: booking_id.to_string(),
            payload,
        }
    }
}
