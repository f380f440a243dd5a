use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BookingItemRequest {
    pub service_id: Uuid,
    #[serde(default)]
    pub option_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CustomerPayload {
    pub line_user_id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// `start_at` is an RFC-3339 instant and must carry an offset; naive local
/// times are rejected.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub staff_id: i32,
    pub start_at: String,
    pub items: Vec<BookingItemRequest>,
    pub customer: CustomerPayload,
    pub notes: Option<String>,
    /// Keep the booking pending (two-phase hold) instead of confirming
    /// immediately. The window is reserved either way.
    #[serde(default)]
    pub hold: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CancelBookingRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RescheduleBookingRequest {
    pub new_start_at: String,
}
