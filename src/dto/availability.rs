use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, ToSchema)]
pub struct SlotView {
    /// Candidate start time in the merchant's zone.
    pub start_local: DateTime<FixedOffset>,
    pub available: bool,
    /// Booking currently holding the window, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booked_by: Option<Uuid>,
}

/// The slot list is a snapshot taken at `as_of`; creation re-validates
/// against the lock table, so treat `available` as advisory.
#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityView {
    pub date: NaiveDate,
    pub as_of: DateTime<Utc>,
    pub slots: Vec<SlotView>,
}
