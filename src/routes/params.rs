use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct Pagination {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl Pagination {
    pub fn normalize(&self) -> (i64, i64, i64) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        (page, per_page, offset)
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookingListQuery {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub staff_id: Option<i32>,
    /// RFC-3339 instant with offset; bookings ending after this point.
    pub from: Option<String>,
    /// RFC-3339 instant with offset; bookings starting before this point.
    pub to: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityQuery {
    pub staff_id: i32,
    /// Calendar date in the merchant's zone, `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub service_id: Uuid,
}
