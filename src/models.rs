use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::booking::Booking;
use crate::domain::item::BookingItem;
use crate::domain::money::Money;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MoneyView {
    pub amount: Decimal,
    pub currency: String,
}

impl From<&Money> for MoneyView {
    fn from(money: &Money) -> Self {
        Self {
            amount: money.amount(),
            currency: money.currency().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerView {
    pub line_user_id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingItemView {
    pub service_id: Uuid,
    pub service_name: String,
    pub service_price: MoneyView,
    pub service_duration_minutes: i64,
    pub option_ids: Vec<Uuid>,
    pub option_names: Vec<String>,
    pub option_prices: Vec<MoneyView>,
    pub option_duration_minutes: Vec<i64>,
}

impl From<&BookingItem> for BookingItemView {
    fn from(item: &BookingItem) -> Self {
        Self {
            service_id: item.service_id,
            service_name: item.service_name.clone(),
            service_price: MoneyView::from(&item.service_price),
            service_duration_minutes: item.service_duration.minutes(),
            option_ids: item.option_ids.clone(),
            option_names: item.option_names.clone(),
            option_prices: item.option_prices.iter().map(MoneyView::from).collect(),
            option_duration_minutes: item
                .option_durations
                .iter()
                .map(|d| d.minutes())
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingView {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub staff_id: i32,
    pub status: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub customer: CustomerView,
    pub items: Vec<BookingItemView>,
    pub total_price: MoneyView,
    pub total_duration_minutes: i64,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&Booking> for BookingView {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            merchant_id: booking.merchant_id,
            staff_id: booking.staff_id,
            status: booking.status.to_string(),
            start_at: booking.start_at,
            end_at: booking.end_at,
            customer: CustomerView {
                line_user_id: booking.customer.line_user_id.clone(),
                name: booking.customer.name.clone(),
                phone: booking.customer.phone.clone(),
                email: booking.customer.email.clone(),
            },
            items: booking.items.iter().map(BookingItemView::from).collect(),
            total_price: MoneyView::from(&booking.total_price),
            total_duration_minutes: booking.total_duration.minutes(),
            notes: booking.notes.clone(),
            cancel_reason: booking.cancel_reason.clone(),
            created_at: booking.created_at,
            updated_at: booking.updated_at,
            cancelled_at: booking.cancelled_at,
            completed_at: booking.completed_at,
        }
    }
}
