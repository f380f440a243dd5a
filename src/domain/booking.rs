use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::domain::events::{self, DomainEvent};
use crate::domain::item::BookingItem;
use crate::domain::money::Money;
use crate::domain::time::{DurationMin, TimeSlot};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Completed and cancelled are absorbing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub line_user_id: Option<String>,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// The booking aggregate. State transitions stamp their timestamp and push
/// exactly one event; events are drained by the orchestrator after the
/// surrounding transaction commits.
#[derive(Debug, Clone)]
pub struct Booking {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub staff_id: i32,
    pub status: BookingStatus,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub customer: Customer,
    pub items: Vec<BookingItem>,
    pub total_price: Money,
    pub total_duration: DurationMin,
    pub notes: Option<String>,
    pub cancel_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub(crate) events: Vec<DomainEvent>,
}

impl Booking {
    pub fn new(
        merchant_id: Uuid,
        staff_id: i32,
        start_at: DateTime<Utc>,
        customer: Customer,
        items: Vec<BookingItem>,
        notes: Option<String>,
    ) -> AppResult<Self> {
        if items.is_empty() {
            return Err(AppError::EmptyItems);
        }

        let total_duration: DurationMin = items.iter().map(|i| i.total_duration()).sum();
        let total_price = items.iter().skip(1).try_fold(
            items[0].total_price()?,
            |acc, item| acc.add(&item.total_price()?),
        )?;

        // Also guards against a zero total duration.
        let slot = TimeSlot::from_duration(start_at, total_duration)?;

        let now = Utc::now();
        let id = Uuid::new_v4();
        let mut booking = Self {
            id,
            merchant_id,
            staff_id,
            status: BookingStatus::Pending,
            start_at: slot.start(),
            end_at: slot.end(),
            customer,
            items,
            total_price,
            total_duration,
            notes,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
            cancelled_at: None,
            completed_at: None,
            events: Vec::new(),
        };
        booking.emit(events::BOOKING_REQUESTED, json!({}));
        Ok(booking)
    }

    pub fn slot(&self) -> TimeSlot {
        // Invariant start_at < end_at holds for any constructed aggregate.
        TimeSlot::new(self.start_at, self.end_at).expect("booking slot invariant")
    }

    pub fn confirm(&mut self) -> AppResult<()> {
        self.ensure_transition(BookingStatus::Confirmed)?;
        self.status = BookingStatus::Confirmed;
        self.updated_at = Utc::now();
        self.emit(
            events::BOOKING_CONFIRMED,
            json!({
                "customer_name": self.customer.name,
                "total_price": self.total_price,
                "total_duration_minutes": self.total_duration,
            }),
        );
        Ok(())
    }

    pub fn cancel(&mut self, actor: &str, reason: Option<String>) -> AppResult<()> {
        self.ensure_transition(BookingStatus::Cancelled)?;
        let now = Utc::now();
        self.status = BookingStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.cancel_reason = reason.clone();
        self.updated_at = now;
        self.emit(
            events::BOOKING_CANCELLED,
            json!({
                "actor": actor,
                "reason": reason,
            }),
        );
        Ok(())
    }

    /// Merchants may complete early; we only require the transition itself
    /// to be legal.
    pub fn complete(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.ensure_transition(BookingStatus::Completed)?;
        self.status = BookingStatus::Completed;
        self.completed_at = Some(now);
        self.updated_at = now;
        self.emit(events::BOOKING_COMPLETED, json!({}));
        Ok(())
    }

    pub fn reschedule(&mut self, new_start: DateTime<Utc>) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::IllegalTransition {
                from: self.status,
                to: self.status,
            });
        }
        let old_start = self.start_at;
        let slot = TimeSlot::from_duration(new_start, self.total_duration)?;
        self.start_at = slot.start();
        self.end_at = slot.end();
        self.updated_at = Utc::now();
        self.emit(
            events::BOOKING_RESCHEDULED,
            json!({
                "old_start_at": old_start,
                "new_start_at": self.start_at,
                "new_end_at": self.end_at,
            }),
        );
        Ok(())
    }

    /// Drain collected events. Called once, after commit.
    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn ensure_transition(&self, to: BookingStatus) -> AppResult<()> {
        let legal = matches!(
            (self.status, to),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
        );
        if !legal {
            return Err(AppError::IllegalTransition {
                from: self.status,
                to,
            });
        }
        Ok(())
    }

    fn emit(&mut self, event_type: &str, mut payload: serde_json::Value) {
        if let Some(map) = payload.as_object_mut() {
            map.insert("merchant_id".into(), json!(self.merchant_id));
            map.insert("staff_id".into(), json!(self.staff_id));
            map.insert("start_at".into(), json!(self.start_at));
            map.insert("end_at".into(), json!(self.end_at));
            map.insert("status".into(), json!(self.status));
        }
        self.events
            .push(DomainEvent::for_booking(event_type, self.id, payload));
    }
}
