//! Booking aggregate persistence. Row mapping is mechanical; the one rule
//! that is not negotiable is that every query carries the `merchant_id`
//! predicate. A read or write scoped only by booking id would leak rows
//! across tenants.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::domain::booking::{Booking, BookingStatus, Customer};
use crate::domain::item::BookingItem;
use crate::domain::money::Money;
use crate::domain::time::DurationMin;
use crate::entity::bookings::{
    ActiveModel as BookingActive, Column as BookingCol, Entity as Bookings, Model as BookingModel,
};
use crate::error::{AppError, AppResult};

pub async fn insert<C: ConnectionTrait>(conn: &C, booking: &Booking) -> AppResult<()> {
    BookingActive {
        id: Set(booking.id),
        merchant_id: Set(booking.merchant_id),
        staff_id: Set(booking.staff_id),
        status: Set(booking.status.as_str().to_string()),
        start_at: Set(booking.start_at.into()),
        end_at: Set(booking.end_at.into()),
        customer: Set(serde_json::to_value(&booking.customer).map_err(anyhow::Error::from)?),
        items: Set(serde_json::to_value(&booking.items).map_err(anyhow::Error::from)?),
        total_price_amount: Set(booking.total_price.amount()),
        total_price_currency: Set(booking.total_price.currency().to_string()),
        total_duration_minutes: Set(booking.total_duration.minutes() as i32),
        notes: Set(booking.notes.clone()),
        cancel_reason: Set(booking.cancel_reason.clone()),
        created_at: Set(booking.created_at.into()),
        updated_at: Set(booking.updated_at.into()),
        cancelled_at: Set(booking.cancelled_at.map(Into::into)),
        completed_at: Set(booking.completed_at.map(Into::into)),
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Persist a state transition (status, schedule, stamps). Items and customer
/// are immutable after creation and are not rewritten.
pub async fn update<C: ConnectionTrait>(conn: &C, booking: &Booking) -> AppResult<()> {
    let model = Bookings::find()
        .filter(
            Condition::all()
                .add(BookingCol::MerchantId.eq(booking.merchant_id))
                .add(BookingCol::Id.eq(booking.id)),
        )
        .one(conn)
        .await?
        .ok_or(AppError::BookingNotFound)?;

    let mut active: BookingActive = model.into();
    active.status = Set(booking.status.as_str().to_string());
    active.start_at = Set(booking.start_at.into());
    active.end_at = Set(booking.end_at.into());
    active.cancel_reason = Set(booking.cancel_reason.clone());
    active.updated_at = Set(booking.updated_at.into());
    active.cancelled_at = Set(booking.cancelled_at.map(Into::into));
    active.completed_at = Set(booking.completed_at.map(Into::into));
    active.update(conn).await?;
    Ok(())
}

pub async fn find_by_id<C: ConnectionTrait>(
    conn: &C,
    merchant_id: Uuid,
    id: Uuid,
) -> AppResult<Booking> {
    let model = Bookings::find()
        .filter(
            Condition::all()
                .add(BookingCol::MerchantId.eq(merchant_id))
                .add(BookingCol::Id.eq(id)),
        )
        .one(conn)
        .await?
        .ok_or(AppError::BookingNotFound)?;
    to_domain(model)
}

pub struct ListFilter {
    pub staff_id: Option<i32>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

pub async fn list<C: ConnectionTrait>(
    conn: &C,
    merchant_id: Uuid,
    filter: ListFilter,
    limit: i64,
    offset: i64,
) -> AppResult<(Vec<Booking>, i64)> {
    let mut condition = Condition::all().add(BookingCol::MerchantId.eq(merchant_id));
    if let Some(staff_id) = filter.staff_id {
        condition = condition.add(BookingCol::StaffId.eq(staff_id));
    }
    if let Some(from) = filter.from {
        condition = condition.add(BookingCol::EndAt.gt(from));
    }
    if let Some(to) = filter.to {
        condition = condition.add(BookingCol::StartAt.lt(to));
    }

    let finder = Bookings::find()
        .filter(condition)
        .order_by_desc(BookingCol::StartAt);

    let total = finder.clone().count(conn).await? as i64;
    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(conn)
        .await?;

    let mut bookings = Vec::with_capacity(models.len());
    for model in models {
        bookings.push(to_domain(model)?);
    }
    Ok((bookings, total))
}

/// Non-cancelled bookings created in the calendar month of `now` (UTC).
/// Feeds the subscription gate's monthly counter.
pub async fn count_for_month<C: ConnectionTrait>(
    conn: &C,
    merchant_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<u64> {
    let month_start = Utc
        .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("invalid month start")))?;
    let (next_year, next_month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };
    let month_end = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("invalid month end")))?;

    let count = Bookings::find()
        .filter(
            Condition::all()
                .add(BookingCol::MerchantId.eq(merchant_id))
                .add(BookingCol::CreatedAt.gte(month_start))
                .add(BookingCol::CreatedAt.lt(month_end))
                .add(BookingCol::Status.ne(BookingStatus::Cancelled.as_str())),
        )
        .count(conn)
        .await?;
    Ok(count)
}

fn to_domain(model: BookingModel) -> AppResult<Booking> {
    let status = BookingStatus::parse(&model.status).ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("unknown booking status {:?}", model.status))
    })?;
    let customer: Customer =
        serde_json::from_value(model.customer).map_err(anyhow::Error::from)?;
    let items: Vec<BookingItem> =
        serde_json::from_value(model.items).map_err(anyhow::Error::from)?;

    Ok(Booking {
        id: model.id,
        merchant_id: model.merchant_id,
        staff_id: model.staff_id,
        status,
        start_at: model.start_at.with_timezone(&Utc),
        end_at: model.end_at.with_timezone(&Utc),
        customer,
        items,
        total_price: Money::new(model.total_price_amount, model.total_price_currency)?,
        total_duration: DurationMin::new(i64::from(model.total_duration_minutes))?,
        notes: model.notes,
        cancel_reason: model.cancel_reason,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        cancelled_at: model.cancelled_at.map(|dt| dt.with_timezone(&Utc)),
        completed_at: model.completed_at.map(|dt| dt.with_timezone(&Utc)),
        events: Vec::new(),
    })
}
