//! Booking orchestrator. One transaction per write: the lock row goes in
//! first (the database rejects overlaps), then the booking row, then the
//! link. Events collected on the aggregate are published only after the
//! transaction commits.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::config::BookingSettings;
use crate::domain::booking::{Booking, Customer};
use crate::domain::item;
use crate::domain::time::parse_instant;
use crate::dto::bookings::{CancelBookingRequest, CreateBookingRequest, RescheduleBookingRequest};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AuthContext, ensure_merchant};
use crate::models::BookingView;
use crate::repo::booking_repo::{self, ListFilter};
use crate::repo::lock_repo;
use crate::response::{ApiResponse, Meta};
use crate::routes::params::BookingListQuery;
use crate::state::AppState;
use crate::subscription::GateDecision;

pub async fn create_booking(
    state: &AppState,
    ctx: &AuthContext,
    merchant_id: Uuid,
    req: CreateBookingRequest,
) -> AppResult<ApiResponse<BookingView>> {
    ensure_merchant(ctx, merchant_id)?;

    let start_at = parse_instant(&req.start_at)?;

    let month_count = booking_repo::count_for_month(&state.orm, merchant_id, Utc::now()).await?;
    match state.gate.allow_booking(merchant_id, month_count) {
        GateDecision::Allowed => {}
        GateDecision::PastDue => return Err(AppError::SubscriptionPastDue),
        GateDecision::QuotaExceeded { limit } => return Err(AppError::QuotaExceeded { limit }),
    }

    let staff = state.catalog.staff_member(merchant_id, req.staff_id).await?;
    if !staff.is_active {
        return Err(AppError::StaffInactive(staff.id));
    }

    if req.items.is_empty() {
        return Err(AppError::EmptyItems);
    }
    let mut items = Vec::with_capacity(req.items.len());
    for item_req in &req.items {
        if !staff.skills.contains(&item_req.service_id) {
            return Err(AppError::StaffCannotPerform {
                staff_id: staff.id,
                service_id: item_req.service_id,
            });
        }
        let service = state
            .catalog
            .service_with_options(merchant_id, item_req.service_id)
            .await?;
        items.push(item::compose(&service, &item_req.option_ids)?);
    }

    let tz = state.catalog.merchant_tz(merchant_id).await?;
    let local_date = start_at.with_timezone(&tz).date_naive();
    if state.catalog.is_holiday(merchant_id, local_date).await? {
        return Err(AppError::ClosedForHoliday(local_date));
    }

    let customer = Customer {
        line_user_id: req.customer.line_user_id.clone(),
        name: req.customer.name.clone(),
        phone: req.customer.phone.clone(),
        email: req.customer.email.clone(),
    };
    let mut booking = Booking::new(
        merchant_id,
        req.staff_id,
        start_at,
        customer,
        items,
        req.notes.clone(),
    )?;
    // Default flow confirms immediately; `hold` keeps the booking pending
    // for a later checkout step while still reserving the window.
    if !req.hold {
        booking.confirm()?;
    }

    with_storage_retry(&state.settings, || persist_new(state, booking.clone())).await?;

    let events = booking.take_events();
    state.bus.publish_all(&events);
    tracing::info!(
        booking_id = %booking.id,
        merchant_id = %merchant_id,
        staff_id = booking.staff_id,
        status = %booking.status,
        "booking created"
    );

    Ok(ApiResponse::success(
        "Booking created",
        BookingView::from(&booking),
        Some(Meta::empty()),
    ))
}

async fn persist_new(state: &AppState, booking: Booking) -> AppResult<()> {
    let txn = state.orm.begin().await?;
    let lock_id = lock_repo::acquire(
        &txn,
        booking.merchant_id,
        booking.staff_id,
        booking.slot(),
    )
    .await?;
    booking_repo::insert(&txn, &booking).await?;
    lock_repo::link_to_booking(&txn, lock_id, booking.id).await?;
    txn.commit().await?;
    Ok(())
}

pub async fn cancel_booking(
    state: &AppState,
    ctx: &AuthContext,
    merchant_id: Uuid,
    booking_id: Uuid,
    req: CancelBookingRequest,
) -> AppResult<ApiResponse<BookingView>> {
    ensure_merchant(ctx, merchant_id)?;

    let mut booking = with_storage_retry(&state.settings, || {
        cancel_once(
            state,
            merchant_id,
            booking_id,
            ctx.role.clone(),
            req.reason.clone(),
        )
    })
    .await?;

    let events = booking.take_events();
    state.bus.publish_all(&events);
    tracing::info!(booking_id = %booking_id, merchant_id = %merchant_id, "booking cancelled");

    Ok(ApiResponse::success(
        "Booking cancelled",
        BookingView::from(&booking),
        Some(Meta::empty()),
    ))
}

async fn cancel_once(
    state: &AppState,
    merchant_id: Uuid,
    booking_id: Uuid,
    actor: String,
    reason: Option<String>,
) -> AppResult<Booking> {
    let txn = state.orm.begin().await?;
    let mut booking = booking_repo::find_by_id(&txn, merchant_id, booking_id).await?;
    booking.cancel(&actor, reason)?;
    booking_repo::update(&txn, &booking).await?;
    // Free the window in the same transaction as the status flip.
    lock_repo::delete_for_booking(&txn, merchant_id, booking_id).await?;
    txn.commit().await?;
    Ok(booking)
}

pub async fn complete_booking(
    state: &AppState,
    ctx: &AuthContext,
    merchant_id: Uuid,
    booking_id: Uuid,
) -> AppResult<ApiResponse<BookingView>> {
    ensure_merchant(ctx, merchant_id)?;

    let mut booking = with_storage_retry(&state.settings, || {
        complete_once(state, merchant_id, booking_id)
    })
    .await?;

    let events = booking.take_events();
    state.bus.publish_all(&events);

    Ok(ApiResponse::success(
        "Booking completed",
        BookingView::from(&booking),
        Some(Meta::empty()),
    ))
}

async fn complete_once(
    state: &AppState,
    merchant_id: Uuid,
    booking_id: Uuid,
) -> AppResult<Booking> {
    let txn = state.orm.begin().await?;
    let mut booking = booking_repo::find_by_id(&txn, merchant_id, booking_id).await?;
    booking.complete(Utc::now())?;
    booking_repo::update(&txn, &booking).await?;
    txn.commit().await?;
    Ok(booking)
}

pub async fn reschedule_booking(
    state: &AppState,
    ctx: &AuthContext,
    merchant_id: Uuid,
    booking_id: Uuid,
    req: RescheduleBookingRequest,
) -> AppResult<ApiResponse<BookingView>> {
    ensure_merchant(ctx, merchant_id)?;
    let new_start = parse_instant(&req.new_start_at)?;

    let mut booking = with_storage_retry(&state.settings, || {
        reschedule_once(state, merchant_id, booking_id, new_start)
    })
    .await?;

    let events = booking.take_events();
    state.bus.publish_all(&events);
    tracing::info!(
        booking_id = %booking_id,
        merchant_id = %merchant_id,
        new_start = %new_start,
        "booking rescheduled"
    );

    Ok(ApiResponse::success(
        "Booking rescheduled",
        BookingView::from(&booking),
        Some(Meta::empty()),
    ))
}

/// Atomic replace: the old lock is dropped and the new window acquired in
/// one transaction, so either both happen or neither. Dropping the old lock
/// first lets a booking shift onto a range that overlaps its own.
async fn reschedule_once(
    state: &AppState,
    merchant_id: Uuid,
    booking_id: Uuid,
    new_start: chrono::DateTime<Utc>,
) -> AppResult<Booking> {
    let txn = state.orm.begin().await?;
    let mut booking = booking_repo::find_by_id(&txn, merchant_id, booking_id).await?;
    booking.reschedule(new_start)?;

    lock_repo::delete_for_booking(&txn, merchant_id, booking_id).await?;
    let lock_id = lock_repo::acquire(&txn, merchant_id, booking.staff_id, booking.slot()).await?;
    lock_repo::link_to_booking(&txn, lock_id, booking.id).await?;

    booking_repo::update(&txn, &booking).await?;
    txn.commit().await?;
    Ok(booking)
}

pub async fn get_booking(
    state: &AppState,
    ctx: &AuthContext,
    merchant_id: Uuid,
    booking_id: Uuid,
) -> AppResult<ApiResponse<BookingView>> {
    ensure_merchant(ctx, merchant_id)?;
    let booking = booking_repo::find_by_id(&state.orm, merchant_id, booking_id).await?;
    Ok(ApiResponse::success(
        "Ok",
        BookingView::from(&booking),
        Some(Meta::empty()),
    ))
}

pub async fn list_bookings(
    state: &AppState,
    ctx: &AuthContext,
    merchant_id: Uuid,
    query: BookingListQuery,
) -> AppResult<ApiResponse<Vec<BookingView>>> {
    ensure_merchant(ctx, merchant_id)?;
    let (page, limit, offset) = query.pagination.normalize();

    let filter = ListFilter {
        staff_id: query.staff_id,
        from: query.from.as_deref().map(parse_instant).transpose()?,
        to: query.to.as_deref().map(parse_instant).transpose()?,
    };

    let (bookings, total) =
        booking_repo::list(&state.orm, merchant_id, filter, limit, offset).await?;
    let views = bookings.iter().map(BookingView::from).collect();

    Ok(ApiResponse::success(
        "Ok",
        views,
        Some(Meta::new(page, limit, total)),
    ))
}

/// Re-run an operation on transient storage failures (deadlock, dropped
/// connection). Exponential backoff from 50 ms, capped by config; after the
/// last attempt the caller sees `StorageUnavailable`.
async fn with_storage_retry<T, F, Fut>(settings: &BookingSettings, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match op().await {
            Err(err) if err.is_transient() => {
                if attempt >= settings.storage_retry_max {
                    tracing::error!(attempt, error = %err, "storage retries exhausted");
                    return Err(AppError::StorageUnavailable);
                }
                let backoff = Duration::from_millis(
                    (50u64 << (attempt - 1)).min(settings.storage_retry_cap_ms),
                );
                tracing::warn!(attempt, error = %err, backoff_ms = backoff.as_millis() as u64, "transient storage error, retrying");
                tokio::time::sleep(backoff).await;
            }
            other => return other,
        }
    }
}
