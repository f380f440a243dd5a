use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::bookings::{CancelBookingRequest, CreateBookingRequest, RescheduleBookingRequest},
    error::AppResult,
    middleware::auth::AuthContext,
    models::BookingView,
    response::ApiResponse,
    routes::params::BookingListQuery,
    services::booking_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking))
        .route("/", get(list_bookings))
        .route("/{id}", get(get_booking))
        .route("/{id}/cancel", post(cancel_booking))
        .route("/{id}/complete", post(complete_booking))
        .route("/{id}/reschedule", post(reschedule_booking))
}

#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created", body = ApiResponse<BookingView>),
        (status = 400, description = "Validation failure"),
        (status = 403, description = "Tenant boundary violation"),
        (status = 404, description = "Unknown staff or service"),
        (status = 409, description = "Overlap, holiday, quota or subscription conflict"),
    ),
    tag = "Bookings"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(payload): Json<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<BookingView>>)> {
    let resp = booking_service::create_booking(&state, &ctx, ctx.merchant_id, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/bookings",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("staff_id" = Option<i32>, Query, description = "Filter by staff"),
        ("from" = Option<String>, Query, description = "RFC-3339 lower bound"),
        ("to" = Option<String>, Query, description = "RFC-3339 upper bound"),
    ),
    responses(
        (status = 200, description = "List bookings", body = ApiResponse<Vec<BookingView>>)
    ),
    tag = "Bookings"
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<BookingListQuery>,
) -> AppResult<Json<ApiResponse<Vec<BookingView>>>> {
    let resp = booking_service::list_bookings(&state, &ctx, ctx.merchant_id, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    responses(
        (status = 200, description = "Booking detail", body = ApiResponse<BookingView>),
        (status = 404, description = "Not found"),
    ),
    tag = "Bookings"
)]
pub async fn get_booking(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<BookingView>>> {
    let resp = booking_service::get_booking(&state, &ctx, ctx.merchant_id, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/cancel",
    request_body = CancelBookingRequest,
    responses(
        (status = 204, description = "Booking cancelled"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already terminal"),
    ),
    tag = "Bookings"
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelBookingRequest>,
) -> AppResult<StatusCode> {
    booking_service::cancel_booking(&state, &ctx, ctx.merchant_id, id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/complete",
    responses(
        (status = 204, description = "Booking completed"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Illegal transition"),
    ),
    tag = "Bookings"
)]
pub async fn complete_booking(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    booking_service::complete_booking(&state, &ctx, ctx.merchant_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/reschedule",
    request_body = RescheduleBookingRequest,
    responses(
        (status = 200, description = "Booking rescheduled", body = ApiResponse<BookingView>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Overlap or illegal transition"),
    ),
    tag = "Bookings"
)]
pub async fn reschedule_booking(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<RescheduleBookingRequest>,
) -> AppResult<Json<ApiResponse<BookingView>>> {
    let resp =
        booking_service::reschedule_booking(&state, &ctx, ctx.merchant_id, id, payload).await?;
    Ok(Json(resp))
}
