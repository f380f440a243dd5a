use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::booking::BookingStatus;

#[derive(Debug, Error)]
pub enum AppError {
    // Validation
    #[error("Timestamp must carry an explicit UTC offset")]
    NaiveTime,

    #[error("Duration must not be negative")]
    NegativeDuration,

    #[error("Cannot combine {left} with {right}")]
    CurrencyMismatch { left: String, right: String },

    #[error("Booking must contain at least one item")]
    EmptyItems,

    #[error("Time slot start must precede its end")]
    InvalidSlot,

    #[error("Bad Request: {0}")]
    BadRequest(String),

    // Authorization
    #[error("Caller may not act for this merchant")]
    TenantBoundary,

    #[error("Permission denied")]
    PermissionDenied,

    // Not found
    #[error("Booking not found")]
    BookingNotFound,

    #[error("Service {0} not found")]
    ServiceNotFound(Uuid),

    #[error("Staff {0} not found")]
    StaffNotFound(i32),

    #[error("Merchant {0} not found")]
    MerchantNotFound(Uuid),

    // Admission conflict; the client may retry with a different slot.
    #[error("Staff {staff_id} is already booked between {start} and {end}")]
    BookingOverlap {
        staff_id: i32,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    // Policy conflicts
    #[error("Booking cannot move from {from} to {to}")]
    IllegalTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("Subscription is past due")]
    SubscriptionPastDue,

    #[error("Monthly booking quota of {limit} reached")]
    QuotaExceeded { limit: u32 },

    #[error("Staff {staff_id} cannot perform service {service_id}")]
    StaffCannotPerform { staff_id: i32, service_id: Uuid },

    #[error("Service {0} is inactive")]
    ServiceInactive(Uuid),

    #[error("Staff {0} is inactive")]
    StaffInactive(i32),

    #[error("Merchant is closed on {0}")]
    ClosedForHoliday(NaiveDate),

    // Storage
    #[error("Storage unavailable, try again")]
    StorageUnavailable,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

/// Error envelope: `{error, message, details}`. Consumers key off `error`.
#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NaiveTime => "naive_time",
            AppError::NegativeDuration => "negative_duration",
            AppError::CurrencyMismatch { .. } => "currency_mismatch",
            AppError::EmptyItems => "empty_items",
            AppError::InvalidSlot => "invalid_slot",
            AppError::BadRequest(_) => "bad_request",
            AppError::TenantBoundary => "tenant_boundary_violation",
            AppError::PermissionDenied => "permission_denied",
            AppError::BookingNotFound => "booking_not_found",
            AppError::ServiceNotFound(_) => "service_not_found",
            AppError::StaffNotFound(_) => "staff_not_found",
            AppError::MerchantNotFound(_) => "merchant_not_found",
            AppError::BookingOverlap { .. } => "booking_overlap",
            AppError::IllegalTransition { .. } => "illegal_booking_transition",
            AppError::SubscriptionPastDue => "subscription_past_due",
            AppError::QuotaExceeded { .. } => "quota_exceeded",
            AppError::StaffCannotPerform { .. } => "staff_cannot_perform_service",
            AppError::ServiceInactive(_) => "service_inactive",
            AppError::StaffInactive(_) => "staff_inactive",
            AppError::ClosedForHoliday(_) => "closed_for_holiday",
            AppError::StorageUnavailable => "storage_unavailable",
            AppError::DbError(_) | AppError::OrmError(_) => "storage_error",
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NaiveTime
            | AppError::NegativeDuration
            | AppError::CurrencyMismatch { .. }
            | AppError::EmptyItems
            | AppError::InvalidSlot
            | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,

            AppError::TenantBoundary | AppError::PermissionDenied => StatusCode::FORBIDDEN,

            AppError::BookingNotFound
            | AppError::ServiceNotFound(_)
            | AppError::StaffNotFound(_)
            | AppError::MerchantNotFound(_) => StatusCode::NOT_FOUND,

            AppError::BookingOverlap { .. }
            | AppError::IllegalTransition { .. }
            | AppError::SubscriptionPastDue
            | AppError::QuotaExceeded { .. }
            | AppError::ClosedForHoliday(_) => StatusCode::CONFLICT,

            AppError::StaffCannotPerform { .. }
            | AppError::ServiceInactive(_)
            | AppError::StaffInactive(_) => StatusCode::UNPROCESSABLE_ENTITY,

            AppError::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,

            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            AppError::BookingOverlap {
                staff_id,
                start,
                end,
            } => Some(serde_json::json!({
                "staff_id": staff_id,
                "start": start,
                "end": end,
                "hint": "re-query availability and retry with a free slot",
            })),
            AppError::IllegalTransition { from, to } => Some(serde_json::json!({
                "from": from,
                "to": to,
            })),
            AppError::SubscriptionPastDue => {
                Some(serde_json::json!({ "reason": "past_due" }))
            }
            AppError::QuotaExceeded { limit } => {
                Some(serde_json::json!({ "reason": "quota_exceeded", "limit": limit }))
            }
            AppError::StaffCannotPerform {
                staff_id,
                service_id,
            } => Some(serde_json::json!({
                "staff_id": staff_id,
                "service_id": service_id,
            })),
            _ => None,
        }
    }

    /// True for failures worth an automatic retry by the orchestrator.
    pub fn is_transient(&self) -> bool {
        match self {
            AppError::DbError(err) => sqlx_transient(err),
            AppError::OrmError(err) => orm_transient(err),
            AppError::StorageUnavailable => true,
            _ => false,
        }
    }
}

fn sqlx_transient(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => {
            // 40001 serialization_failure, 40P01 deadlock_detected
            matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}

fn orm_transient(err: &sea_orm::DbErr) -> bool {
    use sea_orm::{DbErr, RuntimeErr};
    match err {
        DbErr::Conn(RuntimeErr::SqlxError(e))
        | DbErr::Exec(RuntimeErr::SqlxError(e))
        | DbErr::Query(RuntimeErr::SqlxError(e)) => sqlx_transient(e),
        _ => false,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        }
        let body = ErrorBody {
            error: self.code(),
            message: self.to_string(),
            details: self.details(),
        };
        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
