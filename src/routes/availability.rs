use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::availability::AvailabilityView,
    error::AppResult,
    middleware::auth::AuthContext,
    response::{ApiResponse, Meta},
    routes::params::AvailabilityQuery,
    services::availability_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(availability))
}

#[utoipa::path(
    get,
    path = "/api/availability",
    params(
        ("staff_id" = i32, Query, description = "Staff member"),
        ("date" = String, Query, description = "Date in the merchant zone, YYYY-MM-DD"),
        ("service_id" = String, Query, description = "Service whose duration to fit"),
    ),
    responses(
        (status = 200, description = "Candidate slots", body = ApiResponse<AvailabilityView>),
        (status = 404, description = "Unknown staff or service"),
    ),
    tag = "Availability"
)]
pub async fn availability(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<ApiResponse<AvailabilityView>>> {
    let view = availability_service::compute_slots(
        &state,
        ctx.merchant_id,
        query.staff_id,
        query.date,
        query.service_id,
    )
    .await?;
    Ok(Json(ApiResponse::success("Ok", view, Some(Meta::empty()))))
}
