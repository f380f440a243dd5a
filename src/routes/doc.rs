use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        availability::{AvailabilityView, SlotView},
        bookings::{
            BookingItemRequest, CancelBookingRequest, CreateBookingRequest, CustomerPayload,
            RescheduleBookingRequest,
        },
    },
    models::{BookingItemView, BookingView, CustomerView, MoneyView},
    response::{ApiResponse, Meta},
    routes::{availability, bookings, health, params},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        bookings::create_booking,
        bookings::list_bookings,
        bookings::get_booking,
        bookings::cancel_booking,
        bookings::complete_booking,
        bookings::reschedule_booking,
        availability::availability,
    ),
    components(
        schemas(
            BookingView,
            BookingItemView,
            CustomerView,
            MoneyView,
            CreateBookingRequest,
            BookingItemRequest,
            CustomerPayload,
            CancelBookingRequest,
            RescheduleBookingRequest,
            AvailabilityView,
            SlotView,
            params::Pagination,
            params::BookingListQuery,
            params::AvailabilityQuery,
            Meta,
            ApiResponse<BookingView>,
            ApiResponse<AvailabilityView>,
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Bookings", description = "Booking lifecycle endpoints"),
        (name = "Availability", description = "Free-slot queries"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
