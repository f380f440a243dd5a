//! Admission-path integration tests. They need a real Postgres because the
//! non-overlap guarantee lives in the exclusion constraint; without a
//! configured database every test skips.
//!
//! Each test seeds its own merchant, so tests stay independent without
//! truncating shared tables.

use std::sync::{Arc, Mutex};

use chrono::NaiveTime;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::ActiveModelTrait;
use uuid::Uuid;

use salon_booking_api::{
    bus::EventBus,
    catalog::CatalogReader,
    config::BookingSettings,
    db::{create_orm_conn, create_pool, run_migrations},
    domain::events::DomainEvent,
    dto::bookings::{
        BookingItemRequest, CancelBookingRequest, CreateBookingRequest, CustomerPayload,
        RescheduleBookingRequest,
    },
    entity::{
        holidays::ActiveModel as HolidayActive, merchants::ActiveModel as MerchantActive,
        service_options::ActiveModel as OptionActive, services::ActiveModel as ServiceActive,
        staff::ActiveModel as StaffActive, staff_skills::ActiveModel as SkillActive,
        working_hours::ActiveModel as HoursActive,
    },
    error::AppError,
    middleware::auth::AuthContext,
    services::booking_service,
    state::AppState,
    subscription::{MonthlyQuotaGate, UnmeteredGate},
};

fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

type Recorded = Arc<Mutex<Vec<DomainEvent>>>;

async fn setup_state(database_url: &str) -> anyhow::Result<(AppState, Recorded)> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    let bus = EventBus::new();
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = recorded.clone();
    bus.subscribe_all(move |event| {
        sink.lock().unwrap().push(event.clone());
        Ok(())
    });

    let state = AppState {
        pool,
        catalog: CatalogReader::new(orm.clone()),
        orm,
        gate: Arc::new(UnmeteredGate),
        bus,
        settings: BookingSettings::default(),
    };
    Ok((state, recorded))
}

struct Seeded {
    merchant_id: Uuid,
    staff_id: i32,
    gel_id: Uuid,
    art_option_id: Uuid,
}

/// One merchant in Asia/Taipei with one staff member working Mondays
/// 09:00-18:00 local and a 60-minute TWD 800 gel service (with a 30-minute
/// TWD 200 nail-art option).
async fn seed_catalog(state: &AppState) -> anyhow::Result<Seeded> {
    let merchant_id = Uuid::new_v4();
    MerchantActive {
        id: Set(merchant_id),
        name: Set("Test Nail Studio".into()),
        timezone: Set("Asia/Taipei".into()),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let gel_id = Uuid::new_v4();
    ServiceActive {
        id: Set(gel_id),
        merchant_id: Set(merchant_id),
        name: Set("Gel manicure".into()),
        base_price: Set(Decimal::from(800)),
        currency: Set("TWD".into()),
        base_duration_minutes: Set(60),
        allow_stack: Set(false),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let art_option_id = Uuid::new_v4();
    OptionActive {
        id: Set(art_option_id),
        service_id: Set(gel_id),
        name: Set("Nail art".into()),
        add_price: Set(Decimal::from(200)),
        add_duration_minutes: Set(30),
        is_active: Set(true),
    }
    .insert(&state.orm)
    .await?;

    let staff = StaffActive {
        id: NotSet,
        merchant_id: Set(merchant_id),
        name: Set("Mei".into()),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    SkillActive {
        staff_id: Set(staff.id),
        service_id: Set(gel_id),
    }
    .insert(&state.orm)
    .await?;

    // Monday = 1 (days from Sunday).
    HoursActive {
        id: Set(Uuid::new_v4()),
        staff_id: Set(staff.id),
        weekday: Set(1),
        start_time: Set(NaiveTime::from_hms_opt(9, 0, 0).unwrap()),
        end_time: Set(NaiveTime::from_hms_opt(18, 0, 0).unwrap()),
    }
    .insert(&state.orm)
    .await?;

    Ok(Seeded {
        merchant_id,
        staff_id: staff.id,
        gel_id,
        art_option_id,
    })
}

fn merchant_ctx(merchant_id: Uuid) -> AuthContext {
    AuthContext {
        user_id: Uuid::new_v4(),
        merchant_id,
        role: "merchant".into(),
    }
}

fn gel_request(seed: &Seeded, start_at: &str, customer_name: &str) -> CreateBookingRequest {
    CreateBookingRequest {
        staff_id: seed.staff_id,
        start_at: start_at.into(),
        items: vec![BookingItemRequest {
            service_id: seed.gel_id,
            option_ids: vec![],
        }],
        customer: CustomerPayload {
            line_user_id: None,
            name: customer_name.into(),
            phone: Some("0912345678".into()),
            email: None,
        },
        notes: None,
        hold: false,
    }
}

async fn lock_count(state: &AppState, merchant_id: Uuid, staff_id: i32) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT count(*) FROM booking_locks WHERE merchant_id = $1 AND staff_id = $2",
    )
    .bind(merchant_id)
    .bind(staff_id)
    .fetch_one(&state.pool)
    .await?;
    Ok(count)
}

// 2025-10-20 is a Monday.
const MONDAY_10_LOCAL: &str = "2025-10-20T10:00:00+08:00";

#[tokio::test]
async fn create_rejects_overlap_but_allows_adjacency() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
        return Ok(());
    };
    let (state, recorded) = setup_state(&url).await?;
    let seed = seed_catalog(&state).await?;
    let ctx = merchant_ctx(seed.merchant_id);

    // S1: successful creation with an option.
    let mut req = gel_request(&seed, MONDAY_10_LOCAL, "Mei-ling");
    req.items[0].option_ids = vec![seed.art_option_id];
    let created = booking_service::create_booking(&state, &ctx, seed.merchant_id, req).await?;
    let view = created.data.unwrap();
    assert_eq!(view.status, "confirmed");
    assert_eq!(view.total_duration_minutes, 90);
    assert_eq!(view.total_price.amount, Decimal::from(1000));
    assert_eq!(view.total_price.currency, "TWD");
    // 10:00+08:00 plus 90 minutes.
    assert_eq!(view.end_at.to_rfc3339(), "2025-10-20T03:30:00+00:00");
    assert_eq!(lock_count(&state, seed.merchant_id, seed.staff_id).await?, 1);

    {
        let events = recorded.lock().unwrap();
        let types: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["BookingRequested", "BookingConfirmed"]);
        assert!(events.iter().all(|e| e.aggregate_id == view.id.to_string()));
    }

    // S2: overlapping request loses, leaves no trace.
    let overlap = booking_service::create_booking(
        &state,
        &ctx,
        seed.merchant_id,
        gel_request(&seed, "2025-10-20T10:30:00+08:00", "Hana"),
    )
    .await;
    assert!(matches!(overlap, Err(AppError::BookingOverlap { .. })));
    assert_eq!(lock_count(&state, seed.merchant_id, seed.staff_id).await?, 1);
    assert_eq!(recorded.lock().unwrap().len(), 2);

    // S3: the slot starting exactly at the previous end is free.
    let adjacent = booking_service::create_booking(
        &state,
        &ctx,
        seed.merchant_id,
        gel_request(&seed, "2025-10-20T11:30:00+08:00", "Hana"),
    )
    .await?;
    assert!(adjacent.data.is_some());
    assert_eq!(lock_count(&state, seed.merchant_id, seed.staff_id).await?, 2);

    Ok(())
}

#[tokio::test]
async fn holiday_blocks_creation() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
        return Ok(());
    };
    let (state, _) = setup_state(&url).await?;
    let seed = seed_catalog(&state).await?;
    let ctx = merchant_ctx(seed.merchant_id);

    HolidayActive {
        id: Set(Uuid::new_v4()),
        merchant_id: Set(seed.merchant_id),
        holiday_date: Set(chrono::NaiveDate::from_ymd_opt(2025, 10, 20).unwrap()),
        is_recurring: Set(false),
    }
    .insert(&state.orm)
    .await?;

    let result = booking_service::create_booking(
        &state,
        &ctx,
        seed.merchant_id,
        gel_request(&seed, MONDAY_10_LOCAL, "Mei-ling"),
    )
    .await;
    assert!(matches!(result, Err(AppError::ClosedForHoliday(_))));
    assert_eq!(lock_count(&state, seed.merchant_id, seed.staff_id).await?, 0);

    Ok(())
}

#[tokio::test]
async fn concurrent_creates_have_one_winner() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
        return Ok(());
    };
    let (state, _) = setup_state(&url).await?;
    let seed = seed_catalog(&state).await?;

    let mut handles = Vec::new();
    for i in 0..16 {
        let state = state.clone();
        let ctx = merchant_ctx(seed.merchant_id);
        let req = gel_request(&seed, MONDAY_10_LOCAL, &format!("client-{i}"));
        let merchant_id = seed.merchant_id;
        handles.push(tokio::spawn(async move {
            booking_service::create_booking(&state, &ctx, merchant_id, req).await
        }));
    }

    let mut winners = 0;
    let mut overlaps = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => winners += 1,
            Err(AppError::BookingOverlap { .. }) => overlaps += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(winners, 1);
    assert_eq!(overlaps, 15);
    assert_eq!(lock_count(&state, seed.merchant_id, seed.staff_id).await?, 1);

    Ok(())
}

#[tokio::test]
async fn cancel_frees_the_window_for_rebooking() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
        return Ok(());
    };
    let (state, recorded) = setup_state(&url).await?;
    let seed = seed_catalog(&state).await?;
    let ctx = merchant_ctx(seed.merchant_id);

    let created = booking_service::create_booking(
        &state,
        &ctx,
        seed.merchant_id,
        gel_request(&seed, MONDAY_10_LOCAL, "Mei-ling"),
    )
    .await?;
    let booking_id = created.data.unwrap().id;

    booking_service::cancel_booking(
        &state,
        &ctx,
        seed.merchant_id,
        booking_id,
        CancelBookingRequest {
            reason: Some("client asked to".into()),
        },
    )
    .await?;
    assert_eq!(lock_count(&state, seed.merchant_id, seed.staff_id).await?, 0);
    assert_eq!(
        recorded.lock().unwrap().last().unwrap().event_type,
        "BookingCancelled"
    );

    // Cancelling again is an illegal transition.
    let again = booking_service::cancel_booking(
        &state,
        &ctx,
        seed.merchant_id,
        booking_id,
        CancelBookingRequest { reason: None },
    )
    .await;
    assert!(matches!(again, Err(AppError::IllegalTransition { .. })));

    // The window is free again.
    let rebooked = booking_service::create_booking(
        &state,
        &ctx,
        seed.merchant_id,
        gel_request(&seed, MONDAY_10_LOCAL, "Hana"),
    )
    .await?;
    assert!(rebooked.data.is_some());

    Ok(())
}

#[tokio::test]
async fn reschedule_replaces_the_lock_atomically() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
        return Ok(());
    };
    let (state, recorded) = setup_state(&url).await?;
    let seed = seed_catalog(&state).await?;
    let ctx = merchant_ctx(seed.merchant_id);

    let created = booking_service::create_booking(
        &state,
        &ctx,
        seed.merchant_id,
        gel_request(&seed, MONDAY_10_LOCAL, "Mei-ling"),
    )
    .await?;
    let booking_id = created.data.unwrap().id;

    // Shifting onto a range overlapping the old one must work: the old lock
    // goes away in the same transaction.
    let moved = booking_service::reschedule_booking(
        &state,
        &ctx,
        seed.merchant_id,
        booking_id,
        RescheduleBookingRequest {
            new_start_at: "2025-10-20T10:30:00+08:00".into(),
        },
    )
    .await?;
    let view = moved.data.unwrap();
    assert_eq!(view.start_at.to_rfc3339(), "2025-10-20T02:30:00+00:00");
    assert_eq!(lock_count(&state, seed.merchant_id, seed.staff_id).await?, 1);
    assert_eq!(
        recorded.lock().unwrap().last().unwrap().event_type,
        "BookingRescheduled"
    );

    // The old 10:00 start now collides with [10:30, 11:30).
    let collision = booking_service::create_booking(
        &state,
        &ctx,
        seed.merchant_id,
        gel_request(&seed, MONDAY_10_LOCAL, "Hana"),
    )
    .await;
    assert!(matches!(collision, Err(AppError::BookingOverlap { .. })));

    // Completion finishes the lifecycle.
    booking_service::complete_booking(&state, &ctx, seed.merchant_id, booking_id).await?;
    let terminal = booking_service::reschedule_booking(
        &state,
        &ctx,
        seed.merchant_id,
        booking_id,
        RescheduleBookingRequest {
            new_start_at: "2025-10-20T15:00:00+08:00".into(),
        },
    )
    .await;
    assert!(matches!(terminal, Err(AppError::IllegalTransition { .. })));

    Ok(())
}

#[tokio::test]
async fn tenant_boundary_and_isolation() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
        return Ok(());
    };
    let (state, _) = setup_state(&url).await?;
    let seed_a = seed_catalog(&state).await?;
    let seed_b = seed_catalog(&state).await?;
    let ctx_a = merchant_ctx(seed_a.merchant_id);
    let ctx_b = merchant_ctx(seed_b.merchant_id);

    // Acting for a foreign merchant fails before any validation.
    let crossed = booking_service::create_booking(
        &state,
        &ctx_a,
        seed_b.merchant_id,
        gel_request(&seed_b, MONDAY_10_LOCAL, "Mallory"),
    )
    .await;
    assert!(matches!(crossed, Err(AppError::TenantBoundary)));

    let created = booking_service::create_booking(
        &state,
        &ctx_a,
        seed_a.merchant_id,
        gel_request(&seed_a, MONDAY_10_LOCAL, "Mei-ling"),
    )
    .await?;
    let booking_id = created.data.unwrap().id;

    // Merchant B never sees merchant A's booking.
    let foreign =
        booking_service::get_booking(&state, &ctx_b, seed_b.merchant_id, booking_id).await;
    assert!(matches!(foreign, Err(AppError::BookingNotFound)));

    let listed = booking_service::list_bookings(
        &state,
        &ctx_b,
        seed_b.merchant_id,
        salon_booking_api::routes::params::BookingListQuery {
            pagination: salon_booking_api::routes::params::Pagination {
                page: None,
                per_page: None,
            },
            staff_id: None,
            from: None,
            to: None,
        },
    )
    .await?;
    assert!(listed.data.unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn quota_gate_denies_over_limit() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
        return Ok(());
    };
    let (mut state, _) = setup_state(&url).await?;
    state.gate = Arc::new(MonthlyQuotaGate { limit: 1 });
    let seed = seed_catalog(&state).await?;
    let ctx = merchant_ctx(seed.merchant_id);

    booking_service::create_booking(
        &state,
        &ctx,
        seed.merchant_id,
        gel_request(&seed, MONDAY_10_LOCAL, "Mei-ling"),
    )
    .await?;

    let second = booking_service::create_booking(
        &state,
        &ctx,
        seed.merchant_id,
        gel_request(&seed, "2025-10-20T14:00:00+08:00", "Hana"),
    )
    .await;
    assert!(matches!(
        second,
        Err(AppError::QuotaExceeded { limit: 1 })
    ));

    Ok(())
}

#[tokio::test]
async fn unknown_staff_and_unskilled_staff_rejected() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
        return Ok(());
    };
    let (state, _) = setup_state(&url).await?;
    let seed = seed_catalog(&state).await?;
    let ctx = merchant_ctx(seed.merchant_id);

    let mut req = gel_request(&seed, MONDAY_10_LOCAL, "Mei-ling");
    req.staff_id = 999_999;
    let missing = booking_service::create_booking(&state, &ctx, seed.merchant_id, req).await;
    assert!(matches!(missing, Err(AppError::StaffNotFound(_))));

    // A second service the staff member has no skill for.
    let pedicure_id = Uuid::new_v4();
    ServiceActive {
        id: Set(pedicure_id),
        merchant_id: Set(seed.merchant_id),
        name: Set("Pedicure".into()),
        base_price: Set(Decimal::from(900)),
        currency: Set("TWD".into()),
        base_duration_minutes: Set(60),
        allow_stack: Set(false),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let mut req = gel_request(&seed, MONDAY_10_LOCAL, "Mei-ling");
    req.items[0].service_id = pedicure_id;
    let unskilled = booking_service::create_booking(&state, &ctx, seed.merchant_id, req).await;
    assert!(matches!(
        unskilled,
        Err(AppError::StaffCannotPerform { .. })
    ));

    Ok(())
}

#[tokio::test]
async fn naive_start_time_rejected() -> anyhow::Result<()> {
    let Some(url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run flow tests.");
        return Ok(());
    };
    let (state, _) = setup_state(&url).await?;
    let seed = seed_catalog(&state).await?;
    let ctx = merchant_ctx(seed.merchant_id);

    let result = booking_service::create_booking(
        &state,
        &ctx,
        seed.merchant_id,
        gel_request(&seed, "2025-10-20T10:00:00", "Mei-ling"),
    )
    .await;
    assert!(matches!(result, Err(AppError::NaiveTime)));

    Ok(())
}
