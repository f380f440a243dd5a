//! Seed a demo merchant with one staff member, a small catalog and regular
//! working hours. Intended for local development only.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{ActiveModelTrait, EntityTrait};
use uuid::Uuid;

use salon_booking_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        merchants::ActiveModel as MerchantActive,
        service_options::ActiveModel as OptionActive,
        services::ActiveModel as ServiceActive,
        staff::ActiveModel as StaffActive,
        staff_skills::ActiveModel as SkillActive,
        working_hours::ActiveModel as HoursActive,
        Staff,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let merchant_id = Uuid::new_v4();
    MerchantActive {
        id: Set(merchant_id),
        name: Set("Demo Nail Studio".into()),
        timezone: Set("Asia/Taipei".into()),
        created_at: NotSet,
    }
    .insert(&orm)
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
    .insert(&orm)
    .await?;

    OptionActive {
        id: Set(Uuid::new_v4()),
        service_id: Set(gel_id),
        name: Set("Nail art".into()),
        add_price: Set(Decimal::from(200)),
        add_duration_minutes: Set(30),
        is_active: Set(true),
    }
    .insert(&orm)
    .await?;

    let removal_id = Uuid::new_v4();
    ServiceActive {
        id: Set(removal_id),
        merchant_id: Set(merchant_id),
        name: Set("Gel removal".into()),
        base_price: Set(Decimal::from(300)),
        currency: Set("TWD".into()),
        base_duration_minutes: Set(30),
        allow_stack: Set(true),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&orm)
    .await?;

    let staff = StaffActive {
        id: NotSet,
        merchant_id: Set(merchant_id),
        name: Set("Mei".into()),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&orm)
    .await?;

    for service_id in [gel_id, removal_id] {
        SkillActive {
            staff_id: Set(staff.id),
            service_id: Set(service_id),
        }
        .insert(&orm)
        .await?;
    }

    // Tuesday through Sunday, 10:00-19:00 local.
    for weekday in [0i16, 2, 3, 4, 5, 6] {
        HoursActive {
            id: Set(Uuid::new_v4()),
            staff_id: Set(staff.id),
            weekday: Set(weekday),
            start_time: Set(NaiveTime::from_hms_opt(10, 0, 0).expect("valid time")),
            end_time: Set(NaiveTime::from_hms_opt(19, 0, 0).expect("valid time")),
        }
        .insert(&orm)
        .await?;
    }

    let staff_total = Staff::find().all(&orm).await?.len();
    println!("Seeded merchant {merchant_id} (staff rows now: {staff_total})");
    Ok(())
}
