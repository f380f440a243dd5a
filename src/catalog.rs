use std::collections::HashSet;

use chrono::{Datelike, NaiveDate, NaiveTime};
use chrono_tz::Tz;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

use crate::db::OrmConn;
use crate::domain::money::Money;
use crate::domain::time::DurationMin;
use crate::entity::{
    holidays::{Column as HolidayCol, Entity as Holidays},
    merchants::Entity as Merchants,
    service_options::{Column as OptionCol, Entity as ServiceOptions},
    services::{Column as ServiceCol, Entity as Services},
    staff::{Column as StaffCol, Entity as Staff},
    staff_skills::{Column as SkillCol, Entity as StaffSkills},
    working_hours::{Column as HoursCol, Entity as WorkingHours},
};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct ServiceProjection {
    pub id: Uuid,
    pub merchant_id: Uuid,
    pub name: String,
    pub base_price: Money,
    pub base_duration: DurationMin,
    pub allow_stack: bool,
    pub is_active: bool,
    pub options: Vec<OptionProjection>,
}

#[derive(Debug, Clone)]
pub struct OptionProjection {
    pub id: Uuid,
    pub name: String,
    pub add_price: Money,
    pub add_duration: DurationMin,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct StaffProjection {
    pub id: i32,
    pub merchant_id: Uuid,
    pub name: String,
    pub is_active: bool,
    pub skills: HashSet<Uuid>,
}

/// A working window on a weekday (0 = Sunday). `end <= start` means the
/// window runs past midnight.
#[derive(Debug, Clone, Copy)]
pub struct WorkingWindow {
    pub weekday: i16,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Read-only view of the catalog context: services, staff, working hours,
/// holidays and the merchant time zone. The booking core never writes any
/// of these.
#[derive(Clone)]
pub struct CatalogReader {
    orm: OrmConn,
}

impl CatalogReader {
    pub fn new(orm: OrmConn) -> Self {
        Self { orm }
    }

    pub async fn merchant_tz(&self, merchant_id: Uuid) -> AppResult<Tz> {
        let merchant = Merchants::find_by_id(merchant_id)
            .one(&self.orm)
            .await?
            .ok_or(AppError::MerchantNotFound(merchant_id))?;
        merchant.timezone.parse::<Tz>().map_err(|_| {
            AppError::Internal(anyhow::anyhow!(
                "merchant {merchant_id} has invalid timezone {:?}",
                merchant.timezone
            ))
        })
    }

    pub async fn service_with_options(
        &self,
        merchant_id: Uuid,
        service_id: Uuid,
    ) -> AppResult<ServiceProjection> {
        let service = Services::find()
            .filter(
                Condition::all()
                    .add(ServiceCol::MerchantId.eq(merchant_id))
                    .add(ServiceCol::Id.eq(service_id)),
            )
            .one(&self.orm)
            .await?
            .ok_or(AppError::ServiceNotFound(service_id))?;

        let option_rows = ServiceOptions::find()
            .filter(OptionCol::ServiceId.eq(service.id))
            .order_by_asc(OptionCol::Name)
            .all(&self.orm)
            .await?;

        let mut options = Vec::with_capacity(option_rows.len());
        for row in option_rows {
            options.push(OptionProjection {
                id: row.id,
                name: row.name,
                add_price: Money::new(row.add_price, service.currency.clone())?,
                add_duration: DurationMin::new(i64::from(row.add_duration_minutes))?,
                is_active: row.is_active,
            });
        }

        Ok(ServiceProjection {
            id: service.id,
            merchant_id: service.merchant_id,
            name: service.name,
            base_price: Money::new(service.base_price, service.currency.clone())?,
            base_duration: DurationMin::new(i64::from(service.base_duration_minutes))?,
            allow_stack: service.allow_stack,
            is_active: service.is_active,
            options,
        })
    }

    pub async fn staff_member(
        &self,
        merchant_id: Uuid,
        staff_id: i32,
    ) -> AppResult<StaffProjection> {
        let staff = Staff::find()
            .filter(
                Condition::all()
                    .add(StaffCol::MerchantId.eq(merchant_id))
                    .add(StaffCol::Id.eq(staff_id)),
            )
            .one(&self.orm)
            .await?
            .ok_or(AppError::StaffNotFound(staff_id))?;

        let skills: HashSet<Uuid> = StaffSkills::find()
            .filter(SkillCol::StaffId.eq(staff.id))
            .all(&self.orm)
            .await?
            .into_iter()
            .map(|row| row.service_id)
            .collect();

        Ok(StaffProjection {
            id: staff.id,
            merchant_id: staff.merchant_id,
            name: staff.name,
            is_active: staff.is_active,
            skills,
        })
    }

    pub async fn working_windows(
        &self,
        staff_id: i32,
        weekday: i16,
    ) -> AppResult<Vec<WorkingWindow>> {
        let rows = WorkingHours::find()
            .filter(
                Condition::all()
                    .add(HoursCol::StaffId.eq(staff_id))
                    .add(HoursCol::Weekday.eq(weekday)),
            )
            .order_by_asc(HoursCol::StartTime)
            .all(&self.orm)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| WorkingWindow {
                weekday: row.weekday,
                start: row.start_time,
                end: row.end_time,
            })
            .collect())
    }

    /// Recurring holidays match by (month, day), one-off holidays by exact
    /// date.
    pub async fn is_holiday(&self, merchant_id: Uuid, date: NaiveDate) -> AppResult<bool> {
        let candidates = Holidays::find()
            .filter(
                Condition::all()
                    .add(HolidayCol::MerchantId.eq(merchant_id))
                    .add(
                        Condition::any()
                            .add(HolidayCol::HolidayDate.eq(date))
                            .add(HolidayCol::IsRecurring.eq(true)),
                    ),
            )
            .all(&self.orm)
            .await?;

        Ok(candidates.iter().any(|h| {
            if h.is_recurring {
                h.holiday_date.month() == date.month() && h.holiday_date.day() == date.day()
            } else {
                h.holiday_date == date
            }
        }))
    }
}
