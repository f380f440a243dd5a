//! Availability engine: working hours minus holidays minus existing locks,
//! sampled on a fixed cadence. The result is an advisory snapshot; creation
//! re-validates against the lock table, so an `available` answer may still
//! lose a race, but an `unavailable` answer never succeeds.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::catalog::WorkingWindow;
use crate::domain::time::{DurationMin, TimeSlot};
use crate::dto::availability::{AvailabilityView, SlotView};
use crate::error::AppResult;
use crate::repo::lock_repo;
use crate::state::AppState;

pub async fn compute_slots(
    state: &AppState,
    merchant_id: Uuid,
    staff_id: i32,
    date: NaiveDate,
    service_id: Uuid,
) -> AppResult<AvailabilityView> {
    let tz = state.catalog.merchant_tz(merchant_id).await?;
    let as_of = Utc::now();

    let empty = AvailabilityView {
        date,
        as_of,
        slots: Vec::new(),
    };

    if state.catalog.is_holiday(merchant_id, date).await? {
        return Ok(empty);
    }

    let staff = state.catalog.staff_member(merchant_id, staff_id).await?;
    if !staff.is_active {
        return Ok(empty);
    }

    let service = state
        .catalog
        .service_with_options(merchant_id, service_id)
        .await?;
    let duration = service.base_duration;
    let cadence = DurationMin::new(state.settings.slot_cadence_minutes)?;

    let weekday = i16::try_from(date.weekday().num_days_from_sunday()).unwrap_or(0);
    let windows = state.catalog.working_windows(staff_id, weekday).await?;
    if windows.is_empty() {
        return Ok(empty);
    }

    let mut slots: Vec<SlotView> = Vec::new();
    for window in &windows {
        let Some(window_utc) = resolve_window(date, window, tz) else {
            continue;
        };

        let locks = lock_repo::find_overlapping(&state.pool, merchant_id, staff_id, window_utc)
            .await?
            .into_iter()
            .map(|row| (row.slot(), row.booking_id))
            .collect::<Vec<_>>();

        for start in enumerate_candidates(window_utc, duration, cadence) {
            let candidate = TimeSlot::from_duration(start, duration)?;
            let hit = locks.iter().find(|(slot, _)| slot.overlaps(&candidate));
            slots.push(SlotView {
                start_local: start.with_timezone(&tz).fixed_offset(),
                available: hit.is_none(),
                booked_by: hit.and_then(|(_, booking_id)| *booking_id),
            });
        }
    }

    slots.sort_by_key(|s| s.start_local.with_timezone(&Utc));
    Ok(AvailabilityView {
        date,
        as_of,
        slots,
    })
}

/// Anchor a weekday window on a concrete date in the merchant zone and
/// convert to UTC. `end <= start` marks an overnight window ending the next
/// day. Returns `None` for local times a DST gap makes unrepresentable.
fn resolve_window(date: NaiveDate, window: &WorkingWindow, tz: Tz) -> Option<TimeSlot> {
    let start_naive = date.and_time(window.start);
    let end_naive: NaiveDateTime = if window.end <= window.start {
        date.checked_add_days(Days::new(1))?.and_time(window.end)
    } else {
        date.and_time(window.end)
    };

    let start = tz.from_local_datetime(&start_naive).earliest()?;
    let end = tz.from_local_datetime(&end_naive).earliest()?;
    TimeSlot::new(start.with_timezone(&Utc), end.with_timezone(&Utc)).ok()
}

/// Candidate start times on the cadence grid, aligned to the window start.
/// A candidate is kept only if the whole service fits before window end.
fn enumerate_candidates(
    window: TimeSlot,
    duration: DurationMin,
    cadence: DurationMin,
) -> Vec<DateTime<Utc>> {
    let mut candidates = Vec::new();
    let step = cadence.to_chrono();
    let needed = duration.to_chrono();
    let mut t = window.start();
    while t + needed <= window.end() {
        candidates.push(t);
        t += step;
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};
    use chrono_tz::Asia::Taipei;

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 20, h, m, 0).unwrap()
    }

    #[test]
    fn candidates_respect_cadence_and_tail() {
        // 09:00-12:00 window, 60 min service, 30 min cadence: last viable
        // start is 11:00.
        let window = TimeSlot::new(utc(9, 0), utc(12, 0)).unwrap();
        let starts = enumerate_candidates(
            window,
            DurationMin::new(60).unwrap(),
            DurationMin::new(30).unwrap(),
        );
        assert_eq!(
            starts,
            vec![utc(9, 0), utc(9, 30), utc(10, 0), utc(10, 30), utc(11, 0)]
        );
    }

    #[test]
    fn service_longer_than_window_yields_nothing() {
        let window = TimeSlot::new(utc(9, 0), utc(10, 0)).unwrap();
        let starts = enumerate_candidates(
            window,
            DurationMin::new(90).unwrap(),
            DurationMin::new(30).unwrap(),
        );
        assert!(starts.is_empty());
    }

    #[test]
    fn window_resolves_in_merchant_zone() {
        let window = WorkingWindow {
            weekday: 1,
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        };
        let date = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
        let slot = resolve_window(date, &window, Taipei).unwrap();
        // Asia/Taipei is UTC+8 year-round.
        assert_eq!(slot.start(), utc(1, 0));
        assert_eq!(slot.end(), utc(10, 0));
    }

    #[test]
    fn overnight_window_spills_into_next_day() {
        let window = WorkingWindow {
            weekday: 1,
            start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(2, 0, 0).unwrap(),
        };
        let date = NaiveDate::from_ymd_opt(2025, 10, 20).unwrap();
        let slot = resolve_window(date, &window, Taipei).unwrap();
        assert_eq!(slot.start(), utc(14, 0));
        assert_eq!(
            slot.end(),
            Utc.with_ymd_and_hms(2025, 10, 20, 18, 0, 0).unwrap()
        );
    }

    #[test]
    fn candidate_adjacent_to_lock_stays_available() {
        let lock = TimeSlot::new(utc(10, 0), utc(11, 0)).unwrap();
        let adjacent = TimeSlot::new(utc(11, 0), utc(12, 0)).unwrap();
        assert!(!lock.overlaps(&adjacent));
    }
}
