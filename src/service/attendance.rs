use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::{debug, info};

use crate::error::{HrmError, HrmResult};
use crate::model::attendance::{
    AttendanceEntry, AttendanceRecord, AttendanceStatus, AttendanceSummary,
};
use crate::service::payroll::MonthWindow;
use crate::store::{AttendanceStore, EmployeeDirectory};

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// Elapsed hours between two timestamps, rounded half away from zero to two
/// decimal places. `check_out` must be strictly after `check_in`.
pub fn hours_between(check_in: NaiveDateTime, check_out: NaiveDateTime) -> HrmResult<Decimal> {
    if check_out <= check_in {
        return Err(HrmError::InvalidRange(
            "check_out must be after check_in".to_string(),
        ));
    }

    let millis = (check_out - check_in).num_milliseconds();
    let hours = Decimal::from(millis) / Decimal::from(MILLIS_PER_HOUR);
    Ok(hours.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
}

/// The record a check-in at `now` should leave behind. An existing row for
/// the day is reused unless it already has a check-in; a check-out left on it
/// by an HR entry is cleared so the day reopens.
pub fn record_check_in(
    existing: Option<&AttendanceRecord>,
    employee_id: u64,
    now: NaiveDateTime,
) -> HrmResult<AttendanceRecord> {
    match existing {
        Some(record) if record.is_checked_in() => Err(HrmError::AlreadyCheckedIn),
        Some(record) => Ok(AttendanceRecord {
            check_in: Some(now),
            check_out: None,
            hours_worked: None,
            status: AttendanceStatus::Present,
            ..record.clone()
        }),
        None => Ok(AttendanceRecord {
            id: 0,
            employee_id,
            date: now.date(),
            check_in: Some(now),
            check_out: None,
            hours_worked: None,
            status: AttendanceStatus::Present,
            notes: None,
        }),
    }
}

/// Closes a checked-in record at `at` and derives `hours_worked`.
pub fn record_check_out(record: &AttendanceRecord, at: NaiveDateTime) -> HrmResult<AttendanceRecord> {
    let check_in = record.check_in.ok_or(HrmError::NotCheckedIn)?;
    if record.is_checked_out() {
        return Err(HrmError::AlreadyCheckedOut);
    }

    let hours = hours_between(check_in, at)?;
    Ok(AttendanceRecord {
        check_out: Some(at),
        hours_worked: Some(hours),
        ..record.clone()
    })
}

/// Fills `hours_worked` on an administrative entry when both ends are known.
///
/// `check_in` must fall on the entry's day and `check_out` on that day or the
/// next, which keeps a shift under 48 hours.
pub fn with_derived_hours(mut entry: AttendanceEntry) -> HrmResult<AttendanceEntry> {
    if let Some(check_in) = entry.check_in {
        if check_in.date() != entry.date {
            return Err(HrmError::InvalidRange(format!(
                "check_in must fall on {}",
                entry.date
            )));
        }
    }
    if let Some(check_out) = entry.check_out {
        let day = check_out.date();
        if day != entry.date && Some(day) != entry.date.succ_opt() {
            return Err(HrmError::InvalidRange(format!(
                "check_out must fall on {} or the following day",
                entry.date
            )));
        }
    }

    entry.hours_worked = match (entry.check_in, entry.check_out) {
        (Some(check_in), Some(check_out)) => Some(hours_between(check_in, check_out)?),
        _ => None,
    };
    Ok(entry)
}

pub fn summarize(
    employee_id: u64,
    window: &MonthWindow,
    records: &[AttendanceRecord],
) -> AttendanceSummary {
    let mut summary = AttendanceSummary {
        employee_id,
        month: window.month,
        year: window.year,
        present: 0,
        absent: 0,
        late: 0,
        half_day: 0,
        total_hours: Decimal::ZERO,
    };

    for record in records.iter().filter(|r| window.contains_day(r.date)) {
        match record.status {
            AttendanceStatus::Present => summary.present += 1,
            AttendanceStatus::Absent => summary.absent += 1,
            AttendanceStatus::Late => summary.late += 1,
            AttendanceStatus::HalfDay => summary.half_day += 1,
        }
        summary.total_hours += record.hours_worked.unwrap_or_default();
    }

    summary
}

pub async fn check_in<S: AttendanceStore>(
    store: &S,
    employee_id: u64,
    now: NaiveDateTime,
) -> HrmResult<AttendanceRecord> {
    let day = now.date();
    let existing = store.find_for_day(employee_id, day).await?;
    let record = record_check_in(existing.as_ref(), employee_id, now)?;

    // Another request may have checked in between the read and this write.
    if !store.claim_check_in(&record).await? {
        return Err(HrmError::AlreadyCheckedIn);
    }

    info!(employee_id, %day, "Checked in");

    store
        .find_for_day(employee_id, day)
        .await?
        .ok_or(HrmError::NotCheckedIn)
}

pub async fn check_out<S: AttendanceStore>(
    store: &S,
    employee_id: u64,
    now: NaiveDateTime,
) -> HrmResult<AttendanceRecord> {
    let day = now.date();
    let record = store
        .find_for_day(employee_id, day)
        .await?
        .ok_or(HrmError::NotCheckedIn)?;

    let updated = record_check_out(&record, now)?;

    if !store.claim_check_out(&updated).await? {
        return Err(HrmError::AlreadyCheckedOut);
    }

    info!(employee_id, %day, hours = %updated.hours_worked.unwrap_or_default(), "Checked out");
    Ok(updated)
}

/// HR path: upsert whatever was entered for (employee, day). No
/// double-check-in restriction applies.
pub async fn record_entry<S>(store: &S, entry: AttendanceEntry) -> HrmResult<AttendanceRecord>
where
    S: AttendanceStore + EmployeeDirectory,
{
    let employee_id = entry.employee_id;
    if store.find_employee(employee_id).await?.is_none() {
        return Err(HrmError::EmployeeNotFound(employee_id));
    }

    let entry = with_derived_hours(entry)?;
    store.upsert_entry(&entry).await?;
    debug!(employee_id, date = %entry.date, status = %entry.status, "Attendance entry saved");

    store
        .find_for_day(employee_id, entry.date)
        .await?
        .ok_or(HrmError::not_found("Attendance", employee_id))
}

pub async fn list_attendance<S: AttendanceStore>(
    store: &S,
    employee_id: u64,
    from: NaiveDate,
    to: NaiveDate,
    status: Option<AttendanceStatus>,
) -> HrmResult<Vec<AttendanceRecord>> {
    if to < from {
        return Err(HrmError::InvalidRange(
            "to must not be before from".to_string(),
        ));
    }
    store.find_in_range(employee_id, from, to, status).await
}

pub async fn monthly_summary<S: AttendanceStore>(
    store: &S,
    employee_id: u64,
    month: u32,
    year: i32,
) -> HrmResult<AttendanceSummary> {
    let window = MonthWindow::new(month, year)?;
    let records = store
        .find_in_range(employee_id, window.first_day, window.last_day, None)
        .await?;
    Ok(summarize(employee_id, &window, &records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use std::str::FromStr;

    fn at(day: u32, h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, day)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn hours_are_rounded_to_two_places() {
        assert_eq!(hours_between(at(2, 9, 0, 0), at(2, 17, 0, 0)).unwrap(), dec("8.00"));
        assert_eq!(hours_between(at(2, 9, 0, 0), at(2, 17, 20, 0)).unwrap(), dec("8.33"));
        // 18 seconds is exactly 0.005 h and rounds up
        assert_eq!(hours_between(at(2, 9, 0, 0), at(2, 9, 0, 18)).unwrap(), dec("0.01"));
    }

    #[test]
    fn check_out_must_follow_check_in() {
        let same = hours_between(at(2, 9, 0, 0), at(2, 9, 0, 0));
        assert!(matches!(same, Err(HrmError::InvalidRange(_))));

        let earlier = hours_between(at(2, 9, 0, 0), at(2, 8, 0, 0));
        assert!(matches!(earlier, Err(HrmError::InvalidRange(_))));
    }

    #[test]
    fn check_in_reuses_a_row_without_check_in() {
        let absent = AttendanceRecord {
            id: 5,
            employee_id: 1,
            date: at(2, 0, 0, 0).date(),
            check_in: None,
            check_out: None,
            hours_worked: None,
            status: AttendanceStatus::Absent,
            notes: Some("sick note pending".into()),
        };

        let record = record_check_in(Some(&absent), 1, at(2, 9, 5, 0)).unwrap();

        assert_eq!(record.id, 5);
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.check_in, Some(at(2, 9, 5, 0)));
        assert_eq!(record.notes.as_deref(), Some("sick note pending"));
    }

    #[test]
    fn derived_hours_need_both_timestamps() {
        let entry = AttendanceEntry {
            employee_id: 1,
            date: at(2, 0, 0, 0).date(),
            check_in: Some(at(2, 9, 0, 0)),
            check_out: None,
            hours_worked: Some(dec("3")),
            status: AttendanceStatus::Late,
            notes: None,
        };
        assert_eq!(with_derived_hours(entry.clone()).unwrap().hours_worked, None);

        let closed = AttendanceEntry {
            check_out: Some(at(2, 13, 30, 0)),
            ..entry
        };
        assert_eq!(with_derived_hours(closed).unwrap().hours_worked, Some(dec("4.50")));
    }

    #[actix_web::test]
    async fn full_day_check_in_then_out() {
        let store = MemoryStore::with_employee(1, "Ayesha", "Karim", dec("5000"));

        let opened = check_in(&store, 1, at(2, 9, 0, 0)).await.unwrap();
        assert!(opened.id > 0);
        assert_eq!(opened.status, AttendanceStatus::Present);

        let closed = check_out(&store, 1, at(2, 17, 45, 0)).await.unwrap();
        assert_eq!(closed.hours_worked, Some(dec("8.75")));
        assert_eq!(store.attendance_rows(), 1);
    }

    #[actix_web::test]
    async fn second_check_in_same_day_fails() {
        let store = MemoryStore::with_employee(1, "Ayesha", "Karim", dec("5000"));
        check_in(&store, 1, at(2, 9, 0, 0)).await.unwrap();

        let again = check_in(&store, 1, at(2, 10, 0, 0)).await;

        assert!(matches!(again, Err(HrmError::AlreadyCheckedIn)));
    }

    #[actix_web::test]
    async fn check_out_without_check_in_fails() {
        let store = MemoryStore::with_employee(1, "Ayesha", "Karim", dec("5000"));

        let result = check_out(&store, 1, at(2, 17, 0, 0)).await;

        assert!(matches!(result, Err(HrmError::NotCheckedIn)));
    }

    #[actix_web::test]
    async fn check_out_on_absence_row_fails_as_not_checked_in() {
        let store = MemoryStore::with_employee(1, "Ayesha", "Karim", dec("5000"));
        record_entry(
            &store,
            AttendanceEntry {
                employee_id: 1,
                date: at(2, 0, 0, 0).date(),
                check_in: None,
                check_out: None,
                hours_worked: None,
                status: AttendanceStatus::Absent,
                notes: None,
            },
        )
        .await
        .unwrap();

        let result = check_out(&store, 1, at(2, 17, 0, 0)).await;

        assert!(matches!(result, Err(HrmError::NotCheckedIn)));
    }

    #[actix_web::test]
    async fn second_check_out_same_day_fails() {
        let store = MemoryStore::with_employee(1, "Ayesha", "Karim", dec("5000"));
        check_in(&store, 1, at(2, 9, 0, 0)).await.unwrap();
        check_out(&store, 1, at(2, 17, 0, 0)).await.unwrap();

        let again = check_out(&store, 1, at(2, 18, 0, 0)).await;

        assert!(matches!(again, Err(HrmError::AlreadyCheckedOut)));
        let kept = store.find_for_day(1, at(2, 0, 0, 0).date()).await.unwrap().unwrap();
        assert_eq!(kept.check_out, Some(at(2, 17, 0, 0)));
    }

    #[actix_web::test]
    async fn hr_entry_upserts_by_day() {
        let store = MemoryStore::with_employee(1, "Ayesha", "Karim", dec("5000"));
        check_in(&store, 1, at(2, 9, 0, 0)).await.unwrap();

        let saved = record_entry(
            &store,
            AttendanceEntry {
                employee_id: 1,
                date: at(2, 0, 0, 0).date(),
                check_in: Some(at(2, 8, 0, 0)),
                check_out: Some(at(2, 12, 0, 0)),
                hours_worked: None,
                status: AttendanceStatus::HalfDay,
                notes: Some("left for appointment".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(store.attendance_rows(), 1);
        assert_eq!(saved.status, AttendanceStatus::HalfDay);
        assert_eq!(saved.hours_worked, Some(dec("4.00")));
    }

    #[actix_web::test]
    async fn hr_entry_for_unknown_employee_fails() {
        let store = MemoryStore::default();

        let result = record_entry(
            &store,
            AttendanceEntry {
                employee_id: 99,
                date: at(2, 0, 0, 0).date(),
                check_in: None,
                check_out: None,
                hours_worked: None,
                status: AttendanceStatus::Absent,
                notes: None,
            },
        )
        .await;

        assert!(matches!(result, Err(HrmError::EmployeeNotFound(99))));
        assert_eq!(store.attendance_rows(), 0);
    }

    #[actix_web::test]
    async fn inverted_range_is_rejected() {
        let store = MemoryStore::default();
        let result = list_attendance(
            &store,
            1,
            at(10, 0, 0, 0).date(),
            at(9, 0, 0, 0).date(),
            None,
        )
        .await;
        assert!(matches!(result, Err(HrmError::InvalidRange(_))));
    }

    #[actix_web::test]
    async fn summary_counts_each_status() {
        let store = MemoryStore::with_employee(1, "Ayesha", "Karim", dec("5000"));
        check_in(&store, 1, at(2, 9, 0, 0)).await.unwrap();
        check_out(&store, 1, at(2, 17, 0, 0)).await.unwrap();
        check_in(&store, 1, at(3, 9, 0, 0)).await.unwrap();
        check_out(&store, 1, at(3, 16, 30, 0)).await.unwrap();
        for (day, status) in [(4, AttendanceStatus::Late), (5, AttendanceStatus::Absent)] {
            record_entry(
                &store,
                AttendanceEntry {
                    employee_id: 1,
                    date: at(day, 0, 0, 0).date(),
                    check_in: None,
                    check_out: None,
                    hours_worked: None,
                    status,
                    notes: None,
                },
            )
            .await
            .unwrap();
        }

        let summary = monthly_summary(&store, 1, 3, 2026).await.unwrap();

        assert_eq!(summary.present, 2);
        assert_eq!(summary.late, 1);
        assert_eq!(summary.absent, 1);
        assert_eq!(summary.half_day, 0);
        assert_eq!(summary.total_hours, dec("15.50"));
    }

    #[actix_web::test]
    async fn check_in_over_hr_check_out_reopens_the_day() {
        let store = MemoryStore::with_employee(1, "Ayesha", "Karim", dec("5000"));
        record_entry(
            &store,
            AttendanceEntry {
                employee_id: 1,
                date: at(2, 0, 0, 0).date(),
                check_in: None,
                check_out: Some(at(2, 8, 0, 0)),
                hours_worked: None,
                status: AttendanceStatus::Absent,
                notes: None,
            },
        )
        .await
        .unwrap();

        let opened = check_in(&store, 1, at(2, 9, 0, 0)).await.unwrap();
        assert_eq!(opened.check_in, Some(at(2, 9, 0, 0)));
        assert_eq!(opened.check_out, None);
        assert_eq!(opened.hours_worked, None);

        let closed = check_out(&store, 1, at(2, 17, 0, 0)).await.unwrap();
        assert_eq!(closed.hours_worked, Some(dec("8.00")));
    }

    #[actix_web::test]
    async fn hr_entry_timestamps_must_match_the_day() {
        let store = MemoryStore::with_employee(1, "Ayesha", "Karim", dec("5000"));
        let entry = AttendanceEntry {
            employee_id: 1,
            date: at(2, 0, 0, 0).date(),
            check_in: Some(at(2, 9, 0, 0)),
            check_out: Some(at(2, 17, 0, 0)),
            hours_worked: None,
            status: AttendanceStatus::Present,
            notes: None,
        };

        let stale_check_in = AttendanceEntry {
            check_in: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0),
            ..entry.clone()
        };
        let result = record_entry(&store, stale_check_in).await;
        assert!(matches!(result, Err(HrmError::InvalidRange(_))));

        let late_check_out = AttendanceEntry {
            check_out: Some(at(4, 1, 0, 0)),
            ..entry.clone()
        };
        let result = record_entry(&store, late_check_out).await;
        assert!(matches!(result, Err(HrmError::InvalidRange(_))));
        assert_eq!(store.attendance_rows(), 0);

        let night_shift = AttendanceEntry {
            check_in: Some(at(2, 22, 0, 0)),
            check_out: Some(at(3, 6, 0, 0)),
            ..entry
        };
        let saved = record_entry(&store, night_shift).await.unwrap();
        assert_eq!(saved.hours_worked, Some(dec("8.00")));
    }

    #[actix_web::test]
    async fn lost_check_in_race_reports_already_checked_in() {
        let store = MemoryStore::with_employee(1, "Ayesha", "Karim", dec("5000"));
        store.lose_next_check_in_race();

        let result = check_in(&store, 1, at(2, 9, 0, 0)).await;

        assert!(matches!(result, Err(HrmError::AlreadyCheckedIn)));
        assert_eq!(store.attendance_rows(), 1);
    }
}
