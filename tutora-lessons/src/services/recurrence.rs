use chrono::{DateTime, Datelike, Duration, Months, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use tutora_shared::errors::{AppError, AppResult, ErrorCode};
use tutora_shared::types::auth::{AuthUser, UserRole};

use crate::models::{
    Booking, BookingStatus, Frequency, NewBooking, NewRecurringPattern, RecurringPattern,
};
use crate::schema::{bookings, recurring_patterns};
use crate::services::lifecycle;

/// Upper bound when deriving an occurrence count from an end date. Covers
/// a full year of daily classes.
const MAX_DERIVED_OCCURRENCES: usize = 366;

/// Deterministically expands a recurrence rule into scheduled instants.
/// Weekday numbers are 0-6 with 0 = Sunday; they only apply to `weekly`.
/// Every produced instant carries the start's time of day, and the result
/// is sorted ascending.
pub fn occurrence_dates(
    start: DateTime<Utc>,
    frequency: Frequency,
    occurrences: usize,
    days_of_week: Option<&[i32]>,
) -> Vec<DateTime<Utc>> {
    let mut dates: Vec<DateTime<Utc>> = match frequency {
        Frequency::Daily => (0..occurrences)
            .map(|i| start + Duration::days(i as i64))
            .collect(),

        Frequency::Weekly => match days_of_week {
            Some(days) if !days.is_empty() => weekly_by_days(start, occurrences, days),
            _ => (0..occurrences)
                .map(|i| start + Duration::days(7 * i as i64))
                .collect(),
        },

        Frequency::Biweekly => (0..occurrences)
            .map(|i| start + Duration::days(14 * i as i64))
            .collect(),

        Frequency::Monthly => (0..occurrences)
            .filter_map(|i| start.checked_add_months(Months::new(i as u32)))
            .collect(),
    };

    dates.sort();
    dates
}

/// Week-by-week expansion: within each week, the next occurrence of each
/// requested weekday on/after the week anchor. The outer loop is bounded
/// by the occurrence count, never by wall-clock time.
fn weekly_by_days(start: DateTime<Utc>, occurrences: usize, days: &[i32]) -> Vec<DateTime<Utc>> {
    let mut days: Vec<i64> = days.iter().map(|d| i64::from(*d)).collect();
    days.sort_unstable();
    days.dedup();

    let start_dow = i64::from(start.weekday().num_days_from_sunday());
    let mut dates = Vec::with_capacity(occurrences);
    let mut week = 0i64;

    while dates.len() < occurrences {
        let anchor = start + Duration::days(7 * week);
        for day in &days {
            let delta = (day - start_dow).rem_euclid(7);
            let candidate = anchor + Duration::days(delta);
            if candidate >= start {
                dates.push(candidate);
                if dates.len() == occurrences {
                    break;
                }
            }
        }
        week += 1;
    }

    dates
}

/// Number of occurrences on/before `end`, for requests that give an end
/// date instead of a count.
pub fn occurrences_until(
    start: DateTime<Utc>,
    frequency: Frequency,
    end: DateTime<Utc>,
    days_of_week: Option<&[i32]>,
) -> usize {
    occurrence_dates(start, frequency, MAX_DERIVED_OCCURRENCES, days_of_week)
        .into_iter()
        .take_while(|d| *d <= end)
        .count()
}

pub struct CreateSeriesInput {
    pub teacher_id: Uuid,
    pub student_id: Uuid,
    pub class_title: String,
    pub topic: Option<String>,
    pub start_time: DateTime<Utc>,
    pub frequency: Frequency,
    pub occurrences: usize,
    pub days_of_week: Option<Vec<i32>>,
    pub duration_minutes: i32,
}

pub fn load_pattern(conn: &mut PgConnection, pattern_id: Uuid) -> AppResult<RecurringPattern> {
    recurring_patterns::table
        .find(pattern_id)
        .first::<RecurringPattern>(conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::PatternNotFound, "recurring pattern not found"))
}

/// Creates the pattern and all of its bookings. Run inside one
/// transaction by the caller: a failed booking insert rolls back the
/// pattern and every sibling.
pub fn create_series(
    conn: &mut PgConnection,
    input: CreateSeriesInput,
    creator: &AuthUser,
) -> AppResult<(RecurringPattern, Vec<Booking>)> {
    let teacher = lifecycle::load_teacher(conn, input.teacher_id)?;
    let student = lifecycle::load_student(conn, input.student_id)?;

    if input.occurrences == 0 {
        return Err(AppError::new(
            ErrorCode::EmptySeries,
            "the series would contain no classes",
        ));
    }

    if let Some(days) = input.days_of_week.as_deref() {
        if input.frequency == Frequency::Weekly && days.is_empty() {
            return Err(AppError::new(
                ErrorCode::EmptyWeekdaySet,
                "weekly recurrence requires at least one weekday",
            ));
        }
        if days.iter().any(|d| !(0..=6).contains(d)) {
            return Err(AppError::new(
                ErrorCode::ValidationError,
                "days_of_week values must be between 0 (Sunday) and 6 (Saturday)",
            ));
        }
    }

    let available = student.no_of_classes;
    if (available as i64) < input.occurrences as i64 {
        let shortfall = input.occurrences as i64 - available as i64;
        return Err(AppError::with_details(
            ErrorCode::InsufficientCredit,
            format!(
                "student has {available} class credits but the series needs {}; {shortfall} more required",
                input.occurrences
            ),
            serde_json::json!({
                "required": input.occurrences,
                "available": available,
                "shortfall": shortfall,
            }),
        ));
    }

    let dates = occurrence_dates(
        input.start_time,
        input.frequency,
        input.occurrences,
        input.days_of_week.as_deref(),
    );

    // Bookings created on behalf of a confirmed slot start accepted;
    // student-requested series still need the teacher's acceptance.
    let initial_status = match creator.role {
        UserRole::Admin | UserRole::Teacher => BookingStatus::Accepted,
        UserRole::Student => BookingStatus::Pending,
    };

    let pattern: RecurringPattern = diesel::insert_into(recurring_patterns::table)
        .values(&NewRecurringPattern {
            teacher_id: teacher.id,
            student_id: student.id,
            class_title: input.class_title.clone(),
            start_time: input.start_time,
            frequency: input.frequency.as_str().to_string(),
            occurrences: input.occurrences as i32,
            days_of_week: input.days_of_week.clone(),
            status: "active".to_string(),
            created_by: creator.id,
        })
        .get_result(conn)?;

    let mut series = Vec::with_capacity(dates.len());
    for scheduled_time in dates {
        let booking: Booking = diesel::insert_into(bookings::table)
            .values(&NewBooking {
                teacher_id: teacher.id,
                student_id: student.id,
                class_title: input.class_title.clone(),
                topic: input.topic.clone(),
                scheduled_time,
                duration_minutes: input.duration_minutes,
                status: initial_status.as_str().to_string(),
                created_by_role: creator.role.to_string(),
                created_by: creator.id,
                recurring_pattern_id: Some(pattern.id),
            })
            .get_result(conn)?;
        series.push(booking);
    }

    tracing::info!(
        pattern_id = %pattern.id,
        teacher_id = %teacher.id,
        student_id = %student.id,
        bookings = series.len(),
        frequency = pattern.frequency,
        "recurring series created"
    );

    Ok((pattern, series))
}

/// Cancels the pattern and, when `cancel_future` is set, every linked
/// booking that has not yet occurred.
pub fn cancel_series(
    conn: &mut PgConnection,
    pattern_id: Uuid,
    cancel_future: bool,
) -> AppResult<(RecurringPattern, usize)> {
    let pattern = load_pattern(conn, pattern_id)?;
    if pattern.status == "cancelled" {
        return Err(AppError::state_conflict(
            ErrorCode::BadRequest,
            "this recurring pattern is already cancelled",
            &pattern.status,
        ));
    }

    let now = Utc::now();

    let cancelled_bookings = if cancel_future {
        diesel::update(
            bookings::table
                .filter(bookings::recurring_pattern_id.eq(pattern.id))
                .filter(bookings::scheduled_time.gt(now))
                .filter(bookings::status.eq_any(vec![
                    BookingStatus::Pending.as_str(),
                    BookingStatus::Accepted.as_str(),
                ])),
        )
        .set((
            bookings::status.eq(BookingStatus::Cancelled.as_str()),
            bookings::cancelled_at.eq(now),
        ))
        .execute(conn)?
    } else {
        0
    };

    let updated: RecurringPattern = diesel::update(recurring_patterns::table.find(pattern.id))
        .set((
            recurring_patterns::status.eq("cancelled"),
            recurring_patterns::cancelled_at.eq(now),
        ))
        .get_result(conn)?;

    tracing::info!(
        pattern_id = %pattern.id,
        cancelled_bookings = cancelled_bookings,
        "recurring series cancelled"
    );

    Ok((updated, cancelled_bookings))
}

/// Administrative hard delete: the pattern and every linked booking.
pub fn delete_series(conn: &mut PgConnection, pattern_id: Uuid) -> AppResult<usize> {
    let pattern = load_pattern(conn, pattern_id)?;

    let deleted_bookings = diesel::delete(
        bookings::table.filter(bookings::recurring_pattern_id.eq(pattern.id)),
    )
    .execute(conn)?;

    diesel::delete(recurring_patterns::table.find(pattern.id)).execute(conn)?;

    tracing::info!(
        pattern_id = %pattern.id,
        deleted_bookings = deleted_bookings,
        "recurring series deleted"
    );

    Ok(deleted_bookings)
}

pub fn series_bookings(conn: &mut PgConnection, pattern_id: Uuid) -> AppResult<Vec<Booking>> {
    Ok(bookings::table
        .filter(bookings::recurring_pattern_id.eq(pattern_id))
        .order(bookings::scheduled_time.asc())
        .load::<Booking>(conn)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn mon_jan_1() -> DateTime<Utc> {
        // 2024-01-01 is a Monday.
        Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap()
    }

    #[test]
    fn weekly_by_weekday_expansion() {
        let dates = occurrence_dates(mon_jan_1(), Frequency::Weekly, 4, Some(&[1, 3]));

        let expected = [
            Utc.with_ymd_and_hms(2024, 1, 1, 10, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 3, 10, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 8, 10, 30, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 10, 10, 30, 0).unwrap(),
        ];

        assert_eq!(dates, expected);
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn weekly_weekday_order_does_not_matter() {
        let sorted = occurrence_dates(mon_jan_1(), Frequency::Weekly, 4, Some(&[1, 3]));
        let unsorted = occurrence_dates(mon_jan_1(), Frequency::Weekly, 4, Some(&[3, 1]));
        assert_eq!(sorted, unsorted);
    }

    #[test]
    fn weekly_weekday_before_start_rolls_forward() {
        // Sunday (0) requested from a Monday start: the first Sunday in
        // range is the following week's.
        let dates = occurrence_dates(mon_jan_1(), Frequency::Weekly, 2, Some(&[0]));
        assert_eq!(dates[0], Utc.with_ymd_and_hms(2024, 1, 7, 10, 30, 0).unwrap());
        assert_eq!(dates[1], Utc.with_ymd_and_hms(2024, 1, 14, 10, 30, 0).unwrap());
    }

    #[test]
    fn daily_and_stride_frequencies() {
        let daily = occurrence_dates(mon_jan_1(), Frequency::Daily, 3, None);
        assert_eq!(daily[1] - daily[0], Duration::days(1));
        assert_eq!(daily[2] - daily[0], Duration::days(2));

        let weekly = occurrence_dates(mon_jan_1(), Frequency::Weekly, 3, None);
        assert_eq!(weekly[2] - weekly[0], Duration::days(14));

        let biweekly = occurrence_dates(mon_jan_1(), Frequency::Biweekly, 3, None);
        assert_eq!(biweekly[2] - biweekly[0], Duration::days(28));
    }

    #[test]
    fn monthly_clamps_to_month_end() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 9, 0, 0).unwrap();
        let dates = occurrence_dates(start, Frequency::Monthly, 3, None);

        assert_eq!(dates[0], start);
        // 2024 is a leap year: Jan 31 + 1 month lands on Feb 29.
        assert_eq!(dates[1], Utc.with_ymd_and_hms(2024, 2, 29, 9, 0, 0).unwrap());
        assert_eq!(dates[2], Utc.with_ymd_and_hms(2024, 3, 31, 9, 0, 0).unwrap());
    }

    #[test]
    fn occurrences_keep_the_start_time_of_day() {
        for frequency in [
            Frequency::Daily,
            Frequency::Weekly,
            Frequency::Biweekly,
            Frequency::Monthly,
        ] {
            for date in occurrence_dates(mon_jan_1(), frequency, 5, Some(&[2, 5])) {
                assert_eq!(date.hour(), 10);
                assert_eq!(date.minute(), 30);
            }
        }
    }

    #[test]
    fn end_date_derives_the_occurrence_count() {
        let end = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(occurrences_until(mon_jan_1(), Frequency::Weekly, end, None), 3);

        let before_start = Utc.with_ymd_and_hms(2023, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(
            occurrences_until(mon_jan_1(), Frequency::Daily, before_start, None),
            0
        );
    }
}
