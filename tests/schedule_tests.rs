use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use lesson_engine::calendar::parse_weekday;
use lesson_engine::schedule::{DeadlineStatus, ScheduleSummary};
use lesson_engine::{LessonRef, compute_deadlines_at};
use proptest::prelude::*;

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(date: NaiveDate, h: u32) -> NaiveDateTime {
    date.and_hms_opt(h, 0, 0).unwrap()
}

fn lessons(n: usize) -> Vec<LessonRef> {
    (0..n)
        .map(|i| LessonRef::new(format!("l{i}"), format!("Lesson {i}"), i as i64))
        .collect()
}

const NO_DAYS: [&str; 0] = [];

#[test]
fn daily_cadence_assigns_consecutive_days() {
    let start = d(2025, 1, 6);
    let deadlines = compute_deadlines_at(start, NO_DAYS, &lessons(4), at(start, 8));
    let dates: Vec<NaiveDate> = deadlines.iter().map(|d| d.due_date).collect();
    assert_eq!(
        dates,
        vec![d(2025, 1, 6), d(2025, 1, 7), d(2025, 1, 8), d(2025, 1, 9)]
    );
}

#[test]
fn start_dates_at_the_end_of_the_calendar_schedule_what_fits() {
    let now = at(d(2025, 1, 6), 8);

    let daily = compute_deadlines_at(NaiveDate::MAX, NO_DAYS, &lessons(2), now);
    assert_eq!(daily.len(), 1);
    assert_eq!(daily[0].lesson_id, "l0");
    assert_eq!(daily[0].due_date, NaiveDate::MAX);

    let weekly = compute_deadlines_at(NaiveDate::MAX, ["monday"], &lessons(2), now);
    assert!(weekly.len() <= 1);
    assert!(weekly.iter().all(|dl| dl.due_date.weekday() == chrono::Weekday::Mon));

    let near_end = NaiveDate::MAX - Duration::days(10);
    let tail = compute_deadlines_at(near_end, NO_DAYS, &lessons(20), now);
    assert_eq!(tail.len(), 11);
    assert_eq!(tail.last().map(|dl| dl.due_date), Some(NaiveDate::MAX));
    assert!(tail.iter().all(|dl| !dl.is_past && dl.days_remaining > 0));
}

#[test]
fn weekly_pattern_starts_on_first_matching_day() {
    // 2025-01-07 is a Tuesday; Monday/Friday pattern starts on Friday the 10th
    let start = d(2025, 1, 7);
    let deadlines = compute_deadlines_at(
        start,
        ["monday", "friday"],
        &lessons(4),
        at(start, 8),
    );
    let dates: Vec<NaiveDate> = deadlines.iter().map(|d| d.due_date).collect();
    assert_eq!(
        dates,
        vec![d(2025, 1, 10), d(2025, 1, 13), d(2025, 1, 17), d(2025, 1, 20)]
    );
}

#[test]
fn lessons_are_sorted_by_order_index() {
    let start = d(2025, 1, 6);
    let input = vec![
        LessonRef::new("c", "Third", 30),
        LessonRef::new("a", "First", 1),
        LessonRef::new("b", "Second", 7),
    ];
    let deadlines = compute_deadlines_at(start, NO_DAYS, &input, at(start, 8));
    let ids: Vec<&str> = deadlines.iter().map(|d| d.lesson_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn equal_order_index_keeps_input_order() {
    let start = d(2025, 1, 6);
    let input = vec![
        LessonRef::new("x", "X", 2),
        LessonRef::new("y", "Y", 2),
        LessonRef::new("w", "W", 1),
    ];
    let deadlines = compute_deadlines_at(start, NO_DAYS, &input, at(start, 8));
    let ids: Vec<&str> = deadlines.iter().map(|d| d.lesson_id.as_str()).collect();
    assert_eq!(ids, vec!["w", "x", "y"]);
}

#[test]
fn no_lessons_yields_empty_schedule() {
    let start = d(2025, 1, 6);
    let deadlines = compute_deadlines_at(start, ["monday"], &[], at(start, 8));
    assert!(deadlines.is_empty());
    let summary = ScheduleSummary::from_deadlines(&deadlines);
    assert_eq!(summary.lesson_count, 0);
    assert_eq!(summary.to_cli_summary(), "lessons=0");
}

#[test]
fn status_flags_follow_the_clock() {
    let start = d(2025, 1, 6);
    let now = at(d(2025, 1, 8), 15);
    let deadlines = compute_deadlines_at(start, NO_DAYS, &lessons(6), now);

    assert!(deadlines[0].is_past);
    assert!(deadlines[1].is_past);
    assert_eq!(deadlines[1].status(), DeadlineStatus::Overdue);

    assert!(!deadlines[2].is_past);
    assert!(deadlines[2].is_due_today);
    assert_eq!(deadlines[2].days_remaining, 0);
    assert_eq!(deadlines[2].status().to_string(), "Due Today");

    assert_eq!(deadlines[3].status().to_string(), "1 day left");
    assert_eq!(deadlines[4].status().to_string(), "2 days left");
    assert_eq!(deadlines[5].days_remaining, 3);
    assert_eq!(deadlines[5].status().to_string(), "Sat, Jan 11, 2025");
    assert_eq!(deadlines[0].days_remaining, 0);
}

#[test]
fn deadline_is_not_past_until_the_day_ends() {
    let start = d(2025, 1, 6);
    let late_evening = start.and_hms_milli_opt(23, 59, 59, 999).unwrap();
    let deadlines = compute_deadlines_at(start, NO_DAYS, &lessons(1), late_evening);
    assert!(!deadlines[0].is_past);
    assert!(deadlines[0].is_due_today);

    let next_morning = at(start + Duration::days(1), 0);
    let deadlines = compute_deadlines_at(start, NO_DAYS, &lessons(1), next_morning);
    assert!(deadlines[0].is_past);
    assert!(!deadlines[0].is_due_today);
}

#[test]
fn summary_reports_overdue_and_next_lesson() {
    let start = d(2025, 1, 6);
    let now = at(d(2025, 1, 7), 10);
    let deadlines = compute_deadlines_at(start, NO_DAYS, &lessons(3), now);
    let summary = ScheduleSummary::from_deadlines(&deadlines);
    assert_eq!(summary.overdue_count, 1);
    assert_eq!(summary.due_today_count, 1);
    assert_eq!(summary.next_due.as_deref(), Some("l1"));
    assert_eq!(summary.final_due_date, Some(d(2025, 1, 8)));
    assert_eq!(
        summary.to_cli_summary(),
        "lessons=3, overdue=1, due_today=1, next=l1, final=2025-01-08"
    );
}

const WEEKDAY_NAMES: [&str; 7] = [
    "sunday",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
];

fn weekday_subset() -> impl Strategy<Value = Vec<&'static str>> {
    proptest::sample::subsequence(WEEKDAY_NAMES.to_vec(), 1..=7)
}

fn start_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| d(2020, 1, 1) + Duration::days(offset))
}

proptest! {
    #[test]
    fn weekly_schedule_is_strictly_increasing_on_allowed_days(
        days in weekday_subset(),
        start in start_date(),
        n in 0usize..40,
        now_offset in -30i64..60,
    ) {
        let now = at(start + Duration::days(now_offset), 12);
        let deadlines = compute_deadlines_at(start, &days, &lessons(n), now);
        prop_assert_eq!(deadlines.len(), n);

        let allowed: Vec<chrono::Weekday> =
            days.iter().filter_map(|name| parse_weekday(name)).collect();
        for pair in deadlines.windows(2) {
            prop_assert!(pair[0].due_date < pair[1].due_date);
        }
        for deadline in &deadlines {
            prop_assert!(deadline.due_date >= start);
            prop_assert!(allowed.contains(&deadline.due_date.weekday()));
        }
    }

    #[test]
    fn daily_schedule_is_start_plus_index(start in start_date(), n in 0usize..40) {
        let deadlines = compute_deadlines_at(start, NO_DAYS, &lessons(n), at(start, 9));
        for (i, deadline) in deadlines.iter().enumerate() {
            prop_assert_eq!(deadline.due_date, start + Duration::days(i as i64));
        }
    }

    #[test]
    fn flags_are_consistent(
        days in weekday_subset(),
        start in start_date(),
        n in 1usize..20,
        now_offset in -30i64..90,
        hour in 0u32..24,
    ) {
        let now = (start + Duration::days(now_offset)).and_hms_opt(hour, 0, 0).unwrap();
        let deadlines = compute_deadlines_at(start, &days, &lessons(n), now);
        for deadline in &deadlines {
            prop_assert!(deadline.days_remaining >= 0);
            prop_assert!(!(deadline.is_past && deadline.is_due_today));
        }
    }
}
