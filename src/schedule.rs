use crate::calendar::LessonCalendar;
use chrono::{Days, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A lesson as the scheduler sees it: identity, display name and position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRef {
    pub id: String,
    pub name: String,
    pub order_index: i64,
}

impl LessonRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, order_index: i64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            order_index,
        }
    }
}

/// Computed due date for one lesson. Recomputed on every scheduling request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deadline {
    pub lesson_id: String,
    pub lesson_name: String,
    pub order_index: i64,
    pub due_date: NaiveDate,
    /// End-of-day boundary used for overdue checks.
    pub due_at: NaiveDateTime,
    pub label: String,
    pub is_past: bool,
    pub is_due_today: bool,
    pub days_remaining: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum DeadlineStatus {
    Overdue,
    DueToday,
    DaysLeft(i64),
    Upcoming(String),
}

impl fmt::Display for DeadlineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeadlineStatus::Overdue => write!(f, "Overdue"),
            DeadlineStatus::DueToday => write!(f, "Due Today"),
            DeadlineStatus::DaysLeft(1) => write!(f, "1 day left"),
            DeadlineStatus::DaysLeft(days) => write!(f, "{days} days left"),
            DeadlineStatus::Upcoming(label) => write!(f, "{label}"),
        }
    }
}

impl Deadline {
    fn new(lesson: &LessonRef, due_date: NaiveDate, now: NaiveDateTime) -> Self {
        let due_at = end_of_day(due_date);
        let today = now.date();
        Self {
            lesson_id: lesson.id.clone(),
            lesson_name: lesson.name.clone(),
            order_index: lesson.order_index,
            due_date,
            due_at,
            label: format_due_label(due_date),
            is_past: now > due_at,
            is_due_today: due_date == today,
            days_remaining: (due_date - today).num_days().max(0),
        }
    }

    pub fn status(&self) -> DeadlineStatus {
        if self.is_past {
            DeadlineStatus::Overdue
        } else if self.is_due_today {
            DeadlineStatus::DueToday
        } else if self.days_remaining <= 2 {
            DeadlineStatus::DaysLeft(self.days_remaining)
        } else {
            DeadlineStatus::Upcoming(self.label.clone())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSummary {
    pub lesson_count: usize,
    pub overdue_count: usize,
    pub due_today_count: usize,
    pub next_due: Option<String>,
    pub final_due_date: Option<NaiveDate>,
}

impl ScheduleSummary {
    pub fn from_deadlines(deadlines: &[Deadline]) -> Self {
        Self {
            lesson_count: deadlines.len(),
            overdue_count: deadlines.iter().filter(|d| d.is_past).count(),
            due_today_count: deadlines.iter().filter(|d| d.is_due_today).count(),
            next_due: deadlines
                .iter()
                .find(|d| !d.is_past)
                .map(|d| d.lesson_id.clone()),
            final_due_date: deadlines.last().map(|d| d.due_date),
        }
    }

    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("lessons={}", self.lesson_count));
        if self.overdue_count > 0 {
            parts.push(format!("overdue={}", self.overdue_count));
        }
        if self.due_today_count > 0 {
            parts.push(format!("due_today={}", self.due_today_count));
        }
        if let Some(next) = &self.next_due {
            parts.push(format!("next={next}"));
        }
        if let Some(date) = self.final_due_date {
            parts.push(format!("final={date}"));
        }
        parts.join(", ")
    }
}

/// Assign a due date to every lesson, using the local clock for "now".
pub fn compute_deadlines<I, S>(
    start_date: NaiveDate,
    weekdays: I,
    lessons: &[LessonRef],
) -> Vec<Deadline>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    compute_deadlines_at(start_date, weekdays, lessons, Local::now().naive_local())
}

/// Assign a due date to every lesson relative to an explicit `now`.
///
/// Lessons are ordered by `order_index`; ties keep their input order. With an
/// empty recurrence set the i-th lesson is due on `start_date + i`. Otherwise
/// the first lesson lands on the first matching weekday on or after the start
/// date, and every following lesson on the next matching weekday after that.
pub fn compute_deadlines_at<I, S>(
    start_date: NaiveDate,
    weekdays: I,
    lessons: &[LessonRef],
    now: NaiveDateTime,
) -> Vec<Deadline>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let calendar = LessonCalendar::from_tokens(weekdays);
    deadlines_for_calendar(start_date, &calendar, lessons, now)
}

pub fn deadlines_for_calendar(
    start_date: NaiveDate,
    calendar: &LessonCalendar,
    lessons: &[LessonRef],
    now: NaiveDateTime,
) -> Vec<Deadline> {
    let mut ordered: Vec<&LessonRef> = lessons.iter().collect();
    ordered.sort_by_key(|lesson| lesson.order_index);

    let dates = due_dates(start_date, calendar, ordered.len());
    tracing::debug!(
        lessons = ordered.len(),
        daily = calendar.is_daily(),
        %start_date,
        "computed lesson due dates"
    );

    ordered
        .into_iter()
        .zip(dates)
        .map(|(lesson, date)| Deadline::new(lesson, date, now))
        .collect()
}

fn due_dates(start_date: NaiveDate, calendar: &LessonCalendar, count: usize) -> Vec<NaiveDate> {
    let dates: Vec<NaiveDate> = if calendar.is_daily() {
        (0..count as u64)
            .map_while(|offset| start_date.checked_add_days(Days::new(offset)))
            .collect()
    } else {
        std::iter::successors(calendar.first_on_or_after(start_date), |current| {
            calendar.next_after(*current)
        })
        .take(count)
        .collect()
    };
    if dates.len() < count {
        tracing::warn!(
            %start_date,
            scheduled = dates.len(),
            requested = count,
            "ran out of representable dates; later lessons left unscheduled"
        );
    }
    dates
}

pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    let boundary = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    date.and_time(boundary)
}

fn format_due_label(date: NaiveDate) -> String {
    date.format("%a, %b %-d, %Y").to_string()
}
