use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Weekly recurrence pattern for lesson due dates.
///
/// An empty set means "every day". Weekdays are kept ordered Sunday-first so
/// the serialized form is stable regardless of the order callers supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct LessonCalendar {
    lesson_days: BTreeSet<u32>,
}

impl LessonCalendar {
    pub const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Sun,
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
    ];

    /// A calendar with no recurrence set: one lesson per calendar day.
    pub fn daily() -> Self {
        Self::default()
    }

    pub fn custom<I>(weekdays: I) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        Self {
            lesson_days: weekdays
                .into_iter()
                .map(|wd| wd.num_days_from_sunday())
                .collect(),
        }
    }

    /// Build a calendar from free-form weekday names.
    ///
    /// Matching is case-insensitive; duplicates collapse and unrecognized
    /// tokens are dropped.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut lesson_days = BTreeSet::new();
        for token in tokens {
            let token = token.as_ref();
            match parse_weekday(token) {
                Some(day) => {
                    lesson_days.insert(day.num_days_from_sunday());
                }
                None => tracing::debug!(token, "dropping unrecognized weekday token"),
            }
        }
        Self { lesson_days }
    }

    pub fn is_daily(&self) -> bool {
        self.lesson_days.is_empty()
    }

    /// Weekdays in the recurrence set, Sunday first.
    pub fn weekdays(&self) -> Vec<Weekday> {
        self.lesson_days
            .iter()
            .map(|n| Self::ALL_WEEKDAYS[*n as usize])
            .collect()
    }

    pub fn is_lesson_day(&self, date: NaiveDate) -> bool {
        self.is_daily() || self.lesson_days.contains(&date.weekday().num_days_from_sunday())
    }

    /// First lesson day on or after `from` (the date itself qualifies).
    /// `None` once no later date is representable.
    pub fn first_on_or_after(&self, from: NaiveDate) -> Option<NaiveDate> {
        (0..7)
            .map_while(|offset| from.checked_add_days(Days::new(offset)))
            .find(|date| self.is_lesson_day(*date))
    }

    /// Next lesson day strictly after `from`.
    pub fn next_after(&self, from: NaiveDate) -> Option<NaiveDate> {
        (1..=7)
            .map_while(|offset| from.checked_add_days(Days::new(offset)))
            .find(|date| self.is_lesson_day(*date))
    }

    /// All lesson days in an inclusive date range.
    pub fn lesson_days_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        std::iter::successors(Some(start), |current| current.succ_opt())
            .take_while(|current| *current <= end)
            .filter(|current| self.is_lesson_day(*current))
            .collect()
    }
}

/// Case-insensitive weekday lookup ("monday", "Mon", "SUNDAY").
pub fn parse_weekday(token: &str) -> Option<Weekday> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.to_ascii_lowercase().parse::<Weekday>().ok()
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Sun => "sunday",
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
    }
}

impl From<Vec<String>> for LessonCalendar {
    fn from(tokens: Vec<String>) -> Self {
        Self::from_tokens(tokens)
    }
}

impl From<LessonCalendar> for Vec<String> {
    fn from(calendar: LessonCalendar) -> Self {
        calendar
            .weekdays()
            .into_iter()
            .map(|wd| weekday_name(wd).to_string())
            .collect()
    }
}
