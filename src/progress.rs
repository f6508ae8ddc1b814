use serde::{Deserialize, Serialize};

/// Mastery level at which a practiced item counts as completed.
pub const COMPLETION_MASTERY_LEVEL: i32 = 3;

/// A named group of practice items inside a lesson (vocabulary, phrases, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCategory {
    pub name: String,
    #[serde(default)]
    pub item_count: u32,
}

impl ContentCategory {
    pub fn new(name: impl Into<String>, item_count: u32) -> Self {
        Self {
            name: name.into(),
            item_count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonContent {
    pub lesson_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<ContentCategory>>,
}

impl LessonContent {
    pub fn new(lesson_id: impl Into<String>, categories: Vec<ContentCategory>) -> Self {
        Self {
            lesson_id: lesson_id.into(),
            categories: Some(categories),
        }
    }

    pub fn total_items(&self) -> u32 {
        self.categories
            .iter()
            .flatten()
            .fold(0u32, |total, category| total.saturating_add(category.item_count))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasteryRecord {
    pub item_id: String,
    pub mastery_level: i32,
}

impl MasteryRecord {
    pub fn new(item_id: impl Into<String>, mastery_level: i32) -> Self {
        Self {
            item_id: item_id.into(),
            mastery_level,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.mastery_level >= COMPLETION_MASTERY_LEVEL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u32", try_from = "u32")]
pub enum Milestone {
    Quarter,
    Half,
    ThreeQuarters,
    Complete,
}

impl Milestone {
    /// Ascending, in the order milestones are checked.
    pub const ALL: [Milestone; 4] = [
        Milestone::Quarter,
        Milestone::Half,
        Milestone::ThreeQuarters,
        Milestone::Complete,
    ];

    pub fn percent(self) -> u32 {
        match self {
            Milestone::Quarter => 25,
            Milestone::Half => 50,
            Milestone::ThreeQuarters => 75,
            Milestone::Complete => 100,
        }
    }

    pub fn from_percent(percent: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.percent() == percent)
    }
}

impl From<Milestone> for u32 {
    fn from(milestone: Milestone) -> Self {
        milestone.percent()
    }
}

impl TryFrom<u32> for Milestone {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Milestone::from_percent(value).ok_or_else(|| format!("{value} is not a milestone"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressStats {
    pub total_items: u32,
    pub completed_items: u32,
    pub completion_percent: u32,
    pub previous_percent: u32,
    pub milestone_achieved: Option<Milestone>,
}

/// Progress for a lesson given the learner's mastery records.
///
/// The "previous" percentage is reconstructed as one fewer completed item, so
/// milestone detection is only exact when this runs once per newly completed
/// item. Use [`compute_progress_between`] when both counts are known.
pub fn compute_progress(
    lesson: &LessonContent,
    mastery_records: &[MasteryRecord],
) -> ProgressStats {
    let completed = mastery_records.iter().filter(|r| r.is_completed()).count();
    let completed = u32::try_from(completed).unwrap_or(u32::MAX);
    compute_progress_between(lesson.total_items(), completed.saturating_sub(1), completed)
}

pub fn compute_progress_between(
    total_items: u32,
    completed_before: u32,
    completed_after: u32,
) -> ProgressStats {
    let completion_percent = percent_of(completed_after, total_items);
    let previous_percent = percent_of(completed_before, total_items);
    let milestone_achieved = Milestone::ALL.into_iter().find(|m| {
        completion_percent >= m.percent() && previous_percent < m.percent()
    });

    if let Some(milestone) = milestone_achieved {
        tracing::debug!(
            total_items,
            completed_after,
            milestone = milestone.percent(),
            "milestone crossed"
        );
    }

    ProgressStats {
        total_items,
        completed_items: completed_after,
        completion_percent,
        previous_percent,
        milestone_achieved,
    }
}

/// Rounded integer percentage (half rounds up), capped at 100; 0 when `total` is 0.
fn percent_of(part: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let part = u64::from(part);
    let total = u64::from(total);
    ((200 * part + total) / (2 * total)).min(100) as u32
}
