use crate::progress::{Milestone, ProgressStats};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestoneCoins {
    pub quarter: u32,
    pub half: u32,
    pub three_quarters: u32,
    pub complete: u32,
}

impl Default for MilestoneCoins {
    fn default() -> Self {
        Self {
            quarter: 10,
            half: 25,
            three_quarters: 50,
            complete: 100,
        }
    }
}

impl MilestoneCoins {
    pub fn for_milestone(&self, milestone: Milestone) -> u32 {
        match milestone {
            Milestone::Quarter => self.quarter,
            Milestone::Half => self.half,
            Milestone::ThreeQuarters => self.three_quarters,
            Milestone::Complete => self.complete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakConfig {
    /// Run length that earns one unit of bonus.
    pub threshold: u32,
    pub min_score: f64,
    pub coins_per_threshold: u32,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            threshold: 3,
            min_score: 80.0,
            coins_per_threshold: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BonusConfig {
    pub milestone_coins: MilestoneCoins,
    pub streak: StreakConfig,
    pub first_time_coins: u32,
}

impl Default for BonusConfig {
    fn default() -> Self {
        Self {
            milestone_coins: MilestoneCoins::default(),
            streak: StreakConfig::default(),
            first_time_coins: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BonusEvent {
    Milestone {
        milestone: Milestone,
        coins: u32,
        label: String,
        icon: String,
    },
    Streak {
        run_length: u32,
        coins: u32,
        label: String,
    },
    FirstTime {
        coins: u32,
        label: String,
    },
}

impl BonusEvent {
    pub fn first_time(coins: u32) -> Self {
        BonusEvent::FirstTime {
            coins,
            label: "First Try Bonus".to_string(),
        }
    }

    pub fn coins(&self) -> u32 {
        match self {
            BonusEvent::Milestone { coins, .. }
            | BonusEvent::Streak { coins, .. }
            | BonusEvent::FirstTime { coins, .. } => *coins,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            BonusEvent::Milestone { label, .. }
            | BonusEvent::Streak { label, .. }
            | BonusEvent::FirstTime { label, .. } => label,
        }
    }
}

fn milestone_presentation(milestone: Milestone) -> (&'static str, &'static str) {
    match milestone {
        Milestone::Quarter => ("Quarter Way There", "🌱"),
        Milestone::Half => ("Halfway Hero", "🔥"),
        Milestone::ThreeQuarters => ("Almost There", "⭐"),
        Milestone::Complete => ("Lesson Master", "🏆"),
    }
}

/// Bonus for a completion milestone given as a percentage (25, 50, 75 or 100).
pub fn milestone_bonus(milestone: u32, config: &BonusConfig) -> Option<BonusEvent> {
    let milestone = Milestone::from_percent(milestone)?;
    let (label, icon) = milestone_presentation(milestone);
    Some(BonusEvent::Milestone {
        milestone,
        coins: config.milestone_coins.for_milestone(milestone),
        label: label.to_string(),
        icon: icon.to_string(),
    })
}

/// Length of the trailing run of scores at or above `min_score`.
///
/// Scores are in chronological order; the last entry is the most recent.
pub fn trailing_run(recent_scores: &[f64], min_score: f64) -> u32 {
    let run = recent_scores
        .iter()
        .rev()
        .take_while(|score| **score >= min_score)
        .count();
    u32::try_from(run).unwrap_or(u32::MAX)
}

/// Streak bonus for the trailing run of high scores.
///
/// Coins scale in whole multiples of the configured threshold: a run of six
/// with a threshold of three earns twice the per-threshold amount.
pub fn streak_bonus(recent_scores: &[f64], config: &BonusConfig) -> Option<BonusEvent> {
    let streak = &config.streak;
    if streak.threshold == 0 {
        return None;
    }
    let run_length = trailing_run(recent_scores, streak.min_score);
    if run_length < streak.threshold {
        return None;
    }
    // Saturates instead of wrapping when configured amounts are huge.
    let coins = streak
        .coins_per_threshold
        .saturating_mul(run_length / streak.threshold);
    tracing::debug!(run_length, coins, "streak bonus earned");
    Some(BonusEvent::Streak {
        run_length,
        coins,
        label: format!("{run_length} in a row!"),
    })
}

/// Coins for a first attempt. `attempt_count` must already include the
/// attempt being evaluated, so only exactly 1 qualifies.
pub fn first_time_bonus(attempt_count: u32, config: &BonusConfig) -> u32 {
    if attempt_count == 1 {
        config.first_time_coins
    } else {
        0
    }
}

/// Every bonus one evaluated attempt earns, in milestone/streak/first-time order.
///
/// Nothing here remembers what was already granted; the caller owns that.
pub fn evaluate_attempt(
    progress: &ProgressStats,
    recent_scores: &[f64],
    attempt_count: u32,
    config: &BonusConfig,
) -> Vec<BonusEvent> {
    let mut events = Vec::new();
    if let Some(event) = progress
        .milestone_achieved
        .and_then(|m| milestone_bonus(m.percent(), config))
    {
        events.push(event);
    }
    if let Some(event) = streak_bonus(recent_scores, config) {
        events.push(event);
    }
    let first_time = first_time_bonus(attempt_count, config);
    if first_time > 0 {
        events.push(BonusEvent::first_time(first_time));
    }
    events
}
