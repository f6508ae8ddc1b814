pub mod bonus;
pub mod calendar;
pub mod config;
#[cfg(feature = "http_api")]
pub mod http_api;
pub mod logging;
pub mod metrics;
pub mod persistence;
pub mod progress;
pub mod schedule;

pub use bonus::{
    BonusConfig, BonusEvent, MilestoneCoins, StreakConfig, evaluate_attempt, first_time_bonus,
    milestone_bonus, streak_bonus,
};
pub use calendar::LessonCalendar;
pub use config::{ConfigError, EngineConfig};
pub use metrics::{
    DetectionMethod, MetricId, MetricSetting, PersistedMetricRow, ScoringWeightConfig,
    WeightDistribution, load_config, to_persisted_rows,
};
#[cfg(feature = "sqlite")]
pub use persistence::sqlite::SqliteMetricStore;
pub use persistence::{
    JsonFileSideChannel, MemoryMetricStore, MemorySideChannel, MetricStore, PersistenceError,
    SideChannelStore, load_cached_config, load_scoring_config, save_scoring_config,
};
pub use progress::{
    ContentCategory, LessonContent, MasteryRecord, Milestone, ProgressStats, compute_progress,
    compute_progress_between,
};
pub use schedule::{
    Deadline, DeadlineStatus, LessonRef, ScheduleSummary, compute_deadlines, compute_deadlines_at,
};
