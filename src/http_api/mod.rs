use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    BonusConfig, BonusEvent, Deadline, LessonContent, LessonRef, MasteryRecord, MemoryMetricStore,
    MemorySideChannel, MetricStore, PersistenceError, ProgressStats, ScheduleSummary,
    ScoringWeightConfig, SideChannelStore, WeightDistribution, compute_deadlines,
    compute_deadlines_at, compute_progress, evaluate_attempt, first_time_bonus, load_scoring_config,
    milestone_bonus, save_scoring_config, streak_bonus,
};

pub type SharedMetricStore = Arc<dyn MetricStore + Send + Sync>;
pub type SharedSideChannel = Arc<dyn SideChannelStore + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    metric_store: SharedMetricStore,
    side_channel: SharedSideChannel,
    bonus: Arc<RwLock<BonusConfig>>,
}

impl AppState {
    pub fn new(
        metric_store: SharedMetricStore,
        side_channel: SharedSideChannel,
        bonus: BonusConfig,
    ) -> Self {
        Self {
            metric_store,
            side_channel,
            bonus: Arc::new(RwLock::new(bonus)),
        }
    }

    /// State backed by in-memory stores and default bonus amounts.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryMetricStore::new()),
            Arc::new(MemorySideChannel::new()),
            BonusConfig::default(),
        )
    }

    fn bonus_config(&self) -> BonusConfig {
        self.bonus.read().clone()
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        tracing::error!(error = %value, "persistence failure");
        ApiError::Internal(value.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Invalid(message) => {
                let body = Json(ErrorBody {
                    error: "invalid_request",
                    message,
                });
                (StatusCode::BAD_REQUEST, body).into_response()
            }
            ApiError::Internal(message) => {
                let body = Json(ErrorBody {
                    error: "internal_error",
                    message,
                });
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeadlinesPayload {
    start_date: NaiveDate,
    #[serde(default)]
    weekdays: Vec<String>,
    lessons: Vec<LessonRef>,
    #[serde(default)]
    now: Option<NaiveDateTime>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeadlineView {
    #[serde(flatten)]
    pub deadline: Deadline,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeadlinesResponse {
    pub deadlines: Vec<DeadlineView>,
    pub summary: ScheduleSummary,
}

#[derive(Debug, Deserialize)]
struct ProgressPayload {
    lesson: LessonContent,
    #[serde(default)]
    mastery_records: Vec<MasteryRecord>,
    #[serde(default)]
    recent_scores: Vec<f64>,
    #[serde(default)]
    attempt_count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressResponse {
    pub stats: ProgressStats,
    pub bonuses: Vec<BonusEvent>,
}

#[derive(Debug, Deserialize)]
struct MilestonePayload {
    milestone: u32,
}

#[derive(Debug, Deserialize)]
struct StreakPayload {
    recent_scores: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct FirstTimePayload {
    attempt_count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BonusResponse {
    pub bonus: Option<BonusEvent>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MetricsResponse {
    pub settings: ScoringWeightConfig,
    pub distribution: WeightDistribution,
}

impl From<ScoringWeightConfig> for MetricsResponse {
    fn from(settings: ScoringWeightConfig) -> Self {
        let distribution = settings.weight_distribution();
        Self {
            settings,
            distribution,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/schedule/deadlines", post(deadlines))
        .route("/progress", post(progress))
        .route("/bonuses/milestone", post(bonus_for_milestone))
        .route("/bonuses/streak", post(bonus_for_streak))
        .route("/bonuses/first_time", post(bonus_for_first_time))
        .route("/metrics", get(get_metrics).put(update_metrics))
        .route("/config/bonus", get(get_bonus_config).put(update_bonus_config))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "lesson engine HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn deadlines(Json(payload): Json<DeadlinesPayload>) -> Json<DeadlinesResponse> {
    let computed = match payload.now {
        Some(now) => {
            compute_deadlines_at(payload.start_date, &payload.weekdays, &payload.lessons, now)
        }
        None => compute_deadlines(payload.start_date, &payload.weekdays, &payload.lessons),
    };
    let summary = ScheduleSummary::from_deadlines(&computed);
    let deadlines = computed
        .into_iter()
        .map(|deadline| DeadlineView {
            status: deadline.status().to_string(),
            deadline,
        })
        .collect();
    Json(DeadlinesResponse { deadlines, summary })
}

async fn progress(
    State(state): State<AppState>,
    Json(payload): Json<ProgressPayload>,
) -> Json<ProgressResponse> {
    let config = state.bonus_config();
    let stats = compute_progress(&payload.lesson, &payload.mastery_records);
    let bonuses = evaluate_attempt(
        &stats,
        &payload.recent_scores,
        payload.attempt_count,
        &config,
    );
    Json(ProgressResponse { stats, bonuses })
}

async fn bonus_for_milestone(
    State(state): State<AppState>,
    Json(payload): Json<MilestonePayload>,
) -> Json<BonusResponse> {
    let bonus = milestone_bonus(payload.milestone, &state.bonus_config());
    Json(BonusResponse { bonus })
}

async fn bonus_for_streak(
    State(state): State<AppState>,
    Json(payload): Json<StreakPayload>,
) -> Json<BonusResponse> {
    let bonus = streak_bonus(&payload.recent_scores, &state.bonus_config());
    Json(BonusResponse { bonus })
}

async fn bonus_for_first_time(
    State(state): State<AppState>,
    Json(payload): Json<FirstTimePayload>,
) -> impl IntoResponse {
    let coins = first_time_bonus(payload.attempt_count, &state.bonus_config());
    Json(json!({ "coins": coins }))
}

async fn get_metrics(State(state): State<AppState>) -> Result<Json<MetricsResponse>, ApiError> {
    let config = load_scoring_config(state.metric_store.as_ref(), state.side_channel.as_ref())?;
    Ok(Json(MetricsResponse::from(config)))
}

async fn update_metrics(
    State(state): State<AppState>,
    Json(config): Json<ScoringWeightConfig>,
) -> Result<Json<MetricsResponse>, ApiError> {
    save_scoring_config(
        state.metric_store.as_ref(),
        state.side_channel.as_ref(),
        &config,
    )?;
    let reloaded = load_scoring_config(state.metric_store.as_ref(), state.side_channel.as_ref())?;
    Ok(Json(MetricsResponse::from(reloaded)))
}

async fn get_bonus_config(State(state): State<AppState>) -> Json<BonusConfig> {
    Json(state.bonus_config())
}

async fn update_bonus_config(
    State(state): State<AppState>,
    Json(config): Json<BonusConfig>,
) -> Result<Json<BonusConfig>, ApiError> {
    if config.streak.threshold == 0 {
        return Err(ApiError::invalid("streak threshold must be at least 1"));
    }
    if !config.streak.min_score.is_finite() {
        return Err(ApiError::invalid("streak min_score must be a finite number"));
    }
    *state.bonus.write() = config.clone();
    Ok(Json(config))
}
