use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of speech metrics that feed the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricId {
    Volume,
    SpeechRate,
    Acceleration,
    ResponseTime,
    PauseManagement,
}

/// One row of the metric lookup table: how a metric is named on each side of
/// the persistence boundary, and what it defaults to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub persisted_name: &'static str,
    pub default_weight: u8,
    pub default_min: f64,
    pub default_ideal: f64,
    pub default_max: f64,
}

const VOLUME: MetricDescriptor = MetricDescriptor {
    key: "volume",
    label: "Volume",
    persisted_name: "volume",
    default_weight: 30,
    default_min: 55.0,
    default_ideal: 65.0,
    default_max: 80.0,
};

const SPEECH_RATE: MetricDescriptor = MetricDescriptor {
    key: "speechRate",
    label: "Speech Rate",
    persisted_name: "speech_rate",
    default_weight: 30,
    default_min: 110.0,
    default_ideal: 150.0,
    default_max: 190.0,
};

const ACCELERATION: MetricDescriptor = MetricDescriptor {
    key: "acceleration",
    label: "Acceleration",
    persisted_name: "end_intensity",
    default_weight: 15,
    default_min: -10.0,
    default_ideal: 5.0,
    default_max: 20.0,
};

const RESPONSE_TIME: MetricDescriptor = MetricDescriptor {
    key: "responseTime",
    label: "Response Time",
    persisted_name: "latency",
    default_weight: 10,
    default_min: 0.0,
    default_ideal: 800.0,
    default_max: 2000.0,
};

const PAUSE_MANAGEMENT: MetricDescriptor = MetricDescriptor {
    key: "pauseManagement",
    label: "Pause Management",
    persisted_name: "pauses",
    default_weight: 15,
    default_min: 0.0,
    default_ideal: 1.0,
    default_max: 2.5,
};

impl MetricId {
    pub const ALL: [MetricId; 5] = [
        MetricId::Volume,
        MetricId::SpeechRate,
        MetricId::Acceleration,
        MetricId::ResponseTime,
        MetricId::PauseManagement,
    ];

    pub fn descriptor(self) -> &'static MetricDescriptor {
        match self {
            MetricId::Volume => &VOLUME,
            MetricId::SpeechRate => &SPEECH_RATE,
            MetricId::Acceleration => &ACCELERATION,
            MetricId::ResponseTime => &RESPONSE_TIME,
            MetricId::PauseManagement => &PAUSE_MANAGEMENT,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.descriptor().key
    }

    pub fn persisted_name(self) -> &'static str {
        self.descriptor().persisted_name
    }

    pub fn from_persisted_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.persisted_name().eq_ignore_ascii_case(name))
    }

    pub fn from_key(key: &str) -> Option<Self> {
        let key = key.trim();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(key))
    }

    /// PauseManagement keeps its maximum in the second threshold column; the
    /// other metrics keep their ideal value there.
    fn stores_max_in_second_column(self) -> bool {
        matches!(self, MetricId::PauseManagement)
    }

    fn index(self) -> usize {
        match self {
            MetricId::Volume => 0,
            MetricId::SpeechRate => 1,
            MetricId::Acceleration => 2,
            MetricId::ResponseTime => 3,
            MetricId::PauseManagement => 4,
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor().label)
    }
}

impl FromStr for MetricId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s)
            .or_else(|| Self::from_persisted_name(s))
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

/// How speech rate is measured. Stored outside the metric rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionMethod {
    #[default]
    #[serde(rename = "energy-peaks")]
    EnergyPeaks,
    #[serde(rename = "transcript")]
    Transcript,
}

impl DetectionMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            DetectionMethod::EnergyPeaks => "energy-peaks",
            DetectionMethod::Transcript => "transcript",
        }
    }

    pub fn variants() -> &'static [(&'static str, &'static str)] {
        &[
            ("energy-peaks", "Count syllable energy peaks in the recording"),
            ("transcript", "Count words in the transcription"),
        ]
    }
}

impl FromStr for DetectionMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "energy-peaks" => Ok(DetectionMethod::EnergyPeaks),
            "transcript" => Ok(DetectionMethod::Transcript),
            _ => Err(format!("unknown detection method '{s}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSetting {
    pub metric: MetricId,
    /// 0-100 scale.
    pub weight: u8,
    pub enabled: bool,
    pub min_threshold: f64,
    pub ideal_threshold: f64,
    pub max_threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection_method: Option<DetectionMethod>,
}

impl MetricSetting {
    pub fn default_for(metric: MetricId) -> Self {
        let d = metric.descriptor();
        Self {
            metric,
            weight: d.default_weight,
            enabled: d.default_weight > 0,
            min_threshold: d.default_min,
            ideal_threshold: d.default_ideal,
            max_threshold: d.default_max,
            detection_method: (metric == MetricId::SpeechRate).then(DetectionMethod::default),
        }
    }

    /// Weight that actually counts: zero while disabled.
    pub fn effective_weight(&self) -> u8 {
        if self.enabled { self.weight } else { 0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightDistribution {
    pub total: u32,
    pub balanced: bool,
}

/// A complete weighted-scoring configuration: exactly one setting per metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<MetricSetting>", into = "Vec<MetricSetting>")]
pub struct ScoringWeightConfig {
    settings: [MetricSetting; 5],
}

impl Default for ScoringWeightConfig {
    fn default() -> Self {
        Self {
            settings: MetricId::ALL.map(MetricSetting::default_for),
        }
    }
}

impl ScoringWeightConfig {
    pub fn get(&self, metric: MetricId) -> &MetricSetting {
        &self.settings[metric.index()]
    }

    pub fn get_mut(&mut self, metric: MetricId) -> &mut MetricSetting {
        &mut self.settings[metric.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSetting> {
        self.settings.iter()
    }

    /// Sets the weight (clamped to 100) and re-derives `enabled` from it.
    pub fn set_weight(&mut self, metric: MetricId, weight: u8) {
        let setting = self.get_mut(metric);
        setting.weight = weight.min(100);
        setting.enabled = setting.weight > 0;
    }

    /// Enabling a metric whose weight is 0 restores its default weight, so an
    /// enabled metric always carries a non-zero weight.
    pub fn set_enabled(&mut self, metric: MetricId, enabled: bool) {
        let setting = self.get_mut(metric);
        if enabled && setting.weight == 0 {
            setting.weight = metric.descriptor().default_weight;
        }
        setting.enabled = enabled && setting.weight > 0;
    }

    pub fn detection_method(&self) -> Option<DetectionMethod> {
        self.get(MetricId::SpeechRate).detection_method
    }

    pub fn set_detection_method(&mut self, method: DetectionMethod) {
        self.get_mut(MetricId::SpeechRate).detection_method = Some(method);
    }

    /// Sum of enabled weights. Reported only; never rebalanced here.
    pub fn weight_distribution(&self) -> WeightDistribution {
        let total = self
            .settings
            .iter()
            .filter(|s| s.enabled)
            .map(|s| u32::from(s.weight))
            .sum();
        WeightDistribution {
            total,
            balanced: total == 100,
        }
    }
}

impl From<Vec<MetricSetting>> for ScoringWeightConfig {
    fn from(settings: Vec<MetricSetting>) -> Self {
        let mut config = Self::default();
        for mut setting in settings {
            setting.weight = setting.weight.min(100);
            setting.enabled = setting.enabled && setting.weight > 0;
            let metric = setting.metric;
            *config.get_mut(metric) = setting;
        }
        config
    }
}

impl From<ScoringWeightConfig> for Vec<MetricSetting> {
    fn from(config: ScoringWeightConfig) -> Self {
        config.settings.into()
    }
}

/// A metric row as the external store keeps it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedMetricRow {
    pub metric_name: String,
    /// 0.0-1.0 scale.
    pub weight: f64,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PersistedMetricRow {
    pub fn new(metric_name: impl Into<String>, weight: f64) -> Self {
        Self {
            metric_name: metric_name.into(),
            weight,
            min_value: None,
            max_value: None,
            updated_at: None,
        }
    }
}

/// Resolve sparse persisted rows into a full configuration.
///
/// Missing metrics get their defaults, unknown metric names are ignored and
/// non-finite numbers read as 0. `detection_method` is the raw side-channel
/// value for speech rate.
pub fn load_config(
    rows: &[PersistedMetricRow],
    detection_method: Option<&str>,
) -> ScoringWeightConfig {
    let mut config = ScoringWeightConfig::default();
    let mut seen = [false; 5];

    for row in rows {
        let Some(metric) = MetricId::from_persisted_name(&row.metric_name) else {
            tracing::debug!(metric_name = %row.metric_name, "ignoring unknown metric row");
            continue;
        };
        if seen[metric.index()] {
            tracing::warn!(metric_name = %row.metric_name, "duplicate metric row ignored");
            continue;
        }
        seen[metric.index()] = true;
        *config.get_mut(metric) = setting_from_row(metric, row);
    }

    let method = detection_method
        .and_then(|raw| match raw.parse::<DetectionMethod>() {
            Ok(method) => Some(method),
            Err(error) => {
                tracing::debug!(%error, "using default detection method");
                None
            }
        })
        .unwrap_or_default();
    config.set_detection_method(method);
    config
}

fn setting_from_row(metric: MetricId, row: &PersistedMetricRow) -> MetricSetting {
    let mut setting = MetricSetting::default_for(metric);
    setting.weight = fraction_to_percent(row.weight);
    setting.enabled = setting.weight > 0;
    if let Some(min) = row.min_value {
        setting.min_threshold = finite_or_zero(min);
    }
    if let Some(second) = row.max_value {
        let second = finite_or_zero(second);
        if metric.stores_max_in_second_column() {
            setting.max_threshold = second;
        } else {
            setting.ideal_threshold = second;
        }
    }
    setting
}

/// Inverse of [`load_config`]. `updated_at` is left for the store to stamp and
/// the detection method is not part of the rows.
pub fn to_persisted_rows(config: &ScoringWeightConfig) -> Vec<PersistedMetricRow> {
    config
        .iter()
        .map(|setting| {
            let second = if setting.metric.stores_max_in_second_column() {
                setting.max_threshold
            } else {
                setting.ideal_threshold
            };
            PersistedMetricRow {
                metric_name: setting.metric.persisted_name().to_string(),
                weight: f64::from(setting.effective_weight()) / 100.0,
                min_value: Some(finite_or_zero(setting.min_threshold)),
                max_value: Some(finite_or_zero(second)),
                updated_at: None,
            }
        })
        .collect()
}

fn fraction_to_percent(weight: f64) -> u8 {
    (finite_or_zero(weight) * 100.0).round().clamp(0.0, 100.0) as u8
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_table_is_bidirectional() {
        for id in MetricId::ALL {
            assert_eq!(MetricId::from_persisted_name(id.persisted_name()), Some(id));
            assert_eq!(MetricId::from_key(id.as_str()), Some(id));
            assert_eq!(MetricId::ALL[id.index()], id);
        }
    }

    #[test]
    fn fraction_conversion_clamps_and_coerces() {
        assert_eq!(fraction_to_percent(0.456), 46);
        assert_eq!(fraction_to_percent(1.7), 100);
        assert_eq!(fraction_to_percent(-0.2), 0);
        assert_eq!(fraction_to_percent(f64::NAN), 0);
    }
}
