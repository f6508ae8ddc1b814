use chrono::NaiveDate;
use lesson_engine::persistence::{
    load_metric_rows_from_csv, save_deadlines_to_csv, save_deadlines_to_json,
    save_metric_rows_to_csv,
};
use lesson_engine::{
    Deadline, JsonFileSideChannel, LessonRef, MemoryMetricStore, MemorySideChannel, MetricId,
    MetricStore, PersistenceError, ScoringWeightConfig, SideChannelStore, compute_deadlines_at,
    load_config, load_scoring_config, save_scoring_config, to_persisted_rows,
};
use std::io::Write;
use tempfile::{NamedTempFile, tempdir};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_deadlines() -> Vec<Deadline> {
    let lessons = vec![
        LessonRef::new("greetings", "Greetings", 1),
        LessonRef::new("numbers", "Numbers", 2),
    ];
    compute_deadlines_at(
        d(2025, 1, 6),
        ["monday", "thursday"],
        &lessons,
        d(2025, 1, 6).and_hms_opt(9, 0, 0).unwrap(),
    )
}

#[test]
fn metric_rows_csv_round_trip() {
    let mut config = ScoringWeightConfig::default();
    config.set_weight(MetricId::ResponseTime, 12);
    let rows = to_persisted_rows(&config);
    let file = NamedTempFile::new().unwrap();

    save_metric_rows_to_csv(&rows, file.path()).unwrap();
    let loaded = load_metric_rows_from_csv(file.path()).unwrap();

    assert_eq!(loaded, rows);
    assert_eq!(load_config(&loaded, None), config);
}

#[test]
fn csv_with_blank_thresholds_loads_as_missing() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "metric_name,weight,min_value,max_value,updated_at").unwrap();
    writeln!(file, "latency,0.25,,,2025-01-06T10:00:00Z").unwrap();
    file.flush().unwrap();

    let rows = load_metric_rows_from_csv(file.path()).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].min_value, None);
    assert!(rows[0].updated_at.is_some());
    let config = load_config(&rows, None);
    assert_eq!(config.get(MetricId::ResponseTime).weight, 25);
    assert_eq!(config.get(MetricId::ResponseTime).ideal_threshold, 800.0);
}

#[test]
fn csv_with_bad_number_is_invalid_data() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "metric_name,weight,min_value,max_value,updated_at").unwrap();
    writeln!(file, "volume,0.3,loud,,").unwrap();
    file.flush().unwrap();

    let err = load_metric_rows_from_csv(file.path()).unwrap_err();
    assert!(matches!(err, PersistenceError::InvalidData(_)));
}

#[test]
fn deadlines_export_to_json_and_csv() {
    let deadlines = sample_deadlines();
    let dir = tempdir().unwrap();

    let json_path = dir.path().join("deadlines.json");
    save_deadlines_to_json(&deadlines, &json_path).unwrap();
    let text = std::fs::read_to_string(&json_path).unwrap();
    let parsed: Vec<Deadline> = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, deadlines);

    let csv_path = dir.path().join("deadlines.csv");
    save_deadlines_to_csv(&deadlines, &csv_path).unwrap();
    let csv_text = std::fs::read_to_string(&csv_path).unwrap();
    let mut lines = csv_text.lines();
    assert_eq!(
        lines.next(),
        Some("lesson_id,lesson_name,order_index,due_date,status,is_past,is_due_today,days_remaining")
    );
    assert_eq!(
        lines.next(),
        Some("greetings,Greetings,1,2025-01-06,Due Today,false,true,0")
    );
    assert_eq!(
        lines.next(),
        Some("numbers,Numbers,2,2025-01-09,\"Thu, Jan 9, 2025\",false,false,3")
    );
}

#[test]
fn json_side_channel_persists_between_handles() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("side.json");

    let first = JsonFileSideChannel::new(&path);
    assert_eq!(first.get("missing").unwrap(), None);
    first.set("a", "1").unwrap();
    first.set("b", "2").unwrap();

    let second = JsonFileSideChannel::new(&path);
    assert_eq!(second.get("a").unwrap().as_deref(), Some("1"));
    second.set("a", "3").unwrap();
    assert_eq!(first.get("a").unwrap().as_deref(), Some("3"));
    assert_eq!(first.get("b").unwrap().as_deref(), Some("2"));
}

#[test]
fn corrupt_side_channel_surfaces_serialization_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();
    file.flush().unwrap();

    let side = JsonFileSideChannel::new(file.path());
    let store = MemoryMetricStore::new();
    let err = load_scoring_config(&store, &side).unwrap_err();
    assert!(matches!(err, PersistenceError::Serialization(_)));
}

#[test]
fn memory_store_round_trip_keeps_every_metric() {
    let store = MemoryMetricStore::new();
    let side = MemorySideChannel::new();
    let mut config = ScoringWeightConfig::default();
    config.set_weight(MetricId::PauseManagement, 5);

    save_scoring_config(&store, &side, &config).unwrap();
    let rows = store.load_metric_rows().unwrap();
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.updated_at.is_some()));
    assert_eq!(load_scoring_config(&store, &side).unwrap(), config);
}
