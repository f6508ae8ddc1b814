use lesson_engine::{
    ContentCategory, LessonContent, MasteryRecord, Milestone, compute_progress,
    compute_progress_between,
};

fn lesson(counts: &[u32]) -> LessonContent {
    LessonContent::new(
        "lesson-1",
        counts
            .iter()
            .enumerate()
            .map(|(i, n)| ContentCategory::new(format!("cat-{i}"), *n))
            .collect(),
    )
}

fn records(levels: &[i32]) -> Vec<MasteryRecord> {
    levels
        .iter()
        .enumerate()
        .map(|(i, level)| MasteryRecord::new(format!("item-{i}"), *level))
        .collect()
}

#[test]
fn total_items_sums_categories() {
    assert_eq!(lesson(&[3, 0, 5]).total_items(), 8);
    let missing = LessonContent {
        lesson_id: "empty".into(),
        categories: None,
    };
    assert_eq!(missing.total_items(), 0);
}

#[test]
fn oversized_category_counts_saturate() {
    let huge = lesson(&[u32::MAX, 10]);
    assert_eq!(huge.total_items(), u32::MAX);
    let stats = compute_progress(&huge, &records(&[3, 4]));
    assert_eq!(stats.completed_items, 2);
    assert_eq!(stats.completion_percent, 0);
}

#[test]
fn only_mastery_three_and_above_counts_as_completed() {
    let stats = compute_progress(&lesson(&[10]), &records(&[0, 1, 2, 3, 4, 5]));
    assert_eq!(stats.completed_items, 3);
    assert_eq!(stats.completion_percent, 30);
    assert_eq!(stats.previous_percent, 20);
    assert_eq!(stats.milestone_achieved, Some(Milestone::Quarter));
}

#[test]
fn zero_items_yields_zero_progress() {
    let stats = compute_progress(&lesson(&[]), &records(&[5, 5]));
    assert_eq!(stats.total_items, 0);
    assert_eq!(stats.completion_percent, 0);
    assert_eq!(stats.previous_percent, 0);
    assert_eq!(stats.milestone_achieved, None);
}

#[test]
fn first_newly_crossed_threshold_is_reported() {
    // 4 items, 2 -> 3 completed is 50% -> 75%
    let stats = compute_progress(&lesson(&[4]), &records(&[3, 4, 5, 1]));
    assert_eq!(stats.completion_percent, 75);
    assert_eq!(stats.previous_percent, 50);
    assert_eq!(stats.milestone_achieved, Some(Milestone::ThreeQuarters));
}

#[test]
fn staying_inside_a_band_does_not_fire() {
    // 10 items: 3 -> 4 completed is 30% -> 40%
    let stats = compute_progress(&lesson(&[10]), &records(&[3, 3, 3, 3]));
    assert_eq!(stats.milestone_achieved, None);
}

#[test]
fn no_completions_has_no_milestone() {
    let stats = compute_progress(&lesson(&[4]), &records(&[0, 1]));
    assert_eq!(stats.completed_items, 0);
    assert_eq!(stats.previous_percent, 0);
    assert_eq!(stats.milestone_achieved, None);
}

#[test]
fn single_item_lesson_completes_in_one_step() {
    let stats = compute_progress(&lesson(&[1]), &records(&[3]));
    assert_eq!(stats.completion_percent, 100);
    assert_eq!(stats.previous_percent, 0);
    // Lowest crossed threshold wins
    assert_eq!(stats.milestone_achieved, Some(Milestone::Quarter));
}

#[test]
fn explicit_counts_report_lowest_crossed_milestone() {
    let stats = compute_progress_between(8, 1, 6);
    assert_eq!(stats.previous_percent, 13);
    assert_eq!(stats.completion_percent, 75);
    assert_eq!(stats.milestone_achieved, Some(Milestone::Quarter));

    let stats = compute_progress_between(8, 2, 6);
    assert_eq!(stats.milestone_achieved, Some(Milestone::Half));
}

#[test]
fn completion_reaches_one_hundred() {
    let stats = compute_progress_between(4, 3, 4);
    assert_eq!(stats.completion_percent, 100);
    assert_eq!(stats.milestone_achieved, Some(Milestone::Complete));
}
