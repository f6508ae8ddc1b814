use chrono::{Days, Local, NaiveDate, NaiveTime};
use lesson_engine::persistence::{
    load_metric_rows_from_csv, save_deadlines_to_csv, save_deadlines_to_json,
    save_metric_rows_to_csv,
};
use lesson_engine::{
    BonusConfig, Deadline, DetectionMethod, EngineConfig, JsonFileSideChannel, LessonContent,
    LessonRef, MasteryRecord, MetricId, ScheduleSummary, ScoringWeightConfig, SqliteMetricStore,
    compute_deadlines_at, compute_progress, first_time_bonus, load_config, load_scoring_config,
    logging, milestone_bonus, save_scoring_config, streak_bonus, to_persisted_rows,
};
use lesson_engine::progress::ContentCategory;
use std::io::{self, Write};

struct Session {
    start_date: NaiveDate,
    weekdays: Vec<String>,
    lessons: Vec<LessonRef>,
    bonus: BonusConfig,
    metrics: ScoringWeightConfig,
}

impl Session {
    fn new(bonus: BonusConfig) -> Self {
        Self {
            start_date: Local::now().date_naive(),
            weekdays: Vec::new(),
            lessons: Vec::new(),
            bonus,
            metrics: ScoringWeightConfig::default(),
        }
    }

    fn deadlines(&self, today: Option<NaiveDate>) -> Vec<Deadline> {
        let now = match today {
            Some(date) => date.and_time(NaiveTime::MIN),
            None => Local::now().naive_local(),
        };
        compute_deadlines_at(self.start_date, &self.weekdays, &self.lessons, now)
    }
}

fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (ci, cell) in row.iter().enumerate() {
            if ci < widths.len() && cell.chars().count() > widths[ci] {
                widths[ci] = cell.chars().count();
            }
        }
    }

    let mut sep = String::new();
    sep.push('+');
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    push_row(&mut out, headers.iter().map(|h| h.to_string()), &widths);
    out.push_str(&sep);
    out.push('\n');
    for row in rows {
        push_row(&mut out, row.iter().cloned(), &widths);
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn push_row<I>(out: &mut String, cells: I, widths: &[usize])
where
    I: Iterator<Item = String>,
{
    out.push('|');
    for (cell, width) in cells.zip(widths) {
        out.push(' ');
        let pad = width.saturating_sub(cell.chars().count());
        out.push_str(&cell);
        out.push_str(&" ".repeat(pad));
        out.push(' ');
        out.push('|');
    }
    out.push('\n');
}

fn render_deadlines(deadlines: &[Deadline]) -> String {
    let rows: Vec<Vec<String>> = deadlines
        .iter()
        .map(|d| {
            vec![
                d.order_index.to_string(),
                d.lesson_id.clone(),
                d.lesson_name.clone(),
                d.due_date.to_string(),
                d.status().to_string(),
            ]
        })
        .collect();
    render_table(&["order", "id", "name", "due", "status"], &rows)
}

fn render_metrics(config: &ScoringWeightConfig) -> String {
    let rows: Vec<Vec<String>> = config
        .iter()
        .map(|s| {
            vec![
                s.metric.as_str().to_string(),
                s.weight.to_string(),
                s.enabled.to_string(),
                s.min_threshold.to_string(),
                s.ideal_threshold.to_string(),
                s.max_threshold.to_string(),
                s.detection_method
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect();
    let distribution = config.weight_distribution();
    let balance = if distribution.balanced {
        "balanced".to_string()
    } else {
        "NOT balanced (expected 100)".to_string()
    };
    format!(
        "{}Total enabled weight: {} ({})",
        render_table(
            &["metric", "weight", "enabled", "min", "ideal", "max", "method"],
            &rows
        ),
        distribution.total,
        balance
    )
}

fn parse_date(input: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()
}

fn parse_scores(input: &str) -> Option<Vec<f64>> {
    input
        .split(',')
        .filter(|p| !p.trim().is_empty())
        .map(|p| p.trim().parse::<f64>().ok())
        .collect()
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  start <YYYY-MM-DD>                 Set the enrollment start date\n  days [weekday ...]                 Set lesson weekdays (none = every day)\n  lesson <id> <order> <name...>      Add or replace a lesson\n  remove <id>                        Remove a lesson\n  deadlines [YYYY-MM-DD]             Show due dates (optionally as of a date)\n  export <json|csv> <path> [date]    Write computed deadlines to disk\n  progress <total_items> <levels_csv>\n                                     Progress from mastery levels (e.g. 3,4,1)\n  milestone <percent>                Show the bonus for a milestone\n  streak <scores_csv>                Streak bonus for recent scores (oldest first)\n  first <attempt_count>              First-attempt bonus\n  metrics show                       Show scoring weights\n  metrics weight <metric> <0-100>    Set a metric weight\n  metrics enable|disable <metric>    Toggle a metric\n  metrics method <name>              Set speech rate detection method\n  metrics save <db_path> <side_json> Persist weights to sqlite + side channel\n  metrics load <db_path> <side_json> Load weights from sqlite + side channel\n  metrics csv save|load <path>       Export/import metric rows as CSV\n  config load <json_path>            Load engine config (bonus amounts)\n  quit|exit                          Exit"
    );
}

fn handle_metrics(session: &mut Session, args: &[&str]) {
    match args {
        ["show"] | [] => println!("{}", render_metrics(&session.metrics)),
        ["weight", metric, value] => {
            let Ok(metric) = metric.parse::<MetricId>() else {
                println!("Unknown metric '{metric}'");
                return;
            };
            match value.parse::<u8>() {
                Ok(weight) if weight <= 100 => {
                    session.metrics.set_weight(metric, weight);
                    println!("{}", render_metrics(&session.metrics));
                }
                _ => println!("Weight must be an integer between 0 and 100"),
            }
        }
        [toggle @ ("enable" | "disable"), metric] => {
            let Ok(metric) = metric.parse::<MetricId>() else {
                println!("Unknown metric '{metric}'");
                return;
            };
            session.metrics.set_enabled(metric, *toggle == "enable");
            println!("{}", render_metrics(&session.metrics));
        }
        ["method", name] => match name.parse::<DetectionMethod>() {
            Ok(method) => {
                session.metrics.set_detection_method(method);
                println!("Detection method set to {}.", method.as_str());
            }
            Err(_) => {
                println!("Unknown detection method '{name}'. Available:");
                for (key, description) in DetectionMethod::variants() {
                    println!("  {:<16} {}", key, description);
                }
            }
        },
        ["save", db_path, side_path] => {
            let result = SqliteMetricStore::new(db_path).and_then(|store| {
                let side = JsonFileSideChannel::new(side_path);
                save_scoring_config(&store, &side, &session.metrics)
            });
            match result {
                Ok(()) => println!("Metrics saved to {db_path}."),
                Err(e) => println!("Error saving metrics: {e}"),
            }
        }
        ["load", db_path, side_path] => {
            let result = SqliteMetricStore::new(db_path).and_then(|store| {
                let side = JsonFileSideChannel::new(side_path);
                load_scoring_config(&store, &side)
            });
            match result {
                Ok(config) => {
                    session.metrics = config;
                    println!("Metrics loaded from {db_path}.");
                    println!("{}", render_metrics(&session.metrics));
                }
                Err(e) => println!("Error loading metrics: {e}"),
            }
        }
        ["csv", "save", path] => {
            match save_metric_rows_to_csv(&to_persisted_rows(&session.metrics), path) {
                Ok(()) => println!("Metric rows written to {path}."),
                Err(e) => println!("Error writing CSV: {e}"),
            }
        }
        ["csv", "load", path] => match load_metric_rows_from_csv(path) {
            Ok(rows) => {
                let method = session.metrics.detection_method().map(|m| m.as_str());
                session.metrics = load_config(&rows, method);
                println!("Metric rows loaded from {path}.");
                println!("{}", render_metrics(&session.metrics));
            }
            Err(e) => println!("Error reading CSV: {e}"),
        },
        _ => println!("Usage: metrics show|weight|enable|disable|method|save|load|csv (see help)"),
    }
}

fn main() {
    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}; using defaults");
            EngineConfig::default()
        }
    };
    logging::init_tracing(&config.log_level);

    let mut session = Session::new(config.bonus);
    println!("Lesson Engine (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let (cmd, args) = (parts[0], &parts[1..]);

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "start" => match args.first().and_then(|s| parse_date(s)) {
                Some(date) => {
                    session.start_date = date;
                    println!("Start date set to {date}.");
                }
                None => println!("Usage: start <YYYY-MM-DD>"),
            },
            "days" => {
                session.weekdays = args.iter().map(|s| s.to_string()).collect();
                let calendar = lesson_engine::LessonCalendar::from_tokens(&session.weekdays);
                if calendar.is_daily() {
                    println!("Lessons due every day.");
                } else {
                    let names: Vec<String> =
                        calendar.weekdays().iter().map(|d| d.to_string()).collect();
                    println!("Lesson days: {}", names.join(", "));
                }
                let week_end = session
                    .start_date
                    .checked_add_days(Days::new(6))
                    .unwrap_or(NaiveDate::MAX);
                let preview: Vec<String> = calendar
                    .lesson_days_in_range(session.start_date, week_end)
                    .iter()
                    .map(|date| date.format("%a %b %-d").to_string())
                    .collect();
                println!("First week: {}", preview.join(", "));
            }
            "lesson" => match args {
                [id, order, name @ ..] if !name.is_empty() => match order.parse::<i64>() {
                    Ok(order) => {
                        session.lessons.retain(|l| l.id != *id);
                        session
                            .lessons
                            .push(LessonRef::new(*id, name.join(" "), order));
                        println!("Lesson {id} saved.");
                    }
                    Err(_) => println!("Invalid order index"),
                },
                _ => println!("Usage: lesson <id> <order> <name...>"),
            },
            "remove" => match args.first() {
                Some(id) => {
                    let before = session.lessons.len();
                    session.lessons.retain(|l| l.id != *id);
                    if session.lessons.len() < before {
                        println!("Removed lesson {id}.");
                    } else {
                        println!("Lesson {id} not found.");
                    }
                }
                None => println!("Usage: remove <id>"),
            },
            "deadlines" => {
                let today = match args.first() {
                    Some(s) => match parse_date(s) {
                        Some(date) => Some(date),
                        None => {
                            println!("Invalid date (YYYY-MM-DD)");
                            continue;
                        }
                    },
                    None => None,
                };
                let deadlines = session.deadlines(today);
                let summary = ScheduleSummary::from_deadlines(&deadlines);
                println!("Schedule ({})", summary.to_cli_summary());
                println!("{}", render_deadlines(&deadlines));
            }
            "export" => match args {
                [format @ ("json" | "csv"), path, rest @ ..] => {
                    let today = rest.first().and_then(|s| parse_date(s));
                    let deadlines = session.deadlines(today);
                    let result = if *format == "json" {
                        save_deadlines_to_json(&deadlines, path)
                    } else {
                        save_deadlines_to_csv(&deadlines, path)
                    };
                    match result {
                        Ok(()) => println!("Deadlines written to {path}."),
                        Err(e) => println!("Error exporting deadlines: {e}"),
                    }
                }
                _ => println!("Usage: export <json|csv> <path> [YYYY-MM-DD]"),
            },
            "progress" => match args {
                [total, levels] => {
                    let total: u32 = match total.parse() {
                        Ok(v) => v,
                        Err(_) => {
                            println!("Invalid total_items");
                            continue;
                        }
                    };
                    let levels: Option<Vec<i32>> = levels
                        .split(',')
                        .filter(|p| !p.trim().is_empty())
                        .map(|p| p.trim().parse().ok())
                        .collect();
                    let Some(levels) = levels else {
                        println!("Invalid mastery levels");
                        continue;
                    };
                    let lesson =
                        LessonContent::new("cli", vec![ContentCategory::new("items", total)]);
                    let records: Vec<MasteryRecord> = levels
                        .iter()
                        .enumerate()
                        .map(|(idx, level)| MasteryRecord::new(format!("item-{idx}"), *level))
                        .collect();
                    let stats = compute_progress(&lesson, &records);
                    println!(
                        "Completed {}/{} ({}%, was {}%)",
                        stats.completed_items,
                        stats.total_items,
                        stats.completion_percent,
                        stats.previous_percent
                    );
                    match stats
                        .milestone_achieved
                        .and_then(|m| milestone_bonus(m.percent(), &session.bonus))
                    {
                        Some(event) => {
                            println!("Milestone: {} (+{} coins)", event.label(), event.coins())
                        }
                        None => println!("No milestone reached."),
                    }
                }
                _ => println!("Usage: progress <total_items> <levels_csv>"),
            },
            "milestone" => match args.first().and_then(|s| s.parse::<u32>().ok()) {
                Some(pct) => match milestone_bonus(pct, &session.bonus) {
                    Some(event) => println!("{} (+{} coins)", event.label(), event.coins()),
                    None => println!("{pct} is not a milestone."),
                },
                None => println!("Usage: milestone <percent>"),
            },
            "streak" => match args.first().and_then(|s| parse_scores(s)) {
                Some(scores) => match streak_bonus(&scores, &session.bonus) {
                    Some(event) => {
                        println!("Streak bonus: {} (+{} coins)", event.label(), event.coins())
                    }
                    None => println!("No streak bonus."),
                },
                None => println!("Usage: streak <scores_csv>"),
            },
            "first" => match args.first().and_then(|s| s.parse::<u32>().ok()) {
                Some(count) => println!(
                    "First-attempt bonus: {} coins",
                    first_time_bonus(count, &session.bonus)
                ),
                None => println!("Usage: first <attempt_count>"),
            },
            "metrics" => handle_metrics(&mut session, args),
            "config" => match args {
                ["load", path] => match EngineConfig::from_json_file(path) {
                    Ok(loaded) => {
                        session.bonus = loaded.bonus;
                        println!("Config loaded from {path}.");
                    }
                    Err(e) => println!("Error loading config: {e}"),
                },
                _ => println!("Usage: config load <json_path>"),
            },
            _ => println!("Unknown command '{cmd}'. Type 'help'."),
        }
    }
}
