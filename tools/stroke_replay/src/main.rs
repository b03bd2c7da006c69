use std::{
    env,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
    process,
};

use digitink::{EngineAction, EngineProfile, Point, StrokeEngine};

#[derive(Clone, Copy)]
enum TraceKind {
    Down,
    Move,
    Up,
    Cancel,
    Poll,
}

#[derive(Clone, Copy)]
struct TraceSample {
    ms: u64,
    kind: TraceKind,
    point: Point,
}

struct ReplayedAction {
    ms: u64,
    action: EngineAction,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let mut trace_path: Option<PathBuf> = None;
    let mut expect_path: Option<PathBuf> = None;
    let mut calibrate = false;
    let mut relaxed = false;

    let mut idx = 1usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--expect" => {
                idx += 1;
                let Some(path) = args.get(idx) else {
                    return Err("missing path after --expect".into());
                };
                expect_path = Some(PathBuf::from(path));
            }
            "--calibrate" => calibrate = true,
            "--relaxed" => relaxed = true,
            "-h" | "--help" => {
                println!("{}", usage());
                return Ok(());
            }
            value if value.starts_with('-') => {
                return Err(format!("unknown argument: {value}"));
            }
            value => {
                if trace_path.is_some() {
                    return Err("multiple trace paths provided".into());
                }
                trace_path = Some(PathBuf::from(value));
            }
        }
        idx += 1;
    }

    let trace_path = trace_path.ok_or_else(usage)?;
    let samples = parse_trace(&trace_path)?;

    let profile = if relaxed {
        EngineProfile::RELAXED
    } else {
        EngineProfile::INTERACTIVE
    };
    let mut engine = StrokeEngine::new(
        profile,
        digitink::TemplateBank::builtin(),
        Box::new(digitink::TemplateMatcher),
    );
    let mut actions: Vec<ReplayedAction> = Vec::new();

    if calibrate {
        collect(engine.begin_calibration(), 0, &mut actions);
    }

    let mut last_ms = 0u64;
    for sample in &samples {
        last_ms = sample.ms;
        let output = match sample.kind {
            TraceKind::Down => engine.on_start(sample.ms, sample.point),
            TraceKind::Move => engine.on_move(sample.ms, sample.point),
            TraceKind::Up => engine.on_end(sample.ms),
            TraceKind::Cancel => engine.on_cancel(sample.ms),
            TraceKind::Poll => engine.poll(sample.ms),
        };
        collect(output, sample.ms, &mut actions);
    }

    // Captured traces usually stop at the last contact; run the clock past
    // the inactivity window so the final glyph commits, then once more so a
    // deferred submit can land.
    let flush_ms = last_ms.saturating_add(profile.commit_delay_ms);
    collect(engine.poll(flush_ms), flush_ms, &mut actions);
    collect(engine.poll(flush_ms + 10), flush_ms + 10, &mut actions);

    println!("action,ms,kind,digit,score,sample");
    for replayed in &actions {
        let (digit, score, sample) = action_detail(&replayed.action);
        println!(
            "action,{},{},{},{},{}",
            replayed.ms,
            kind_label(&replayed.action),
            digit,
            score,
            sample
        );
    }

    if let Some(expect_path) = expect_path {
        let expected = parse_expected_kinds(&expect_path)?;
        let actual: Vec<&'static str> = actions.iter().map(|r| kind_label(&r.action)).collect();
        if actual != expected {
            eprintln!("expected kinds: {}", expected.join(","));
            eprintln!("actual kinds:   {}", actual.join(","));
            return Err("action sequence mismatch".into());
        }
    }

    Ok(())
}

fn usage() -> String {
    "usage: stroke_replay <trace.csv> [--expect expected_kinds.txt] [--calibrate] [--relaxed]"
        .to_string()
}

fn collect(output: digitink::EngineOutput, ms: u64, out: &mut Vec<ReplayedAction>) {
    for action in output.actions.into_iter().flatten() {
        out.push(ReplayedAction { ms, action });
    }
}

fn parse_trace(path: &Path) -> Result<Vec<TraceSample>, String> {
    let file = File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;
    let reader = BufReader::new(file);

    let mut out: Vec<TraceSample> = Vec::new();
    for (line_no, line_result) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line_result
            .map_err(|e| format!("failed to read {}:{}: {e}", path.display(), line_no))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if trimmed == "stroke_trace,ms,kind,x,y" {
            continue;
        }

        let parts: Vec<&str> = trimmed.split(',').collect();
        if parts.len() < 3 {
            return Err(format!(
                "{}:{} invalid trace line, expected at least 3 columns",
                path.display(),
                line_no
            ));
        }
        if parts[0].trim() != "stroke_trace" {
            continue;
        }

        let ms = parse_u64(parts[1], path, line_no, "ms")?;
        let kind = match parts[2].trim().to_ascii_lowercase().as_str() {
            "down" => TraceKind::Down,
            "move" => TraceKind::Move,
            "up" => TraceKind::Up,
            "cancel" => TraceKind::Cancel,
            "poll" => TraceKind::Poll,
            other => {
                return Err(format!(
                    "{}:{} invalid trace kind: {}",
                    path.display(),
                    line_no,
                    other
                ));
            }
        };

        let point = match kind {
            TraceKind::Down | TraceKind::Move => {
                if parts.len() < 5 {
                    return Err(format!(
                        "{}:{} contact line needs x and y columns",
                        path.display(),
                        line_no
                    ));
                }
                Point::new(
                    parse_f32(parts[3], path, line_no, "x")?,
                    parse_f32(parts[4], path, line_no, "y")?,
                )
            }
            _ => Point::default(),
        };

        out.push(TraceSample { ms, kind, point });
    }

    Ok(out)
}

fn parse_expected_kinds(path: &Path) -> Result<Vec<&'static str>, String> {
    let file = File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;
    let reader = BufReader::new(file);

    let mut kinds = Vec::new();
    for (line_no, line_result) in reader.lines().enumerate() {
        let line_no = line_no + 1;
        let line = line_result
            .map_err(|e| format!("failed to read {}:{}: {e}", path.display(), line_no))?;
        let token = line.trim();
        if token.is_empty() || token.starts_with('#') {
            continue;
        }

        let normalized = normalize_kind(token).ok_or_else(|| {
            format!(
                "{}:{} invalid expected action kind: {}",
                path.display(),
                line_no,
                token
            )
        })?;
        kinds.push(normalized);
    }

    Ok(kinds)
}

fn normalize_kind(kind: &str) -> Option<&'static str> {
    match kind.trim().to_ascii_lowercase().as_str() {
        "first_input" => Some("first_input"),
        "append" => Some("append"),
        "submit" => Some("submit"),
        "sample_stored" => Some("sample_stored"),
        "digit_advanced" => Some("digit_advanced"),
        "calibration_finished" => Some("calibration_finished"),
        _ => None,
    }
}

fn kind_label(action: &EngineAction) -> &'static str {
    match action {
        EngineAction::FirstInput => "first_input",
        EngineAction::AppendDigit { .. } => "append",
        EngineAction::SubmitAnswer => "submit",
        EngineAction::SampleStored { .. } => "sample_stored",
        EngineAction::DigitAdvanced { .. } => "digit_advanced",
        EngineAction::CalibrationFinished => "calibration_finished",
    }
}

fn action_detail(action: &EngineAction) -> (String, String, String) {
    match action {
        EngineAction::AppendDigit { digit, score } => {
            (digit.to_string(), format!("{score:.3}"), "-".to_string())
        }
        EngineAction::SampleStored { digit, sample } => {
            (digit.to_string(), "-".to_string(), sample.to_string())
        }
        EngineAction::DigitAdvanced { digit } => {
            (digit.to_string(), "-".to_string(), "-".to_string())
        }
        _ => ("-".to_string(), "-".to_string(), "-".to_string()),
    }
}

fn parse_u64(raw: &str, path: &Path, line_no: usize, field: &str) -> Result<u64, String> {
    raw.trim().parse::<u64>().map_err(|e| {
        format!(
            "{}:{} invalid {} '{}': {}",
            path.display(),
            line_no,
            field,
            raw.trim(),
            e
        )
    })
}

fn parse_f32(raw: &str, path: &Path, line_no: usize, field: &str) -> Result<f32, String> {
    raw.trim().parse::<f32>().map_err(|e| {
        format!(
            "{}:{} invalid {} '{}': {}",
            path.display(),
            line_no,
            field,
            raw.trim(),
            e
        )
    })
}
