//! JSONL リプレイ駆動のフォーム解析
//!
//! 1 行 = 1 フレーム (33 ランドマークの JSON 配列) を順に流し込み、
//! レップ確定とフォーム指摘をログに書き、最後にサマリ JSON を出す。

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use formly_engine::config::EngineConfig;
use formly_engine::feedback::FeedbackKind;
use formly_engine::pose::Landmark;
use formly_engine::trainer;

const CONFIG_PATH: &str = "config.toml";

type LogFile = Arc<Mutex<std::io::BufWriter<std::fs::File>>>;

fn open_log_file(dir: &str) -> Result<LogFile> {
    std::fs::create_dir_all(dir)?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("{}/replay_{}.log", dir, ts);
    let file = std::fs::File::create(&path)?;
    eprintln!("Log: {}", path);
    Ok(Arc::new(Mutex::new(std::io::BufWriter::new(file))))
}

macro_rules! log {
    ($logfile:expr, $($arg:tt)*) => {{
        let msg = format!($($arg)*);
        eprintln!("{}", msg);
        if let Ok(mut f) = $logfile.lock() {
            let _ = writeln!(f, "{}", msg);
            let _ = f.flush();
        }
    }};
}

fn main() -> Result<()> {
    let config = EngineConfig::load_or_default(CONFIG_PATH)?;
    let logfile = open_log_file(&config.replay.log_dir)?;
    log!(logfile, "Formly Engine v{}", env!("CARGO_PKG_VERSION"));

    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config.replay.input.clone());
    let mut trainer = trainer::create(&config.session.exercise, config.session.mode);
    log!(
        logfile,
        "[session] exercise={} mode={} input={}",
        trainer.exercise().as_str(),
        trainer.mode().as_str(),
        input
    );

    let file = std::fs::File::open(&input).with_context(|| format!("failed to open {}", input))?;
    let reader = std::io::BufReader::new(file);

    let mut frame_no: usize = 0;
    let mut last_kind = FeedbackKind::None;
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        frame_no += 1;
        let landmarks: Vec<Landmark> = serde_json::from_str(line)
            .with_context(|| format!("bad landmark frame at line {}", frame_no))?;
        let result = trainer.analyze(&landmarks);

        if let Some(rep) = &result.rep {
            log!(
                logfile,
                "[rep] #{} {} depth={:.0}% ({:.0} deg) issues={:?}",
                rep.index,
                if rep.correct { "OK" } else { "NG" },
                rep.depth_percent,
                rep.depth_angle,
                rep.feedback
            );
        }

        // 指摘の種類が変わった瞬間だけ出す
        if result.feedback.kind != last_kind && !result.feedback.kind.is_neutral() {
            log!(logfile, "[form] {}", result.feedback.message);
        }
        last_kind = result.feedback.kind;

        if frame_no % config.replay.print_every == 0 {
            log!(
                logfile,
                "[frame {:>5}] phase={} primary={:.1} correct={} incorrect={}",
                frame_no,
                result.phase,
                result.angles.primary,
                result.correct,
                result.incorrect
            );
        }
    }

    let summary = trainer.summary();
    log!(
        logfile,
        "[summary] frames={} reps={} correct={} score={:.1} ({})",
        frame_no,
        summary.total_reps,
        summary.correct_reps,
        summary.form_score,
        summary.form_label
    );

    let json = serde_json::to_string_pretty(&summary)?;
    let ts = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let path = format!("{}/summary_{}.json", config.replay.log_dir, ts);
    std::fs::write(&path, &json).with_context(|| format!("failed to write {}", path))?;
    log!(logfile, "[summary] saved to {}", path);
    println!("{}", json);

    Ok(())
}
