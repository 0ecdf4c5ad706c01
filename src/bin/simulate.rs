//! 合成ランドマークでの動作確認
//!
//! 角度スクリプトから 33 点の姿勢を合成して解析器に流し、レップ判定と
//! サマリを表示する。引数で種目を絞れる。出力パスを足すとそのフレーム
//! 列を JSONL で書き出す (リプレイ入力にそのまま使える)。
//!
//! 使い方: simulate [exercise] [out.jsonl]

use std::io::Write;

use anyhow::{Context, Result};

use formly_engine::config::Mode;
use formly_engine::pose::{Landmark, LandmarkIndex};
use formly_engine::trainer::{self, Exercise};

const EXERCISES: &[&str] = &[
    "squat",
    "pushup",
    "bicep_curl",
    "deadlift",
    "bench_press",
    "row",
];
const WARMUP_FRAMES: usize = 5;
const REPS: usize = 3;

fn main() -> Result<()> {
    let exercise = std::env::args().nth(1);
    let output = std::env::args().nth(2);
    match exercise {
        Some(id) => run_one(&id, output.as_deref()),
        None => {
            for id in EXERCISES {
                run_one(id, None)?;
            }
            Ok(())
        }
    }
}

fn run_one(id: &str, output: Option<&str>) -> Result<()> {
    let mut trainer = trainer::create(id, Mode::Beginner);
    let frames = synth_session(trainer.exercise());

    if let Some(path) = output {
        let file = std::fs::File::create(path).with_context(|| format!("failed to create {}", path))?;
        let mut writer = std::io::BufWriter::new(file);
        for frame in &frames {
            writeln!(writer, "{}", serde_json::to_string(frame)?)?;
        }
        writer.flush()?;
        eprintln!("wrote {} frames to {}", frames.len(), path);
    }

    let mut rep_lines = Vec::new();
    for frame in &frames {
        let result = trainer.analyze(frame);
        if let Some(rep) = &result.rep {
            rep_lines.push(format!(
                "  rep #{}: {} depth={:.0}% issues={:?}",
                rep.index,
                if rep.correct { "OK" } else { "NG" },
                rep.depth_percent,
                rep.feedback
            ));
        }
    }

    let summary = trainer.summary();
    println!(
        "{:<12} reps={} correct={} score={:.1} ({})",
        trainer.exercise().as_str(),
        summary.total_reps,
        summary.correct_reps,
        summary.form_score,
        summary.form_label
    );
    for line in rep_lines {
        println!("{}", line);
    }
    Ok(())
}

/// ウォームアップ + REPS 本のフレーム列
fn synth_session(exercise: Exercise) -> Vec<Vec<Landmark>> {
    let rest = rest_value(exercise);
    let mut values = vec![rest; WARMUP_FRAMES];
    for rep in 0..REPS {
        values.extend(rep_script(exercise, rep));
    }
    values.iter().map(|&v| frame_for(exercise, v)).collect()
}

fn rest_value(exercise: Exercise) -> f32 {
    match exercise {
        Exercise::Squat => 10.0,
        Exercise::Deadlift => 0.0, // 前傾の補間パラメータ (度)
        _ => 170.0,
    }
}

/// 1 レップ分の角度スクリプト。最後はスタート姿勢に戻って終わる
fn rep_script(exercise: Exercise, rep: usize) -> Vec<f32> {
    match exercise {
        Exercise::Squat => {
            // 3 本目はわざと浅くして NG を出す
            if rep == REPS - 1 {
                vec![22.0, 34.0, 45.0, 50.0, 45.0, 34.0, 22.0, 10.0]
            } else {
                vec![22.0, 34.0, 45.0, 85.0, 85.0, 45.0, 34.0, 22.0, 10.0]
            }
        }
        Exercise::Pushup => vec![140.0, 120.0, 95.0, 95.0, 120.0, 140.0, 170.0],
        Exercise::BicepCurl => {
            // 速度制限 (10 deg/frame) を超えないよう 8 度刻み
            let mut v = Vec::new();
            let mut a = 170.0;
            while a > 60.0 {
                a -= 8.0;
                v.push(a);
            }
            v.push(a); // ボトムで 1 フレーム静止
            while a < 170.0 {
                a += 8.0;
                v.push(a);
            }
            v
        }
        Exercise::Deadlift => vec![18.0, 36.0, 60.0, 60.0, 36.0, 18.0, 0.0],
        Exercise::BenchPress => vec![140.0, 110.0, 75.0, 75.0, 110.0, 140.0, 170.0],
        Exercise::Row => {
            // 速度制限 (12 deg/frame) を超えないよう 10 度刻み
            let mut v: Vec<f32> = (7..=16).rev().map(|i| i as f32 * 10.0).collect();
            v.push(70.0);
            v.extend((8..=17).map(|i| i as f32 * 10.0));
            v
        }
    }
}

fn base() -> Vec<Landmark> {
    vec![Landmark::new(0.5, 0.5, 1.0); LandmarkIndex::COUNT]
}

fn pair(lm: &mut [Landmark], left: LandmarkIndex, right: LandmarkIndex, x: f32, y: f32) {
    lm[left as usize] = Landmark::new(x - 0.01, y, 1.0);
    lm[right as usize] = Landmark::new(x + 0.01, y, 1.0);
}

/// 肘の内角が elbow_deg になる位置に手首を置く
fn wrist_for(shoulder: (f32, f32), elbow: (f32, f32), elbow_deg: f32) -> (f32, f32) {
    let ux = shoulder.0 - elbow.0;
    let uy = shoulder.1 - elbow.1;
    let norm = (ux * ux + uy * uy).sqrt();
    let (ux, uy) = (ux / norm, uy / norm);
    let a = elbow_deg.to_radians();
    let dx = ux * a.cos() - uy * a.sin();
    let dy = ux * a.sin() + uy * a.cos();
    (elbow.0 + 0.12 * dx, elbow.1 + 0.12 * dy)
}

fn frame_for(exercise: Exercise, value: f32) -> Vec<Landmark> {
    match exercise {
        Exercise::Squat => squat_frame(value),
        Exercise::Pushup => pushup_frame(value),
        Exercise::BicepCurl => curl_frame(value),
        Exercise::Deadlift => deadlift_frame(value),
        Exercise::BenchPress => bench_frame(value),
        Exercise::Row => row_frame(value),
    }
}

/// 横向きスクワット。value は大腿の鉛直角 (度)
fn squat_frame(theta_deg: f32) -> Vec<Landmark> {
    let mut lm = base();
    let hip = (0.5, 0.4);
    let theta = theta_deg.to_radians();
    let knee = (hip.0 + 0.2 * theta.sin(), hip.1 + 0.2 * theta.cos());
    let shin = 10.0_f32.to_radians();
    let ankle = (knee.0 + 0.2 * shin.sin(), knee.1 + 0.2 * shin.cos());
    let torso = 30.0_f32.to_radians();
    let shoulder = (hip.0 - 0.35 * torso.sin(), hip.1 - 0.35 * torso.cos());
    pair(&mut lm, LandmarkIndex::LeftHip, LandmarkIndex::RightHip, hip.0, hip.1);
    pair(&mut lm, LandmarkIndex::LeftKnee, LandmarkIndex::RightKnee, knee.0, knee.1);
    pair(&mut lm, LandmarkIndex::LeftAnkle, LandmarkIndex::RightAnkle, ankle.0, ankle.1);
    pair(
        &mut lm,
        LandmarkIndex::LeftShoulder,
        LandmarkIndex::RightShoulder,
        shoulder.0,
        shoulder.1,
    );
    lm[LandmarkIndex::Nose as usize] = Landmark::new(shoulder.0, shoulder.1 - 0.05, 1.0);
    lm
}

/// プランク姿勢。value は肘の内角
fn pushup_frame(elbow_deg: f32) -> Vec<Landmark> {
    let mut lm = base();
    pair(&mut lm, LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder, 0.3, 0.5);
    pair(&mut lm, LandmarkIndex::LeftHip, LandmarkIndex::RightHip, 0.5, 0.52);
    pair(&mut lm, LandmarkIndex::LeftKnee, LandmarkIndex::RightKnee, 0.6, 0.53);
    pair(&mut lm, LandmarkIndex::LeftAnkle, LandmarkIndex::RightAnkle, 0.7, 0.54);
    pair(&mut lm, LandmarkIndex::LeftElbow, LandmarkIndex::RightElbow, 0.3, 0.62);
    let wrist = wrist_for((0.3, 0.5), (0.3, 0.62), elbow_deg);
    pair(&mut lm, LandmarkIndex::LeftWrist, LandmarkIndex::RightWrist, wrist.0, wrist.1);
    lm[LandmarkIndex::Nose as usize] = Landmark::new(0.22, 0.48, 1.0);
    lm
}

fn curl_frame(elbow_deg: f32) -> Vec<Landmark> {
    let mut lm = base();
    pair(&mut lm, LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder, 0.5, 0.2);
    pair(&mut lm, LandmarkIndex::LeftHip, LandmarkIndex::RightHip, 0.5, 0.5);
    pair(&mut lm, LandmarkIndex::LeftElbow, LandmarkIndex::RightElbow, 0.5, 0.33);
    let wrist = wrist_for((0.5, 0.2), (0.5, 0.33), elbow_deg);
    pair(&mut lm, LandmarkIndex::LeftWrist, LandmarkIndex::RightWrist, wrist.0, wrist.1);
    lm
}

/// 直立とヒンジ姿勢の補間。value は前傾角 (0 = 直立, 60 = ボトム)
fn deadlift_frame(lean_deg: f32) -> Vec<Landmark> {
    let mut lm = base();
    let t = lean_deg / 60.0;
    let lerp = |a: f32, b: f32| a + (b - a) * t;
    let hip = (0.5, 0.45);
    let shoulder = (lerp(0.5, 0.7598), lerp(0.15, 0.30));
    let knee = (lerp(0.5, 0.58), lerp(0.65, 0.63));
    let ankle = (lerp(0.5, 0.6), 0.85);
    pair(&mut lm, LandmarkIndex::LeftHip, LandmarkIndex::RightHip, hip.0, hip.1);
    pair(
        &mut lm,
        LandmarkIndex::LeftShoulder,
        LandmarkIndex::RightShoulder,
        shoulder.0,
        shoulder.1,
    );
    pair(&mut lm, LandmarkIndex::LeftKnee, LandmarkIndex::RightKnee, knee.0, knee.1);
    pair(&mut lm, LandmarkIndex::LeftAnkle, LandmarkIndex::RightAnkle, ankle.0, ankle.1);
    lm[LandmarkIndex::Nose as usize] = Landmark::new(shoulder.0, shoulder.1 - 0.05, 1.0);
    lm
}

fn bench_frame(elbow_deg: f32) -> Vec<Landmark> {
    let mut lm = base();
    let shoulder = (0.4, 0.55);
    let elbow = (0.43, 0.67);
    pair(
        &mut lm,
        LandmarkIndex::LeftShoulder,
        LandmarkIndex::RightShoulder,
        shoulder.0,
        shoulder.1,
    );
    pair(&mut lm, LandmarkIndex::LeftElbow, LandmarkIndex::RightElbow, elbow.0, elbow.1);
    pair(&mut lm, LandmarkIndex::LeftHip, LandmarkIndex::RightHip, 0.6, 0.57);
    let wrist = wrist_for(shoulder, elbow, elbow_deg);
    pair(&mut lm, LandmarkIndex::LeftWrist, LandmarkIndex::RightWrist, wrist.0, wrist.1);
    lm
}

fn row_frame(elbow_deg: f32) -> Vec<Landmark> {
    let mut lm = base();
    let shoulder = (0.42, 0.4);
    let elbow = (0.46, 0.52);
    pair(
        &mut lm,
        LandmarkIndex::LeftShoulder,
        LandmarkIndex::RightShoulder,
        shoulder.0,
        shoulder.1,
    );
    pair(&mut lm, LandmarkIndex::LeftElbow, LandmarkIndex::RightElbow, elbow.0, elbow.1);
    pair(&mut lm, LandmarkIndex::LeftHip, LandmarkIndex::RightHip, 0.6, 0.55);
    let wrist = wrist_for(shoulder, elbow, elbow_deg);
    pair(&mut lm, LandmarkIndex::LeftWrist, LandmarkIndex::RightWrist, wrist.0, wrist.1);
    lm
}
