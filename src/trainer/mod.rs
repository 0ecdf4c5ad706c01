//! 種目別トレーナ
//!
//! 1 フレームの 33 ランドマークを受け取り、可視性ゲート → 計測 →
//! 状態機械 → フィードバック分類 → セッション集計の順で処理する。
//! フェーズは全種目 Start / Transition / Bottom に統一し、表示ラベル
//! だけ種目ごとに変える。

pub mod curl;
pub mod latch;
pub mod pushup;
pub mod squat;
pub mod velocity;

use std::time::Instant;

use serde::Serialize;

use crate::config::{Mode, Thresholds};
use crate::feedback::{classify, Feedback, FeedbackKind, Signals};
use crate::gate::VisibilityGate;
use crate::pose::{Landmark, LandmarkIndex, Side};
use crate::session::{RepRecord, SessionState, WorkoutSummary};

use curl::CurlMachine;
use latch::LatchMachine;
use pushup::PushupMachine;
use squat::SquatMachine;
use velocity::VelocityWindow;

/// 対応種目
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Exercise {
    Squat,
    Pushup,
    BicepCurl,
    Deadlift,
    BenchPress,
    Row,
}

const REQUIRED_FULL_BODY: &[LandmarkIndex] = &[
    LandmarkIndex::Nose,
    LandmarkIndex::LeftShoulder,
    LandmarkIndex::RightShoulder,
    LandmarkIndex::LeftHip,
    LandmarkIndex::RightHip,
    LandmarkIndex::LeftKnee,
    LandmarkIndex::RightKnee,
    LandmarkIndex::LeftAnkle,
    LandmarkIndex::RightAnkle,
];

const REQUIRED_PLANK: &[LandmarkIndex] = &[
    LandmarkIndex::LeftShoulder,
    LandmarkIndex::RightShoulder,
    LandmarkIndex::LeftElbow,
    LandmarkIndex::RightElbow,
    LandmarkIndex::LeftWrist,
    LandmarkIndex::RightWrist,
    LandmarkIndex::LeftHip,
    LandmarkIndex::RightHip,
    LandmarkIndex::LeftAnkle,
    LandmarkIndex::RightAnkle,
];

const REQUIRED_ARMS: &[LandmarkIndex] = &[
    LandmarkIndex::LeftShoulder,
    LandmarkIndex::RightShoulder,
    LandmarkIndex::LeftElbow,
    LandmarkIndex::RightElbow,
    LandmarkIndex::LeftWrist,
    LandmarkIndex::RightWrist,
];

const REQUIRED_UPPER: &[LandmarkIndex] = &[
    LandmarkIndex::LeftShoulder,
    LandmarkIndex::RightShoulder,
    LandmarkIndex::LeftElbow,
    LandmarkIndex::RightElbow,
    LandmarkIndex::LeftWrist,
    LandmarkIndex::RightWrist,
    LandmarkIndex::LeftHip,
    LandmarkIndex::RightHip,
];

impl Exercise {
    /// ID 文字列から解決する。別名も受ける
    pub fn parse(id: &str) -> Option<Self> {
        match id.to_ascii_lowercase().as_str() {
            "squat" => Some(Self::Squat),
            "pushup" | "push_up" => Some(Self::Pushup),
            "bicep_curl" | "curl" => Some(Self::BicepCurl),
            "deadlift" => Some(Self::Deadlift),
            "bench_press" | "bench" => Some(Self::BenchPress),
            "row" => Some(Self::Row),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Squat => "squat",
            Self::Pushup => "pushup",
            Self::BicepCurl => "bicep_curl",
            Self::Deadlift => "deadlift",
            Self::BenchPress => "bench_press",
            Self::Row => "row",
        }
    }

    /// 横向きカメラを要求する種目か (正面向き警告の対象)
    pub fn needs_side_view(&self) -> bool {
        matches!(self, Self::Squat | Self::Deadlift | Self::Pushup)
    }

    pub fn required_landmarks(&self) -> &'static [LandmarkIndex] {
        match self {
            Self::Squat | Self::Deadlift => REQUIRED_FULL_BODY,
            Self::Pushup => REQUIRED_PLANK,
            Self::BicepCurl => REQUIRED_ARMS,
            Self::BenchPress | Self::Row => REQUIRED_UPPER,
        }
    }

    /// 深さ% 換算に使う可動域スパン (度)。実測に基づく定数
    pub fn depth_span(&self) -> f32 {
        match self {
            Self::Squat | Self::Pushup => 90.0,
            Self::BicepCurl => 130.0,
            Self::Deadlift | Self::BenchPress | Self::Row => 120.0,
        }
    }

    /// フェーズの種目別表示ラベル
    pub fn phase_label(&self, phase: Phase) -> &'static str {
        match (self, phase) {
            (Self::Squat, Phase::Start) => "s1",
            (Self::Squat, Phase::Transition) => "s2",
            (Self::Squat, Phase::Bottom) => "s3",
            (Self::Pushup, Phase::Start) => "up",
            (Self::Pushup, Phase::Transition) => "transition",
            (Self::Pushup, Phase::Bottom) => "down",
            (Self::BicepCurl | Self::Row, Phase::Start) => "extended",
            (Self::BicepCurl, Phase::Transition) => "curling",
            (Self::BicepCurl | Self::Row, Phase::Bottom) => "contracted",
            (Self::Deadlift | Self::BenchPress, Phase::Start) => "lockout",
            (Self::Deadlift | Self::BenchPress, Phase::Bottom) => "bottom",
            (_, Phase::Transition) => "transition",
        }
    }
}

/// 統一フェーズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Start,
    Transition,
    Bottom,
}

/// 状態機械の 1 ステップの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    None,
    /// Transition か Bottom に入った
    Entered(Phase),
    /// Start に戻った = 1 レップ完了
    RepComplete,
}

/// フェーズ遷移をイベントに変換する。全機械で共通
pub(crate) fn transition_event(phase: &mut Phase, next: Phase) -> PhaseEvent {
    if next == *phase {
        return PhaseEvent::None;
    }
    *phase = next;
    if next == Phase::Start {
        PhaseEvent::RepComplete
    } else {
        PhaseEvent::Entered(next)
    }
}

/// 1 フレーム分の角度一式 (度)
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AngleSet {
    /// 状態機械を駆動する主角
    pub primary: f32,
    /// 深さ評価に使う関節角
    pub depth_joint: f32,
    pub torso_lean: f32,
    pub shin_lean: f32,
    /// 鼻-両肩の開き角 (正面向き判定)
    pub offset: f32,
}

/// 計測結果。角度一式 + 種目固有の副次量
#[derive(Debug, Clone, Copy)]
pub(crate) struct Measurement {
    pub angles: AngleSet,
    pub body_line_dev: f32,
    pub flare: f32,
}

/// 種目別状態機械の閉じた集合
#[derive(Debug, Clone)]
pub enum Machine {
    Squat(SquatMachine),
    Pushup(PushupMachine),
    Curl(CurlMachine),
    Deadlift(LatchMachine),
    Bench(LatchMachine),
    Row(LatchMachine),
}

impl Machine {
    pub fn for_exercise(exercise: Exercise, t: &Thresholds) -> Self {
        match exercise {
            Exercise::Squat => Machine::Squat(SquatMachine::from_config(t)),
            Exercise::Pushup => Machine::Pushup(PushupMachine::from_config(t)),
            Exercise::BicepCurl => Machine::Curl(CurlMachine::from_config(t)),
            Exercise::Deadlift => {
                Machine::Deadlift(LatchMachine::new(t.deadlift_bottom_max, t.deadlift_start_min))
            }
            Exercise::BenchPress => {
                Machine::Bench(LatchMachine::new(t.bench_bottom_max, t.bench_start_min))
            }
            Exercise::Row => Machine::Row(LatchMachine::new(t.row_bottom_max, t.row_start_min)),
        }
    }

    pub fn update(&mut self, angle: f32) -> PhaseEvent {
        match self {
            Machine::Squat(m) => m.update(angle),
            Machine::Pushup(m) => m.update(angle),
            Machine::Curl(m) => m.update(angle),
            Machine::Deadlift(m) | Machine::Bench(m) | Machine::Row(m) => m.update(angle),
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Machine::Squat(m) => m.phase(),
            Machine::Pushup(m) => m.phase(),
            Machine::Curl(m) => m.phase(),
            Machine::Deadlift(m) | Machine::Bench(m) | Machine::Row(m) => m.phase(),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Machine::Squat(m) => m.reset(),
            Machine::Pushup(m) => m.reset(),
            Machine::Curl(m) => m.reset(),
            Machine::Deadlift(m) | Machine::Bench(m) | Machine::Row(m) => m.reset(),
        }
    }
}

/// 1 フレームの解析結果
#[derive(Debug, Clone, Serialize)]
pub struct FrameResult {
    /// 現フェーズの種目別ラベル
    pub phase: &'static str,
    /// 進行中レップのフェーズ通過列 (最大 3)
    pub phase_trace: Vec<&'static str>,
    pub correct: u32,
    pub incorrect: u32,
    pub angles: AngleSet,
    pub feedback: Feedback,
    pub side: Side,
    pub frontal_view: bool,
    pub full_body_visible: bool,
    pub ready: bool,
    pub depth_percent: f32,
    pub idle_secs: f32,
    /// このフレームで確定したレップ (あれば)
    pub rep: Option<RepRecord>,
    pub debug: String,
}

impl Default for FrameResult {
    fn default() -> Self {
        Self {
            phase: "",
            phase_trace: Vec::new(),
            correct: 0,
            incorrect: 0,
            angles: AngleSet::default(),
            feedback: Feedback::default(),
            side: Side::Right,
            frontal_view: false,
            full_body_visible: false,
            ready: false,
            depth_percent: 0.0,
            idle_secs: 0.0,
            rep: None,
            debug: String::new(),
        }
    }
}

fn measure(exercise: Exercise, landmarks: &[Landmark]) -> (Measurement, Side) {
    match exercise {
        Exercise::Squat => squat::measure(landmarks),
        Exercise::Pushup => pushup::measure(landmarks),
        Exercise::BicepCurl => curl::measure(landmarks),
        Exercise::Deadlift => latch::measure_deadlift(landmarks),
        Exercise::BenchPress => latch::measure_bench(landmarks),
        Exercise::Row => latch::measure_row(landmarks),
    }
}

/// 1 セッション分の解析器
pub struct Trainer {
    exercise: Exercise,
    mode: Mode,
    thresholds: Thresholds,
    gate: VisibilityGate,
    machine: Machine,
    velocity: VelocityWindow,
    session: SessionState,
    last_primary: Option<f32>,
    prev_delta: f32,
}

impl Trainer {
    pub fn new(exercise: Exercise, mode: Mode) -> Self {
        Self::new_at(exercise, mode, Instant::now())
    }

    pub fn new_at(exercise: Exercise, mode: Mode, now: Instant) -> Self {
        let thresholds = Thresholds::for_mode(mode);
        Self {
            gate: VisibilityGate::new(
                thresholds.visibility_min,
                thresholds.edge_margin,
                thresholds.frames_required,
            ),
            machine: Machine::for_exercise(exercise, &thresholds),
            velocity: VelocityWindow::default(),
            session: SessionState::new(now),
            last_primary: None,
            prev_delta: 0.0,
            exercise,
            mode,
            thresholds,
        }
    }

    pub fn exercise(&self) -> Exercise {
        self.exercise
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn analyze(&mut self, landmarks: &[Landmark]) -> FrameResult {
        self.analyze_at(landmarks, Instant::now())
    }

    /// 時刻を注入できる解析 1 ステップ
    ///
    /// 処理順: ランドマーク数チェック → ゲート計数 → 計測 →
    /// 正面向き早期リターン → 深さ追跡・無動作監視 (ゲート未準備でも
    /// 回す) → 状態機械 → フィードバック。
    pub fn analyze_at(&mut self, landmarks: &[Landmark], now: Instant) -> FrameResult {
        if landmarks.len() < LandmarkIndex::COUNT {
            return FrameResult {
                phase: self.exercise.phase_label(Phase::Start),
                debug: "Incomplete pose data".to_string(),
                ..FrameResult::default()
            };
        }

        let report = self.gate.update(landmarks, self.exercise.required_landmarks());
        let (measurement, side) = measure(self.exercise, landmarks);
        let angles = measurement.angles;
        let depth_percent = self.depth_percent(angles.depth_joint);

        // 正面向きではフェーズも時計も進めない
        if self.exercise.needs_side_view() && angles.offset > self.thresholds.offset_max {
            return FrameResult {
                phase: self.current_label(),
                phase_trace: self.trace_labels(),
                correct: self.session.correct,
                incorrect: self.session.incorrect,
                angles,
                feedback: Feedback::of(FeedbackKind::FrontalWarning),
                side,
                frontal_view: true,
                full_body_visible: report.clean,
                ready: report.ready,
                depth_percent,
                idle_secs: self.session.idle_secs(now),
                rep: None,
                debug: report.reason,
            };
        }

        // 深さと無動作はゲート準備前から追跡する
        self.session.scratch.note_depth(angles.depth_joint);
        let delta = match self.last_primary {
            Some(prev) => angles.primary - prev,
            None => 0.0,
        };
        self.session
            .track_activity(delta, now, self.thresholds.inactive_secs);
        self.velocity.push(angles.primary);

        if !report.ready {
            self.last_primary = Some(angles.primary);
            self.prev_delta = delta;
            return FrameResult {
                phase: self.current_label(),
                phase_trace: self.trace_labels(),
                correct: self.session.correct,
                incorrect: self.session.incorrect,
                angles,
                feedback: Feedback::neutral("Position full body in frame"),
                side,
                frontal_view: false,
                full_body_visible: report.clean,
                ready: false,
                depth_percent,
                idle_secs: self.session.idle_secs(now),
                rep: None,
                debug: report.reason,
            };
        }

        let mut completed = None;
        match self.machine.update(angles.primary) {
            PhaseEvent::Entered(phase) => {
                self.session.scratch.begin(now);
                self.session.scratch.buffer.push(phase);
            }
            PhaseEvent::RepComplete => {
                let pct = self.depth_percent(self.session.scratch.min_angle);
                completed = Some(self.session.finalize_rep(pct, now));
            }
            PhaseEvent::None => {}
        }

        let phase = self.machine.phase();
        let signals = Signals {
            phase,
            primary: angles.primary,
            delta,
            prev_delta: self.prev_delta,
            torso_lean: angles.torso_lean,
            shin_lean: angles.shin_lean,
            body_line_dev: measurement.body_line_dev,
            flare: measurement.flare,
            velocity: self.velocity.velocity(),
        };
        let feedback = classify(self.exercise, &signals, &self.thresholds);
        self.session.record_feedback(feedback.kind);
        if matches!(
            feedback.kind,
            FeedbackKind::Momentum | FeedbackKind::ElbowFlare
        ) {
            self.session.scratch.secondary_violation = true;
        }

        self.last_primary = Some(angles.primary);
        self.prev_delta = delta;

        FrameResult {
            phase: self.exercise.phase_label(phase),
            phase_trace: self.trace_labels(),
            correct: self.session.correct,
            incorrect: self.session.incorrect,
            angles,
            feedback,
            side,
            frontal_view: false,
            full_body_visible: report.clean,
            ready: true,
            depth_percent,
            idle_secs: self.session.idle_secs(now),
            rep: completed,
            debug: report.reason,
        }
    }

    pub fn reset(&mut self, mode: Option<Mode>) {
        self.reset_at(mode, Instant::now());
    }

    /// セッションを作り直す。mode 指定時はしきい値も引き直す
    pub fn reset_at(&mut self, mode: Option<Mode>, now: Instant) {
        if let Some(mode) = mode {
            self.mode = mode;
            self.thresholds = Thresholds::for_mode(mode);
        }
        self.gate = VisibilityGate::new(
            self.thresholds.visibility_min,
            self.thresholds.edge_margin,
            self.thresholds.frames_required,
        );
        self.machine = Machine::for_exercise(self.exercise, &self.thresholds);
        self.velocity.reset();
        self.session = SessionState::new(now);
        self.last_primary = None;
        self.prev_delta = 0.0;
    }

    pub fn summary(&self) -> WorkoutSummary {
        self.summary_at(Instant::now())
    }

    pub fn summary_at(&self, now: Instant) -> WorkoutSummary {
        self.session.summary(self.exercise, self.mode, now)
    }

    fn current_label(&self) -> &'static str {
        self.exercise.phase_label(self.machine.phase())
    }

    fn trace_labels(&self) -> Vec<&'static str> {
        self.session
            .scratch
            .buffer
            .entries()
            .iter()
            .map(|p| self.exercise.phase_label(*p))
            .collect()
    }

    fn depth_percent(&self, angle: f32) -> f32 {
        ((180.0 - angle) / self.exercise.depth_span() * 100.0).clamp(0.0, 100.0)
    }
}

/// ID からトレーナを作る。未知の ID はスクワットに倒す (旧来互換)
pub fn create(exercise_id: &str, mode: Mode) -> Trainer {
    let exercise = Exercise::parse(exercise_id).unwrap_or(Exercise::Squat);
    Trainer::new(exercise, mode)
}
