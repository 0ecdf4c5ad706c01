//! フォームフィードバックの分類
//!
//! 種目ごとに優先度順のルール列を 1 フレームにつき 1 回評価する。
//! 重大ルールが先、マッチしたら即確定。どれにも当たらなければ
//! フェーズに応じた中立メッセージを返す。

use serde::Serialize;

use crate::config::Thresholds;
use crate::trainer::{Exercise, Phase};

/// フィードバックの種類
///
/// 閉じた集合。severe なものはレップ不成立の根拠になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    None,
    Ready,
    FrontalWarning,
    BendForward,
    BendBackwards,
    LowerHips,
    KneeOverToes,
    DeepSquat,
    SaggingHips,
    RoundedBack,
    IncompleteLockout,
    ElbowFlare,
    Momentum,
}

impl FeedbackKind {
    /// レップを即不成立にする重大フォームエラーか
    pub fn is_severe(&self) -> bool {
        matches!(
            self,
            FeedbackKind::KneeOverToes
                | FeedbackKind::DeepSquat
                | FeedbackKind::SaggingHips
                | FeedbackKind::RoundedBack
        )
    }

    /// ヒストグラムに数えない中立種別か
    pub fn is_neutral(&self) -> bool {
        matches!(self, FeedbackKind::None | FeedbackKind::Ready)
    }

    /// 種別固有の表示文言 (中立種別はフェーズ依存なので空)
    pub fn message(&self) -> &'static str {
        match self {
            FeedbackKind::None => "",
            FeedbackKind::Ready => "",
            FeedbackKind::FrontalWarning => "Turn to side view for better analysis",
            FeedbackKind::BendForward => "Lean your torso forward slightly.",
            FeedbackKind::BendBackwards => "Straighten your back, lean less forward.",
            FeedbackKind::LowerHips => "Lower your hips more!",
            FeedbackKind::KneeOverToes => "Knee falling over toes! Push hips back.",
            FeedbackKind::DeepSquat => "Too deep! Don't go past parallel.",
            FeedbackKind::SaggingHips => "Hips sagging! Squeeze your glutes and core.",
            FeedbackKind::RoundedBack => "Back rounding! Keep your spine neutral.",
            FeedbackKind::IncompleteLockout => "Lock out fully at the top.",
            FeedbackKind::ElbowFlare => "Tuck your elbows closer to your body.",
            FeedbackKind::Momentum => "Too fast! Control the movement.",
        }
    }
}

/// 1 フレーム分のフィードバック (種別 + 表示文言)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub message: &'static str,
    pub severe: bool,
}

impl Feedback {
    pub fn of(kind: FeedbackKind) -> Self {
        Self {
            kind,
            message: kind.message(),
            severe: kind.is_severe(),
        }
    }

    pub(crate) fn neutral(message: &'static str) -> Self {
        Self {
            kind: FeedbackKind::None,
            message,
            severe: false,
        }
    }

    fn ready(message: &'static str) -> Self {
        Self {
            kind: FeedbackKind::Ready,
            message,
            severe: false,
        }
    }
}

impl Default for Feedback {
    fn default() -> Self {
        Self::neutral("")
    }
}

/// 分類器への入力。Trainer が角度計算の結果を詰める
#[derive(Debug, Clone, Copy)]
pub struct Signals {
    pub phase: Phase,
    /// 種目の主駆動角 (スクワット: 膝-鉛直, カール: 肘 など)
    pub primary: f32,
    /// 今フレームの主角変化量 (primary - 前フレーム)
    pub delta: f32,
    /// 前フレームの変化量。方向反転の検出に使う
    pub prev_delta: f32,
    pub torso_lean: f32,
    pub shin_lean: f32,
    /// 肩-腰-足首の直線からのずれ (180 - 角度)
    pub body_line_dev: f32,
    /// 肘-肩-腰の開き角
    pub flare: f32,
    /// 主角の移動平均速度 (度/フレーム)
    pub velocity: f32,
}

/// 種目別ルール列の評価
pub fn classify(exercise: Exercise, s: &Signals, t: &Thresholds) -> Feedback {
    match exercise {
        Exercise::Squat => classify_squat(s, t),
        Exercise::Pushup => classify_pushup(s, t),
        Exercise::BicepCurl => classify_curl(s, t),
        Exercise::Deadlift => classify_deadlift(s, t),
        Exercise::BenchPress => classify_bench(s, t),
        Exercise::Row => classify_row(s, t),
    }
}

fn classify_squat(s: &Signals, t: &Thresholds) -> Feedback {
    // severe 系を先に判定する
    if s.shin_lean > t.shin_lean_max {
        return Feedback::of(FeedbackKind::KneeOverToes);
    }
    if s.phase == Phase::Bottom && s.primary > t.deep_squat_max {
        return Feedback::of(FeedbackKind::DeepSquat);
    }
    if s.torso_lean < t.torso_lean_min {
        return Feedback::of(FeedbackKind::BendForward);
    }
    if s.torso_lean > t.torso_lean_max {
        return Feedback::of(FeedbackKind::BendBackwards);
    }
    // 下降中 (主角が増加中) にだけ出す
    let descending = s.delta > 0.0;
    if descending
        && s.phase == Phase::Transition
        && s.primary >= t.lower_hips_min
        && s.primary <= t.lower_hips_max
    {
        return Feedback::of(FeedbackKind::LowerHips);
    }
    match s.phase {
        Phase::Start => Feedback::ready("Ready - squat down!"),
        Phase::Bottom => Feedback::neutral("Good depth! Now stand up."),
        Phase::Transition => Feedback::neutral(""),
    }
}

fn classify_pushup(s: &Signals, t: &Thresholds) -> Feedback {
    if s.body_line_dev > t.body_line_max {
        return Feedback::of(FeedbackKind::SaggingHips);
    }
    if s.phase == Phase::Start && s.primary < t.lockout_min {
        return Feedback::of(FeedbackKind::IncompleteLockout);
    }
    match s.phase {
        Phase::Start => Feedback::ready("Ready - lower your chest!"),
        Phase::Bottom => Feedback::neutral("Good depth! Push back up."),
        Phase::Transition => Feedback::neutral(""),
    }
}

fn classify_curl(s: &Signals, t: &Thresholds) -> Feedback {
    if s.velocity > t.curl_velocity_max {
        return Feedback::of(FeedbackKind::Momentum);
    }
    // 伸ばし切る前に (Transition 内で) 伸展→屈曲へ反転したら、
    // 下ろし切らずに次のカールを始めている
    let reversed_short = s.phase == Phase::Transition && s.prev_delta > 0.0 && s.delta < 0.0;
    if reversed_short {
        return Feedback::of(FeedbackKind::IncompleteLockout);
    }
    match s.phase {
        Phase::Start => Feedback::ready("Ready - curl up!"),
        Phase::Bottom => Feedback::neutral("Full contraction! Lower slowly."),
        Phase::Transition => Feedback::neutral(""),
    }
}

fn classify_deadlift(s: &Signals, t: &Thresholds) -> Feedback {
    if s.torso_lean > t.back_lean_max {
        return Feedback::of(FeedbackKind::RoundedBack);
    }
    match s.phase {
        Phase::Start => Feedback::ready("Ready - hinge down!"),
        Phase::Bottom => Feedback::neutral("Good depth! Drive back up."),
        Phase::Transition => Feedback::neutral(""),
    }
}

fn classify_bench(s: &Signals, t: &Thresholds) -> Feedback {
    if s.flare > t.elbow_flare_max {
        return Feedback::of(FeedbackKind::ElbowFlare);
    }
    match s.phase {
        Phase::Start => Feedback::ready("Ready - lower the bar!"),
        Phase::Bottom => Feedback::neutral("Good depth! Press back up."),
        Phase::Transition => Feedback::neutral(""),
    }
}

fn classify_row(s: &Signals, t: &Thresholds) -> Feedback {
    if s.velocity > t.row_velocity_max {
        return Feedback::of(FeedbackKind::Momentum);
    }
    match s.phase {
        Phase::Start => Feedback::ready("Ready - row the weight!"),
        Phase::Bottom => Feedback::neutral("Good pull! Lower under control."),
        Phase::Transition => Feedback::neutral(""),
    }
}
