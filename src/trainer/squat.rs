//! スクワット
//!
//! 主駆動角は大腿 (腰→膝) と鉛直のなす角。立位でほぼ 0、
//! パラレル付近で 90 前後になる。帯域は 3 つ (s1=立位, s2=途中,
//! s3=ボトム) で、帯の隙間では現在のフェーズを保持する。

use crate::config::Thresholds;
use crate::geometry;
use crate::pose::{Landmark, LandmarkIndex, Side};

use super::{transition_event, AngleSet, Measurement, Phase, PhaseEvent};

#[derive(Debug, Clone)]
pub struct SquatMachine {
    s1_max: f32,
    s2_min: f32,
    s2_max: f32,
    s3_min: f32,
    phase: Phase,
}

impl SquatMachine {
    pub fn from_config(t: &Thresholds) -> Self {
        Self {
            s1_max: t.squat_s1_max,
            s2_min: t.squat_s2_min,
            s2_max: t.squat_s2_max,
            s3_min: t.squat_s3_min,
            phase: Phase::Start,
        }
    }

    /// 大腿-鉛直角でフェーズを進める
    pub fn update(&mut self, angle: f32) -> PhaseEvent {
        let next = self.classify(angle);
        transition_event(&mut self.phase, next)
    }

    fn classify(&self, angle: f32) -> Phase {
        if angle <= self.s1_max {
            Phase::Start
        } else if angle >= self.s2_min && angle <= self.s2_max {
            Phase::Transition
        } else if angle >= self.s3_min {
            // 上限超過もボトム扱い (深すぎの警告はフィードバック側)
            Phase::Bottom
        } else {
            // 帯の隙間 → 保持
            self.phase
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Start;
    }
}

/// スクワット用の角度一式を計測する
///
/// 膝関節角 (腰-膝-足首) が小さい側をトラッキング対象に選ぶ。
/// カメラに近い側の脚の方が曲がって見えるため。同値なら右。
pub(crate) fn measure(landmarks: &[Landmark]) -> (Measurement, Side) {
    let left_knee = geometry::knee_angle(landmarks, Side::Left);
    let right_knee = geometry::knee_angle(landmarks, Side::Right);
    let side = if left_knee < right_knee {
        Side::Left
    } else {
        Side::Right
    };

    let p = |index: LandmarkIndex| crate::pose::point_of(landmarks, index).unwrap_or((0.0, 0.0));
    let shoulder = p(LandmarkIndex::shoulder(side));
    let hip = p(LandmarkIndex::hip(side));
    let knee = p(LandmarkIndex::knee(side));
    let ankle = p(LandmarkIndex::ankle(side));

    let angles = AngleSet {
        primary: geometry::angle_with_vertical(hip, knee),
        depth_joint: left_knee.min(right_knee),
        torso_lean: geometry::angle_with_vertical(shoulder, hip),
        shin_lean: geometry::angle_with_vertical(knee, ankle),
        offset: geometry::offset_angle(
            p(LandmarkIndex::Nose),
            p(LandmarkIndex::LeftShoulder),
            p(LandmarkIndex::RightShoulder),
        ),
    };

    (
        Measurement {
            angles,
            body_line_dev: 0.0,
            flare: 0.0,
        },
        side,
    )
}
