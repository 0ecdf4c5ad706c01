//! バイセップカール
//!
//! 主駆動角はトラッキング側の肘角。伸展 (extended) が Start、
//! 収縮 (contracted) が Bottom に当たる。反動は速度ウィンドウで
//! 検出し、出たレップは不成立にする。

use crate::config::Thresholds;
use crate::geometry;
use crate::pose::{Landmark, LandmarkIndex, Side};

use super::{transition_event, AngleSet, Measurement, Phase, PhaseEvent};

#[derive(Debug, Clone)]
pub struct CurlMachine {
    extended_min: f32,
    contracted_max: f32,
    phase: Phase,
}

impl CurlMachine {
    pub fn from_config(t: &Thresholds) -> Self {
        Self {
            extended_min: t.curl_extended_min,
            contracted_max: t.curl_contracted_max,
            phase: Phase::Start,
        }
    }

    pub fn update(&mut self, angle: f32) -> PhaseEvent {
        let next = if angle >= self.extended_min {
            Phase::Start
        } else if angle <= self.contracted_max {
            Phase::Bottom
        } else {
            Phase::Transition
        };
        transition_event(&mut self.phase, next)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn reset(&mut self) {
        self.phase = Phase::Start;
    }
}

/// カール用の計測。肘角が小さい側 (同値なら右) を追う
pub(crate) fn measure(landmarks: &[Landmark]) -> (Measurement, Side) {
    let left_elbow = geometry::elbow_angle(landmarks, Side::Left);
    let right_elbow = geometry::elbow_angle(landmarks, Side::Right);
    let side = if left_elbow < right_elbow {
        Side::Left
    } else {
        Side::Right
    };
    let primary = left_elbow.min(right_elbow);

    let p = |index: LandmarkIndex| crate::pose::point_of(landmarks, index).unwrap_or((0.0, 0.0));
    let shoulder = p(LandmarkIndex::shoulder(side));
    let hip = p(LandmarkIndex::hip(side));
    let knee = p(LandmarkIndex::knee(side));
    let ankle = p(LandmarkIndex::ankle(side));

    let angles = AngleSet {
        primary,
        depth_joint: primary,
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
