//! プッシュアップ
//!
//! 主駆動角は左右肘角の平均。帯域は連続 (隙間なし):
//! start_min 以上で上端、bottom_max 以下でボトム、間は移行中。
//! 体幹ライン (肩-腰-足首) のずれが大きいと腰落ちの重大警告。

use crate::config::Thresholds;
use crate::geometry;
use crate::pose::{Landmark, LandmarkIndex, Side};

use super::{transition_event, AngleSet, Measurement, Phase, PhaseEvent};

#[derive(Debug, Clone)]
pub struct PushupMachine {
    start_min: f32,
    bottom_max: f32,
    phase: Phase,
}

impl PushupMachine {
    pub fn from_config(t: &Thresholds) -> Self {
        Self {
            start_min: t.pushup_start_min,
            bottom_max: t.pushup_bottom_max,
            phase: Phase::Start,
        }
    }

    pub fn update(&mut self, angle: f32) -> PhaseEvent {
        let next = if angle >= self.start_min {
            Phase::Start
        } else if angle <= self.bottom_max {
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

/// プッシュアップ用の計測
///
/// 主角は両肘の平均。トラッキング側は肘角が小さい方 (同値なら右)。
/// body_line_dev は肩-腰-足首の 180 度からのずれ。
pub(crate) fn measure(landmarks: &[Landmark]) -> (Measurement, Side) {
    let left_elbow = geometry::elbow_angle(landmarks, Side::Left);
    let right_elbow = geometry::elbow_angle(landmarks, Side::Right);
    let side = if left_elbow < right_elbow {
        Side::Left
    } else {
        Side::Right
    };
    let primary = (left_elbow + right_elbow) / 2.0;

    let p = |index: LandmarkIndex| crate::pose::point_of(landmarks, index).unwrap_or((0.0, 0.0));
    let shoulder = p(LandmarkIndex::shoulder(side));
    let hip = p(LandmarkIndex::hip(side));
    let knee = p(LandmarkIndex::knee(side));
    let ankle = p(LandmarkIndex::ankle(side));

    let body_line = geometry::angle_at_point(shoulder, hip, ankle);

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
            body_line_dev: 180.0 - body_line,
            flare: 0.0,
        },
        side,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> PushupMachine {
        PushupMachine::from_config(&Thresholds::beginner())
    }

    /// 水平姿勢のフレームを組む。hip_y を下げると腰落ちになる
    fn plank(elbow_deg: f32, hip_y: f32) -> Vec<Landmark> {
        let mut lm = vec![Landmark::new(0.5, 0.5, 1.0); LandmarkIndex::COUNT];
        let mut place = |left: LandmarkIndex, right: LandmarkIndex, x: f32, y: f32| {
            lm[left as usize] = Landmark::new(x - 0.01, y, 1.0);
            lm[right as usize] = Landmark::new(x + 0.01, y, 1.0);
        };
        place(LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder, 0.3, 0.5);
        place(LandmarkIndex::LeftHip, LandmarkIndex::RightHip, 0.5, hip_y);
        place(LandmarkIndex::LeftKnee, LandmarkIndex::RightKnee, 0.6, 0.53);
        place(LandmarkIndex::LeftAnkle, LandmarkIndex::RightAnkle, 0.7, 0.54);
        // 肘は肩の真下。手首の位置で肘角を作る
        place(LandmarkIndex::LeftElbow, LandmarkIndex::RightElbow, 0.3, 0.62);
        let phi = (180.0_f32 - elbow_deg).to_radians();
        let wx = 0.3 + 0.12 * phi.sin();
        let wy = 0.62 + 0.12 * phi.cos();
        place(LandmarkIndex::LeftWrist, LandmarkIndex::RightWrist, wx, wy);
        lm
    }

    #[test]
    fn test_contiguous_bands() {
        let mut m = machine();
        assert_eq!(m.update(170.0), PhaseEvent::None);
        assert_eq!(m.update(120.0), PhaseEvent::Entered(Phase::Transition));
        assert_eq!(m.update(95.0), PhaseEvent::Entered(Phase::Bottom));
        assert_eq!(m.update(120.0), PhaseEvent::Entered(Phase::Transition));
        assert_eq!(m.update(160.0), PhaseEvent::RepComplete);
        assert_eq!(m.phase(), Phase::Start);
    }

    #[test]
    fn test_boundary_values() {
        let mut m = machine();
        // ちょうど start_min はまだ Start
        assert_eq!(m.update(150.0), PhaseEvent::None);
        // ちょうど bottom_max でボトム入り
        m.update(120.0);
        assert_eq!(m.update(100.0), PhaseEvent::Entered(Phase::Bottom));
    }

    #[test]
    fn test_measure_straight_body() {
        let (measurement, side) = measure(&plank(170.0, 0.52));
        assert!((measurement.angles.primary - 170.0).abs() < 2.0);
        assert!(measurement.body_line_dev < 2.0);
        // 左右同値 → 右を選ぶ
        assert_eq!(side, Side::Right);
    }

    #[test]
    fn test_measure_sagging_hips() {
        let (measurement, _) = measure(&plank(90.0, 0.58));
        assert!(
            measurement.body_line_dev > 25.0,
            "dev = {}",
            measurement.body_line_dev
        );
        assert!((measurement.angles.primary - 90.0).abs() < 3.0);
    }

    #[test]
    fn test_reset() {
        let mut m = machine();
        m.update(95.0);
        assert_eq!(m.phase(), Phase::Bottom);
        m.reset();
        assert_eq!(m.phase(), Phase::Start);
    }
}
