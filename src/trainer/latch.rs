//! 2 フェーズ (ラッチ) 系: デッドリフト・ベンチプレス・ロウ
//!
//! 主角が bottom_max まで落ちたらラッチ、start_min まで戻った瞬間に
//! レップ完了。しきい値の間はヒステリシス帯で現フェーズを保持する。
//! 3 種目は同じ機械を共有し、主角と副次判定だけが違う。

use crate::geometry;
use crate::pose::{Landmark, LandmarkIndex, Side};

use super::{transition_event, AngleSet, Measurement, Phase, PhaseEvent};

#[derive(Debug, Clone)]
pub struct LatchMachine {
    bottom_max: f32,
    start_min: f32,
    phase: Phase,
}

impl LatchMachine {
    pub fn new(bottom_max: f32, start_min: f32) -> Self {
        Self {
            bottom_max,
            start_min,
            phase: Phase::Start,
        }
    }

    pub fn update(&mut self, angle: f32) -> PhaseEvent {
        let next = if angle <= self.bottom_max {
            Phase::Bottom
        } else if angle >= self.start_min {
            Phase::Start
        } else {
            // ヒステリシス帯
            self.phase
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

fn point(landmarks: &[Landmark], index: LandmarkIndex) -> (f32, f32) {
    crate::pose::point_of(landmarks, index).unwrap_or((0.0, 0.0))
}

fn offset(landmarks: &[Landmark]) -> f32 {
    geometry::offset_angle(
        point(landmarks, LandmarkIndex::Nose),
        point(landmarks, LandmarkIndex::LeftShoulder),
        point(landmarks, LandmarkIndex::RightShoulder),
    )
}

/// デッドリフト: 主角は股関節 (肩-腰-膝)。背中の丸まりは胴体の
/// 前傾過多で近似する
pub(crate) fn measure_deadlift(landmarks: &[Landmark]) -> (Measurement, Side) {
    let left_hip = geometry::hip_angle(landmarks, Side::Left);
    let right_hip = geometry::hip_angle(landmarks, Side::Right);
    let side = if left_hip < right_hip {
        Side::Left
    } else {
        Side::Right
    };
    let primary = left_hip.min(right_hip);

    let shoulder = point(landmarks, LandmarkIndex::shoulder(side));
    let hip = point(landmarks, LandmarkIndex::hip(side));
    let knee = point(landmarks, LandmarkIndex::knee(side));
    let ankle = point(landmarks, LandmarkIndex::ankle(side));

    let angles = AngleSet {
        primary,
        depth_joint: primary,
        torso_lean: geometry::angle_with_vertical(shoulder, hip),
        shin_lean: geometry::angle_with_vertical(knee, ankle),
        offset: offset(landmarks),
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

/// ベンチプレス: 主角は両肘平均。肘-肩-腰の開き角で肘の開きを見る
pub(crate) fn measure_bench(landmarks: &[Landmark]) -> (Measurement, Side) {
    let left_elbow = geometry::elbow_angle(landmarks, Side::Left);
    let right_elbow = geometry::elbow_angle(landmarks, Side::Right);
    let side = if left_elbow < right_elbow {
        Side::Left
    } else {
        Side::Right
    };
    let primary = (left_elbow + right_elbow) / 2.0;

    let shoulder = point(landmarks, LandmarkIndex::shoulder(side));
    let elbow = point(landmarks, LandmarkIndex::elbow(side));
    let hip = point(landmarks, LandmarkIndex::hip(side));
    let knee = point(landmarks, LandmarkIndex::knee(side));
    let ankle = point(landmarks, LandmarkIndex::ankle(side));

    let angles = AngleSet {
        primary,
        depth_joint: primary,
        torso_lean: geometry::angle_with_vertical(shoulder, hip),
        shin_lean: geometry::angle_with_vertical(knee, ankle),
        offset: offset(landmarks),
    };

    (
        Measurement {
            angles,
            body_line_dev: 0.0,
            flare: geometry::angle_at_point(elbow, shoulder, hip),
        },
        side,
    )
}

/// ロウ: 主角は両肘平均。引きの勢いは速度ウィンドウ側で判定する
pub(crate) fn measure_row(landmarks: &[Landmark]) -> (Measurement, Side) {
    let left_elbow = geometry::elbow_angle(landmarks, Side::Left);
    let right_elbow = geometry::elbow_angle(landmarks, Side::Right);
    let side = if left_elbow < right_elbow {
        Side::Left
    } else {
        Side::Right
    };
    let primary = (left_elbow + right_elbow) / 2.0;

    let shoulder = point(landmarks, LandmarkIndex::shoulder(side));
    let hip = point(landmarks, LandmarkIndex::hip(side));
    let knee = point(landmarks, LandmarkIndex::knee(side));
    let ankle = point(landmarks, LandmarkIndex::ankle(side));

    let angles = AngleSet {
        primary,
        depth_joint: primary,
        torso_lean: geometry::angle_with_vertical(shoulder, hip),
        shin_lean: geometry::angle_with_vertical(knee, ankle),
        offset: offset(landmarks),
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

#[cfg(test)]
mod tests {
    use super::*;

    /// 肘角が elbow_deg になる手首位置 (肩→肘の向きを基準に回転)
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

    fn place(lm: &mut [Landmark], left: LandmarkIndex, right: LandmarkIndex, x: f32, y: f32) {
        lm[left as usize] = Landmark::new(x - 0.01, y, 1.0);
        lm[right as usize] = Landmark::new(x + 0.01, y, 1.0);
    }

    fn deadlift_frame(hinged: bool, lean_deg: f32) -> Vec<Landmark> {
        let mut lm = vec![Landmark::new(0.5, 0.5, 1.0); LandmarkIndex::COUNT];
        let hip = (0.5, 0.45);
        place(&mut lm, LandmarkIndex::LeftHip, LandmarkIndex::RightHip, hip.0, hip.1);
        if hinged {
            let lean = lean_deg.to_radians();
            let shoulder = (hip.0 + 0.3 * lean.sin(), hip.1 - 0.3 * lean.cos());
            place(
                &mut lm,
                LandmarkIndex::LeftShoulder,
                LandmarkIndex::RightShoulder,
                shoulder.0,
                shoulder.1,
            );
            lm[LandmarkIndex::Nose as usize] = Landmark::new(shoulder.0, shoulder.1 - 0.05, 1.0);
            place(&mut lm, LandmarkIndex::LeftKnee, LandmarkIndex::RightKnee, 0.58, 0.63);
            place(&mut lm, LandmarkIndex::LeftAnkle, LandmarkIndex::RightAnkle, 0.6, 0.85);
        } else {
            place(&mut lm, LandmarkIndex::LeftShoulder, LandmarkIndex::RightShoulder, 0.5, 0.15);
            lm[LandmarkIndex::Nose as usize] = Landmark::new(0.5, 0.08, 1.0);
            place(&mut lm, LandmarkIndex::LeftKnee, LandmarkIndex::RightKnee, 0.5, 0.65);
            place(&mut lm, LandmarkIndex::LeftAnkle, LandmarkIndex::RightAnkle, 0.5, 0.85);
        }
        lm
    }

    fn bench_frame(elbow_deg: f32, flared: bool) -> Vec<Landmark> {
        let mut lm = vec![Landmark::new(0.5, 0.5, 1.0); LandmarkIndex::COUNT];
        let shoulder = (0.4, 0.55);
        let elbow = if flared { (0.32, 0.66) } else { (0.43, 0.67) };
        place(
            &mut lm,
            LandmarkIndex::LeftShoulder,
            LandmarkIndex::RightShoulder,
            shoulder.0,
            shoulder.1,
        );
        place(&mut lm, LandmarkIndex::LeftElbow, LandmarkIndex::RightElbow, elbow.0, elbow.1);
        place(&mut lm, LandmarkIndex::LeftHip, LandmarkIndex::RightHip, 0.6, 0.57);
        let wrist = wrist_for(shoulder, elbow, elbow_deg);
        place(&mut lm, LandmarkIndex::LeftWrist, LandmarkIndex::RightWrist, wrist.0, wrist.1);
        lm
    }

    fn row_frame(elbow_deg: f32) -> Vec<Landmark> {
        let mut lm = vec![Landmark::new(0.5, 0.5, 1.0); LandmarkIndex::COUNT];
        let shoulder = (0.42, 0.4);
        let elbow = (0.46, 0.52);
        place(
            &mut lm,
            LandmarkIndex::LeftShoulder,
            LandmarkIndex::RightShoulder,
            shoulder.0,
            shoulder.1,
        );
        place(&mut lm, LandmarkIndex::LeftElbow, LandmarkIndex::RightElbow, elbow.0, elbow.1);
        place(&mut lm, LandmarkIndex::LeftHip, LandmarkIndex::RightHip, 0.6, 0.55);
        let wrist = wrist_for(shoulder, elbow, elbow_deg);
        place(&mut lm, LandmarkIndex::LeftWrist, LandmarkIndex::RightWrist, wrist.0, wrist.1);
        lm
    }

    #[test]
    fn test_latch_cycle() {
        // beginner デッドリフト相当
        let mut m = LatchMachine::new(100.0, 160.0);
        assert_eq!(m.update(178.0), PhaseEvent::None);
        // しきい値の間 → 保持
        assert_eq!(m.update(130.0), PhaseEvent::None);
        assert_eq!(m.phase(), Phase::Start);

        assert_eq!(m.update(95.0), PhaseEvent::Entered(Phase::Bottom));
        // ボトム内の揺れはイベントなし
        assert_eq!(m.update(90.0), PhaseEvent::None);
        assert_eq!(m.update(130.0), PhaseEvent::None);
        assert_eq!(m.phase(), Phase::Bottom);

        assert_eq!(m.update(165.0), PhaseEvent::RepComplete);
        assert_eq!(m.phase(), Phase::Start);
    }

    #[test]
    fn test_no_double_count_at_boundary() {
        let mut m = LatchMachine::new(100.0, 160.0);
        m.update(95.0);
        assert_eq!(m.update(165.0), PhaseEvent::RepComplete);
        // そのまま上で揺れても 2 回目は出ない
        assert_eq!(m.update(170.0), PhaseEvent::None);
        assert_eq!(m.update(162.0), PhaseEvent::None);
    }

    #[test]
    fn test_two_full_cycles_two_reps() {
        let mut m = LatchMachine::new(100.0, 160.0);
        let mut reps = 0;
        for angle in [178.0, 120.0, 95.0, 120.0, 170.0, 110.0, 92.0, 168.0] {
            if m.update(angle) == PhaseEvent::RepComplete {
                reps += 1;
            }
        }
        assert_eq!(reps, 2);
    }

    #[test]
    fn test_measure_deadlift_standing() {
        let (measurement, _) = measure_deadlift(&deadlift_frame(false, 0.0));
        assert!(measurement.angles.primary > 170.0);
        assert!(measurement.angles.torso_lean < 2.0);
    }

    #[test]
    fn test_measure_deadlift_hinged() {
        let (measurement, _) = measure_deadlift(&deadlift_frame(true, 60.0));
        assert!(
            measurement.angles.primary < 100.0,
            "hip angle = {}",
            measurement.angles.primary
        );
        assert!((measurement.angles.torso_lean - 60.0).abs() < 3.0);
    }

    #[test]
    fn test_measure_bench_flare() {
        let (tucked, _) = measure_bench(&bench_frame(90.0, false));
        let (flared, _) = measure_bench(&bench_frame(90.0, true));
        assert!(tucked.flare < 85.0, "tucked flare = {}", tucked.flare);
        assert!(flared.flare > 85.0, "flared flare = {}", flared.flare);
    }

    #[test]
    fn test_measure_bench_primary() {
        for target in [160.0, 90.0, 70.0] {
            let (measurement, _) = measure_bench(&bench_frame(target, false));
            assert!(
                (measurement.angles.primary - target).abs() < 2.0,
                "target {} got {}",
                target,
                measurement.angles.primary
            );
        }
    }

    #[test]
    fn test_measure_row_primary() {
        for target in [170.0, 75.0] {
            let (measurement, _) = measure_row(&row_frame(target));
            assert!(
                (measurement.angles.primary - target).abs() < 2.0,
                "target {} got {}",
                target,
                measurement.angles.primary
            );
        }
    }
}
