//! 2D 角度計算ユーティリティ
//!
//! すべて正規化画像座標 (x, y) 上で計算する。z (深度) は単眼推定では
//! 信頼できないため意図的に使わない。

use crate::pose::{Landmark, LandmarkIndex, Side};

/// 頂点 b における a-b-c の角度 (度)
///
/// 関節角度 (腰-膝-足首 → 膝の角度など) に使う。
/// どちらかのベクトルが零長なら 0.0 を返す。a と c の入れ替えに対して対称。
pub fn angle_at_point(a: (f32, f32), b: (f32, f32), c: (f32, f32)) -> f32 {
    let v1 = (a.0 - b.0, a.1 - b.1);
    let v2 = (c.0 - b.0, c.1 - b.1);

    let n1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let n2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();

    if n1 == 0.0 || n2 == 0.0 {
        return 0.0;
    }

    let cos_theta = ((v1.0 * v2.0 + v1.1 * v2.1) / (n1 * n2)).clamp(-1.0, 1.0);
    cos_theta.acos().to_degrees()
}

/// p1→p2 のベクトルと下向き鉛直軸のなす角 (度, 0〜180)
///
/// 画像座標では y が下向きに増えるので、鉛直 = (0, 1)。
/// 0 = 完全に鉛直、90 = 水平。胴体や脛の傾きに使う。
pub fn angle_with_vertical(p1: (f32, f32), p2: (f32, f32)) -> f32 {
    let line = (p2.0 - p1.0, p2.1 - p1.1);
    let norm = (line.0 * line.0 + line.1 * line.1).sqrt();

    if norm == 0.0 {
        return 0.0;
    }

    // dot((dx, dy), (0, 1)) = dy
    let cos_theta = (line.1 / norm).clamp(-1.0, 1.0);
    cos_theta.acos().to_degrees()
}

/// 鼻を頂点とした両肩のなす角 (度)
///
/// 正面向き判定用。小さい = 横向き (解析に適する)、大きい = 正面向き。
pub fn offset_angle(nose: (f32, f32), left_shoulder: (f32, f32), right_shoulder: (f32, f32)) -> f32 {
    angle_at_point(left_shoulder, nose, right_shoulder)
}

/// 3 つのランドマークインデックスから関節角度を計算する
///
/// いずれかが範囲外なら 180.0 (完全伸展) を返す。落ちない。
pub fn joint_angle(
    landmarks: &[Landmark],
    a: LandmarkIndex,
    b: LandmarkIndex,
    c: LandmarkIndex,
) -> f32 {
    let (pa, pb, pc) = match (
        crate::pose::point_of(landmarks, a),
        crate::pose::point_of(landmarks, b),
        crate::pose::point_of(landmarks, c),
    ) {
        (Some(pa), Some(pb), Some(pc)) => (pa, pb, pc),
        _ => return 180.0,
    };
    angle_at_point(pa, pb, pc)
}

/// 膝の関節角度 (腰-膝-足首)
pub fn knee_angle(landmarks: &[Landmark], side: Side) -> f32 {
    joint_angle(
        landmarks,
        LandmarkIndex::hip(side),
        LandmarkIndex::knee(side),
        LandmarkIndex::ankle(side),
    )
}

/// 肘の関節角度 (肩-肘-手首)
pub fn elbow_angle(landmarks: &[Landmark], side: Side) -> f32 {
    joint_angle(
        landmarks,
        LandmarkIndex::shoulder(side),
        LandmarkIndex::elbow(side),
        LandmarkIndex::wrist(side),
    )
}

/// 股関節の角度 (肩-腰-膝)
pub fn hip_angle(landmarks: &[Landmark], side: Side) -> f32 {
    joint_angle(
        landmarks,
        LandmarkIndex::shoulder(side),
        LandmarkIndex::hip(side),
        LandmarkIndex::knee(side),
    )
}
