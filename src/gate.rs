//! 可視性ゲート
//!
//! 必要なランドマークが揃った安定フレームが連続するまで解析を止める。
//! 1 フレームでも欠けるとカウンタは 0 に戻る (チャタリング防止)。

use crate::pose::{Landmark, LandmarkIndex};

/// 1 フレーム分の可視性判定
///
/// 失格条件 (landmark ごと):
/// - インデックスが配列範囲外 → 即座に "Incomplete pose data"
/// - x or y が画面端マージン内 → `(edge)`
/// - visibility が閾値未満 → `(vis)`
///
/// 理由文字列には先頭 3 件までを載せる。
pub fn check_visibility(
    landmarks: &[Landmark],
    required: &[LandmarkIndex],
    visibility_min: f32,
    edge_margin: f32,
) -> (bool, String) {
    let mut missing: Vec<String> = Vec::new();

    for &index in required {
        let lm = match landmarks.get(index as usize) {
            Some(lm) => lm,
            None => return (false, "Incomplete pose data".to_string()),
        };

        let near_edge = lm.x < edge_margin
            || lm.x > 1.0 - edge_margin
            || lm.y < edge_margin
            || lm.y > 1.0 - edge_margin;
        if near_edge {
            missing.push(format!("{}(edge)", index.short_name()));
            continue;
        }

        if !lm.is_valid(visibility_min) {
            missing.push(format!("{}(vis)", index.short_name()));
        }
    }

    if missing.is_empty() {
        (true, "Full body visible".to_string())
    } else {
        missing.truncate(3);
        (false, format!("Missing: {}", missing.join(", ")))
    }
}

/// このフレームの判定とデバウンス後の準備状態
#[derive(Debug, Clone)]
pub struct GateReport {
    /// このフレーム単体がクリーンか
    pub clean: bool,
    /// 連続クリーンが規定数に達したか
    pub ready: bool,
    pub reason: String,
}

/// 連続クリーンフレームのカウンタ
#[derive(Debug, Clone)]
pub struct VisibilityGate {
    visibility_min: f32,
    edge_margin: f32,
    frames_required: u32,
    clean_frames: u32,
}

impl VisibilityGate {
    pub fn new(visibility_min: f32, edge_margin: f32, frames_required: u32) -> Self {
        Self {
            visibility_min,
            edge_margin,
            frames_required,
            clean_frames: 0,
        }
    }

    /// フレームを評価してカウンタを進める
    pub fn update(&mut self, landmarks: &[Landmark], required: &[LandmarkIndex]) -> GateReport {
        let (clean, reason) =
            check_visibility(landmarks, required, self.visibility_min, self.edge_margin);

        if clean {
            self.clean_frames = self.clean_frames.saturating_add(1);
        } else {
            self.clean_frames = 0;
        }

        GateReport {
            clean,
            ready: self.clean_frames >= self.frames_required,
            reason,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.clean_frames >= self.frames_required
    }

    pub fn reset(&mut self) {
        self.clean_frames = 0;
    }
}
