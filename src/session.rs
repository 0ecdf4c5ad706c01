//! セッション状態の集計
//!
//! カウンタ・レップ履歴・フィードバックヒストグラム・無動作監視を
//! 1 箇所で持つ。状態機械 (trainer/) はここへ記録を流すだけで、
//! 集計ロジックは持たない。

use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;

use crate::config::Mode;
use crate::feedback::FeedbackKind;
use crate::score;
use crate::trainer::{Exercise, Phase};

/// 主角がこれ以上動いたフレームを「活動中」と見なす (度)
const ACTIVITY_DELTA_DEG: f32 = 3.0;
/// 活動フレーム 1 枚あたりに加算する実働時間 (30fps 想定)
const ACTIVE_FRAME_SECS: f32 = 0.033;

const PHASE_BUFFER_CAP: usize = 3;

/// レップ 1 回分のフェーズ通過記録
///
/// 容量 3 固定。満杯時と直前と同じフェーズの push は黙って捨てる。
/// Start は記録しない運用 (途中フェーズの通過だけ見れば成立判定に足りる)。
#[derive(Debug, Clone, Copy)]
pub struct PhaseBuffer {
    phases: [Phase; PHASE_BUFFER_CAP],
    len: usize,
}

impl Default for PhaseBuffer {
    fn default() -> Self {
        Self {
            phases: [Phase::Start; PHASE_BUFFER_CAP],
            len: 0,
        }
    }
}

impl PhaseBuffer {
    pub fn push(&mut self, phase: Phase) {
        if self.len == PHASE_BUFFER_CAP {
            return;
        }
        if self.len > 0 && self.phases[self.len - 1] == phase {
            return;
        }
        self.phases[self.len] = phase;
        self.len += 1;
    }

    pub fn contains(&self, phase: Phase) -> bool {
        self.entries().contains(&phase)
    }

    pub fn entries(&self) -> &[Phase] {
        &self.phases[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}

/// 進行中レップの作業領域。finalize か無動作リセットで空に戻る
#[derive(Debug, Clone)]
pub struct RepScratch {
    pub buffer: PhaseBuffer,
    /// このレップ中に観測した関節角の最小値 (= 最深)
    pub min_angle: f32,
    pub severe_seen: bool,
    pub secondary_violation: bool,
    /// このレップ中に出た非中立フィードバック (重複なし)
    pub feedback_seen: Vec<FeedbackKind>,
    started_at: Option<Instant>,
}

impl Default for RepScratch {
    fn default() -> Self {
        Self {
            buffer: PhaseBuffer::default(),
            min_angle: 180.0,
            severe_seen: false,
            secondary_violation: false,
            feedback_seen: Vec::new(),
            started_at: None,
        }
    }
}

impl RepScratch {
    /// レップ開始時刻を一度だけ記録する
    pub fn begin(&mut self, now: Instant) {
        self.started_at.get_or_insert(now);
    }

    pub fn note_depth(&mut self, angle: f32) {
        if angle < self.min_angle {
            self.min_angle = angle;
        }
    }

    pub fn note_feedback(&mut self, kind: FeedbackKind) {
        if kind.is_neutral() {
            return;
        }
        if !self.feedback_seen.contains(&kind) {
            self.feedback_seen.push(kind);
        }
        if kind.is_severe() {
            self.severe_seen = true;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 確定済みレップ
#[derive(Debug, Clone, Serialize)]
pub struct RepRecord {
    pub index: u32,
    pub correct: bool,
    /// 最深時の関節角 (度)。小さいほど深い
    pub depth_angle: f32,
    pub depth_percent: f32,
    pub feedback: Vec<FeedbackKind>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    pub correct: u32,
    pub incorrect: u32,
    pub feedback_counts: BTreeMap<FeedbackKind, u32>,
    pub depth_angles: Vec<f32>,
    pub reps: Vec<RepRecord>,
    pub scratch: RepScratch,
    started_at: Instant,
    last_active: Instant,
    pub active_secs: f32,
}

impl SessionState {
    pub fn new(now: Instant) -> Self {
        Self {
            correct: 0,
            incorrect: 0,
            feedback_counts: BTreeMap::new(),
            depth_angles: Vec::new(),
            reps: Vec::new(),
            scratch: RepScratch::default(),
            started_at: now,
            last_active: now,
            active_secs: 0.0,
        }
    }

    /// ヒストグラムとレップ作業領域の両方へ記録する
    pub fn record_feedback(&mut self, kind: FeedbackKind) {
        if !kind.is_neutral() {
            *self.feedback_counts.entry(kind).or_insert(0) += 1;
        }
        self.scratch.note_feedback(kind);
    }

    pub fn severe_occurrences(&self) -> u32 {
        self.feedback_counts
            .iter()
            .filter(|(kind, _)| kind.is_severe())
            .map(|(_, count)| count)
            .sum()
    }

    /// 無動作監視。主角の変化で活動を検出し、一定時間止まっていたら
    /// カウンタと作業領域をソフトリセットする (履歴は残す)。
    ///
    /// 戻り値はリセットが起きたかどうか。
    pub fn track_activity(&mut self, primary_delta: f32, now: Instant, inactive_secs: f32) -> bool {
        if primary_delta.abs() > ACTIVITY_DELTA_DEG {
            self.last_active = now;
            self.active_secs += ACTIVE_FRAME_SECS;
            return false;
        }
        if self.idle_secs(now) > inactive_secs {
            self.soft_reset(now);
            return true;
        }
        false
    }

    pub fn idle_secs(&self, now: Instant) -> f32 {
        now.saturating_duration_since(self.last_active).as_secs_f32()
    }

    /// カウンタと進行中レップだけ消す。確定済みレップ・深さ系列・
    /// ヒストグラムは保持する
    pub fn soft_reset(&mut self, now: Instant) {
        self.correct = 0;
        self.incorrect = 0;
        self.scratch.reset();
        self.last_active = now;
    }

    /// レップ 1 回を確定する
    ///
    /// 成立条件: Bottom まで到達し、かつレップ中に severe も
    /// 副次違反も出ていないこと。深さ系列には成立レップの最深角
    /// だけを積む (不成立レップの深さは RepRecord にのみ残る)。
    pub fn finalize_rep(&mut self, depth_percent: f32, now: Instant) -> RepRecord {
        let scratch = &self.scratch;
        let correct = scratch.buffer.contains(Phase::Bottom)
            && !scratch.severe_seen
            && !scratch.secondary_violation;

        let duration_ms = scratch
            .started_at
            .map(|t| now.saturating_duration_since(t).as_millis() as u64)
            .unwrap_or(0);

        let record = RepRecord {
            index: self.reps.len() as u32 + 1,
            correct,
            depth_angle: scratch.min_angle,
            depth_percent,
            feedback: scratch.feedback_seen.clone(),
            duration_ms,
        };

        if correct {
            self.correct += 1;
            // 未観測 (180 のまま) も積まない
            if record.depth_angle < 180.0 {
                self.depth_angles.push(record.depth_angle);
            }
        } else {
            self.incorrect += 1;
        }
        self.reps.push(record.clone());
        self.scratch.reset();
        record
    }

    pub fn summary(&self, exercise: Exercise, mode: Mode, now: Instant) -> WorkoutSummary {
        let total = self.correct + self.incorrect;
        let accuracy_percent = if total > 0 {
            100.0 * self.correct as f32 / total as f32
        } else {
            0.0
        };

        let (avg_depth_angle, best_depth_angle) = if self.depth_angles.is_empty() {
            (180.0, 180.0)
        } else {
            let sum: f32 = self.depth_angles.iter().sum();
            let best = self.depth_angles.iter().copied().fold(f32::MAX, f32::min);
            (sum / self.depth_angles.len() as f32, best)
        };

        // 同数のときは宣言順で若い種別が勝つ
        let mut most_common_issue = None;
        let mut best_count = 0u32;
        for (kind, count) in &self.feedback_counts {
            if *count > best_count {
                best_count = *count;
                most_common_issue = Some(*kind);
            }
        }

        let form_score = score::form_score(
            self.correct,
            self.incorrect,
            &self.depth_angles,
            self.severe_occurrences(),
        );

        WorkoutSummary {
            exercise,
            mode,
            total_reps: total,
            correct_reps: self.correct,
            incorrect_reps: self.incorrect,
            accuracy_percent,
            avg_depth_angle,
            best_depth_angle,
            depth_angles: self.depth_angles.clone(),
            form_score,
            form_label: score::score_label(form_score),
            feedback_counts: self.feedback_counts.clone(),
            most_common_issue,
            duration_secs: now.saturating_duration_since(self.started_at).as_secs_f32(),
            active_secs: self.active_secs,
            reps: self.reps.clone(),
        }
    }
}

/// セッション終了時のまとめ。JSON でそのまま配れる形
#[derive(Debug, Clone, Serialize)]
pub struct WorkoutSummary {
    pub exercise: Exercise,
    pub mode: Mode,
    pub total_reps: u32,
    pub correct_reps: u32,
    pub incorrect_reps: u32,
    pub accuracy_percent: f32,
    pub avg_depth_angle: f32,
    pub best_depth_angle: f32,
    pub depth_angles: Vec<f32>,
    pub form_score: f32,
    pub form_label: &'static str,
    pub feedback_counts: BTreeMap<FeedbackKind, u32>,
    pub most_common_issue: Option<FeedbackKind>,
    pub duration_secs: f32,
    pub active_secs: f32,
    pub reps: Vec<RepRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_phase_buffer_dedup_and_cap() {
        let mut buffer = PhaseBuffer::default();
        buffer.push(Phase::Transition);
        buffer.push(Phase::Transition); // 直前と同じ → 捨てる
        assert_eq!(buffer.len(), 1);

        buffer.push(Phase::Bottom);
        buffer.push(Phase::Transition);
        assert_eq!(buffer.len(), 3);

        buffer.push(Phase::Bottom); // 満杯 → 捨てる
        assert_eq!(buffer.len(), 3);
        assert_eq!(
            buffer.entries(),
            &[Phase::Transition, Phase::Bottom, Phase::Transition]
        );
        assert!(buffer.contains(Phase::Bottom));

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(!buffer.contains(Phase::Bottom));
    }

    #[test]
    fn test_scratch_feedback_unique_and_severe() {
        let mut scratch = RepScratch::default();
        scratch.note_feedback(FeedbackKind::Ready); // 中立は無視
        scratch.note_feedback(FeedbackKind::LowerHips);
        scratch.note_feedback(FeedbackKind::LowerHips);
        scratch.note_feedback(FeedbackKind::KneeOverToes);
        assert_eq!(
            scratch.feedback_seen,
            vec![FeedbackKind::LowerHips, FeedbackKind::KneeOverToes]
        );
        assert!(scratch.severe_seen);
    }

    #[test]
    fn test_finalize_correct_rep() {
        let t0 = Instant::now();
        let mut state = SessionState::new(t0);
        state.scratch.begin(t0);
        state.scratch.buffer.push(Phase::Transition);
        state.scratch.buffer.push(Phase::Bottom);
        state.scratch.note_depth(95.0);
        state.scratch.note_depth(88.0);
        state.scratch.note_depth(92.0);

        let record = state.finalize_rep(97.0, t0 + Duration::from_millis(1800));
        assert!(record.correct);
        assert_eq!(record.index, 1);
        assert_eq!(record.depth_angle, 88.0);
        assert_eq!(record.duration_ms, 1800);
        assert_eq!(state.correct, 1);
        assert_eq!(state.incorrect, 0);
        assert_eq!(state.depth_angles, vec![88.0]);
        // 作業領域は空に戻る
        assert!(state.scratch.buffer.is_empty());
        assert_eq!(state.scratch.min_angle, 180.0);
    }

    #[test]
    fn test_finalize_shallow_rep_incorrect() {
        let t0 = Instant::now();
        let mut state = SessionState::new(t0);
        // Bottom に届かず Transition だけで戻った
        state.scratch.buffer.push(Phase::Transition);
        let record = state.finalize_rep(40.0, t0);
        assert!(!record.correct);
        assert_eq!(state.incorrect, 1);
        assert!(state.depth_angles.is_empty());
    }

    #[test]
    fn test_depth_series_collects_correct_reps_only() {
        let t0 = Instant::now();
        let mut state = SessionState::new(t0);

        // 成立レップ (最深 80 度)
        state.scratch.buffer.push(Phase::Transition);
        state.scratch.buffer.push(Phase::Bottom);
        state.scratch.note_depth(80.0);
        state.finalize_rep(90.0, t0);

        // 浅い不成立レップ (最深 120 度) は系列に入らない
        state.scratch.buffer.push(Phase::Transition);
        state.scratch.note_depth(120.0);
        let record = state.finalize_rep(40.0, t0);
        assert!(!record.correct);
        assert_eq!(record.depth_angle, 120.0); // 記録自体には残る

        let summary = state.summary(Exercise::Squat, Mode::Beginner, t0 + Duration::from_secs(30));
        assert_eq!(summary.depth_angles, vec![80.0]);
        assert_eq!(summary.avg_depth_angle, 80.0);
        assert_eq!(summary.best_depth_angle, 80.0);
        // 精度 25 + 単一標本のばらつき 25 + severe なし 25
        assert_eq!(summary.form_score, 75.0);
    }

    #[test]
    fn test_unobserved_depth_not_recorded() {
        let t0 = Instant::now();
        let mut state = SessionState::new(t0);
        // Bottom には達したが深さを一度も観測しなかった
        state.scratch.buffer.push(Phase::Transition);
        state.scratch.buffer.push(Phase::Bottom);
        let record = state.finalize_rep(0.0, t0);
        assert!(record.correct);
        assert_eq!(record.depth_angle, 180.0);
        assert!(state.depth_angles.is_empty());
    }

    #[test]
    fn test_finalize_severe_blocks_correct() {
        let t0 = Instant::now();
        let mut state = SessionState::new(t0);
        state.scratch.buffer.push(Phase::Transition);
        state.scratch.buffer.push(Phase::Bottom);
        state.record_feedback(FeedbackKind::KneeOverToes);
        let record = state.finalize_rep(95.0, t0);
        assert!(!record.correct);
        assert_eq!(record.feedback, vec![FeedbackKind::KneeOverToes]);
    }

    #[test]
    fn test_finalize_secondary_violation_blocks_correct() {
        let t0 = Instant::now();
        let mut state = SessionState::new(t0);
        state.scratch.buffer.push(Phase::Transition);
        state.scratch.buffer.push(Phase::Bottom);
        state.scratch.secondary_violation = true;
        assert!(!state.finalize_rep(95.0, t0).correct);
    }

    #[test]
    fn test_histogram_excludes_neutral() {
        let t0 = Instant::now();
        let mut state = SessionState::new(t0);
        state.record_feedback(FeedbackKind::Ready);
        state.record_feedback(FeedbackKind::None);
        state.record_feedback(FeedbackKind::BendForward);
        state.record_feedback(FeedbackKind::BendForward);
        assert_eq!(state.feedback_counts.len(), 1);
        assert_eq!(state.feedback_counts[&FeedbackKind::BendForward], 2);
    }

    #[test]
    fn test_severe_occurrences_counts_only_severe() {
        let t0 = Instant::now();
        let mut state = SessionState::new(t0);
        state.record_feedback(FeedbackKind::KneeOverToes);
        state.record_feedback(FeedbackKind::KneeOverToes);
        state.record_feedback(FeedbackKind::DeepSquat);
        state.record_feedback(FeedbackKind::LowerHips);
        assert_eq!(state.severe_occurrences(), 3);
    }

    #[test]
    fn test_activity_credit() {
        let t0 = Instant::now();
        let mut state = SessionState::new(t0);
        for i in 0..10 {
            let reset = state.track_activity(5.0, t0 + Duration::from_millis(33 * i), 20.0);
            assert!(!reset);
        }
        assert!((state.active_secs - 0.33).abs() < 1e-3);
    }

    #[test]
    fn test_inactivity_soft_reset_preserves_history() {
        let t0 = Instant::now();
        let mut state = SessionState::new(t0);
        state.scratch.buffer.push(Phase::Transition);
        state.scratch.buffer.push(Phase::Bottom);
        state.scratch.note_depth(95.0);
        state.record_feedback(FeedbackKind::LowerHips);
        state.finalize_rep(95.0, t0);
        assert_eq!(state.correct, 1);

        // 途中のレップが進行中
        state.scratch.buffer.push(Phase::Transition);

        // 21 秒静止 → ソフトリセット
        let reset = state.track_activity(0.5, t0 + Duration::from_secs(21), 20.0);
        assert!(reset);
        assert_eq!(state.correct, 0);
        assert_eq!(state.incorrect, 0);
        assert!(state.scratch.buffer.is_empty());
        // 履歴は無傷
        assert_eq!(state.reps.len(), 1);
        assert_eq!(state.depth_angles.len(), 1);
        assert_eq!(state.feedback_counts[&FeedbackKind::LowerHips], 1);
    }

    #[test]
    fn test_small_delta_does_not_rearm() {
        let t0 = Instant::now();
        let mut state = SessionState::new(t0);
        // 3 度以下の揺れは活動と見なさない
        assert!(!state.track_activity(2.0, t0 + Duration::from_secs(5), 20.0));
        assert_eq!(state.active_secs, 0.0);
        assert!(state.idle_secs(t0 + Duration::from_secs(5)) > 4.9);
    }

    #[test]
    fn test_summary_empty_session() {
        let t0 = Instant::now();
        let state = SessionState::new(t0);
        let summary = state.summary(Exercise::Squat, Mode::Beginner, t0 + Duration::from_secs(3));
        assert_eq!(summary.total_reps, 0);
        assert_eq!(summary.accuracy_percent, 0.0);
        assert_eq!(summary.avg_depth_angle, 180.0);
        assert_eq!(summary.best_depth_angle, 180.0);
        assert_eq!(summary.form_score, 0.0);
        assert_eq!(summary.form_label, "Needs Work");
        assert_eq!(summary.most_common_issue, None);
        assert!(summary.duration_secs >= 3.0);
    }

    #[test]
    fn test_summary_matches_counters() {
        let t0 = Instant::now();
        let mut state = SessionState::new(t0);
        for depth in [90.0, 88.0, 92.0] {
            state.scratch.buffer.push(Phase::Transition);
            state.scratch.buffer.push(Phase::Bottom);
            state.scratch.note_depth(depth);
            state.finalize_rep(95.0, t0);
        }
        state.scratch.buffer.push(Phase::Transition);
        state.finalize_rep(30.0, t0); // 浅い → 不成立

        let summary = state.summary(Exercise::Squat, Mode::Pro, t0 + Duration::from_secs(60));
        assert_eq!(summary.total_reps, 4);
        assert_eq!(summary.correct_reps, 3);
        assert_eq!(summary.incorrect_reps, 1);
        assert_eq!(summary.accuracy_percent, 75.0);
        assert_eq!(summary.best_depth_angle, 88.0);
        assert_eq!(summary.reps.len(), 4);
        assert!(summary.form_score > 0.0);
    }

    #[test]
    fn test_most_common_issue_tie_break() {
        let t0 = Instant::now();
        let mut state = SessionState::new(t0);
        state.record_feedback(FeedbackKind::LowerHips);
        state.record_feedback(FeedbackKind::BendForward);
        // 1:1 の同数 → 宣言順で若い BendForward
        let summary = state.summary(Exercise::Squat, Mode::Beginner, t0);
        assert_eq!(summary.most_common_issue, Some(FeedbackKind::BendForward));

        state.record_feedback(FeedbackKind::LowerHips);
        let summary = state.summary(Exercise::Squat, Mode::Beginner, t0);
        assert_eq!(summary.most_common_issue, Some(FeedbackKind::LowerHips));
    }
}
