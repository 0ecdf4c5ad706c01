//! フォームスコア計算
//!
//! 0〜100 点。精度 (0〜50) + 深さの一貫性 (0〜25) + 重大エラー減点 (0〜25)。

/// 重大フィードバック 1 件あたりの減点
const SEVERE_PENALTY: f32 = 2.0;

/// セッション全体のフォームスコア
///
/// カウンタも深さ系列も空 (= レップの記録が何もない) なら 0.0。
/// 深さ系列は成立レップのみなので、不成立だけのセッションは
/// 精度 0 + 一貫性 0 + 重大減点分で採点される。
/// 一貫性は深さ系列の平均絶対偏差 (MAD) で測る。外れ値 1 本に
/// 引きずられにくいので標準偏差より系列が短いうちに安定する。
pub fn form_score(correct: u32, incorrect: u32, depths: &[f32], severe_occurrences: u32) -> f32 {
    let total = correct + incorrect;
    if total == 0 && depths.is_empty() {
        return 0.0;
    }

    let accuracy = if total > 0 {
        50.0 * correct as f32 / total as f32
    } else {
        0.0
    };

    let consistency = match depths.len() {
        0 => 0.0,
        1 => 25.0,
        _ => (25.0 - mean_abs_deviation(depths)).max(0.0),
    };

    let severity = (25.0 - SEVERE_PENALTY * severe_occurrences as f32).max(0.0);

    (accuracy + consistency + severity).clamp(0.0, 100.0)
}

pub fn score_label(score: f32) -> &'static str {
    if score >= 80.0 {
        "Excellent"
    } else if score >= 60.0 {
        "Good"
    } else if score >= 40.0 {
        "Fair"
    } else {
        "Needs Work"
    }
}

fn mean_abs_deviation(values: &[f32]) -> f32 {
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    values.iter().map(|v| (v - mean).abs()).sum::<f32>() / values.len() as f32
}
