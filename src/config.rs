use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// 判定の厳しさ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Beginner,
    Pro,
}

impl Default for Mode {
    fn default() -> Self {
        Mode::Beginner
    }
}

impl Mode {
    /// 大文字小文字を無視して解釈する。不明な文字列は Beginner に倒す
    pub fn parse(s: &str) -> Mode {
        match s.to_ascii_lowercase().as_str() {
            "pro" => Mode::Pro,
            _ => Mode::Beginner,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Beginner => "beginner",
            Mode::Pro => "pro",
        }
    }
}

/// 角度しきい値プロファイル (度)
///
/// モードごとの定数一式。実測に基づくキャリブレーション値なので
/// 式からは導出しない。範囲の隙間 (例: s1_max と s2_min の間) は
/// 現在の状態を保持するヒステリシス帯として機能する。
#[derive(Debug, Clone)]
pub struct Thresholds {
    // 共通
    /// ランドマーク信頼度の下限
    pub visibility_min: f32,
    /// 画面端マージン (正規化座標)
    pub edge_margin: f32,
    /// 解析開始に必要な連続クリーンフレーム数
    pub frames_required: u32,
    /// 鼻-両肩の角度がこれを超えたら正面向きと見なす
    pub offset_max: f32,
    /// 無動作と見なすまでの秒数
    pub inactive_secs: f32,

    // スクワット (膝-鉛直角)
    pub squat_s1_max: f32,
    pub squat_s2_min: f32,
    pub squat_s2_max: f32,
    pub squat_s3_min: f32,
    pub squat_s3_max: f32,
    /// 胴体前傾の許容帯 (min 未満 = 前傾不足, max 超 = 前傾過多)
    pub torso_lean_min: f32,
    pub torso_lean_max: f32,
    /// 下降中に「もっと腰を落として」を出す帯
    pub lower_hips_min: f32,
    pub lower_hips_max: f32,
    /// 脛-鉛直角がこれを超えたら膝が爪先より前
    pub shin_lean_max: f32,
    /// 膝-鉛直角がこれを超えたらしゃがみ過ぎ
    pub deep_squat_max: f32,

    // プッシュアップ (肘角)
    pub pushup_start_min: f32,
    pub pushup_bottom_max: f32,
    /// 肩-腰-足首の直線からの許容ずれ
    pub body_line_max: f32,
    /// スタート姿勢で要求する肘の伸び
    pub lockout_min: f32,

    // カール (肘角)
    pub curl_extended_min: f32,
    pub curl_contracted_max: f32,
    /// 反動と見なす角速度 (度/フレーム)
    pub curl_velocity_max: f32,

    // デッドリフト (股関節角)
    pub deadlift_bottom_max: f32,
    pub deadlift_start_min: f32,
    /// 胴体-鉛直角がこれを超えたら背中が丸まっている
    pub back_lean_max: f32,

    // ベンチプレス (肘角)
    pub bench_bottom_max: f32,
    pub bench_start_min: f32,
    /// 肘-肩-腰の角度がこれを超えたら肘の開き過ぎ
    pub elbow_flare_max: f32,

    // ロウ (肘角)
    pub row_bottom_max: f32,
    pub row_start_min: f32,
    pub row_velocity_max: f32,
}

impl Thresholds {
    /// 初心者プロファイル。判定が緩く、無動作タイムアウトが長い
    pub fn beginner() -> Self {
        Self {
            visibility_min: 0.5,
            edge_margin: 0.03,
            frames_required: 3,
            offset_max: 45.0,
            inactive_secs: 20.0,

            squat_s1_max: 35.0,
            squat_s2_min: 38.0,
            squat_s2_max: 68.0,
            squat_s3_min: 72.0,
            squat_s3_max: 98.0,
            torso_lean_min: 18.0,
            torso_lean_max: 48.0,
            lower_hips_min: 48.0,
            lower_hips_max: 82.0,
            shin_lean_max: 35.0,
            deep_squat_max: 98.0,

            pushup_start_min: 150.0,
            pushup_bottom_max: 100.0,
            body_line_max: 25.0,
            lockout_min: 155.0,

            curl_extended_min: 150.0,
            curl_contracted_max: 60.0,
            curl_velocity_max: 10.0,

            deadlift_bottom_max: 100.0,
            deadlift_start_min: 160.0,
            back_lean_max: 70.0,

            bench_bottom_max: 80.0,
            bench_start_min: 150.0,
            elbow_flare_max: 85.0,

            row_bottom_max: 80.0,
            row_start_min: 150.0,
            row_velocity_max: 12.0,
        }
    }

    /// 上級者プロファイル。可動域の要求が広く、反動判定が厳しい
    pub fn pro() -> Self {
        Self {
            visibility_min: 0.5,
            edge_margin: 0.03,
            frames_required: 3,
            offset_max: 45.0,
            inactive_secs: 15.0,

            squat_s1_max: 32.0,
            squat_s2_min: 35.0,
            squat_s2_max: 65.0,
            squat_s3_min: 75.0,
            squat_s3_max: 95.0,
            torso_lean_min: 20.0,
            torso_lean_max: 45.0,
            lower_hips_min: 50.0,
            lower_hips_max: 80.0,
            shin_lean_max: 30.0,
            deep_squat_max: 95.0,

            pushup_start_min: 160.0,
            pushup_bottom_max: 90.0,
            body_line_max: 20.0,
            lockout_min: 165.0,

            curl_extended_min: 160.0,
            curl_contracted_max: 50.0,
            curl_velocity_max: 8.0,

            deadlift_bottom_max: 90.0,
            deadlift_start_min: 165.0,
            back_lean_max: 65.0,

            bench_bottom_max: 70.0,
            bench_start_min: 160.0,
            elbow_flare_max: 75.0,

            row_bottom_max: 70.0,
            row_start_min: 160.0,
            row_velocity_max: 9.0,
        }
    }

    pub fn for_mode(mode: Mode) -> Self {
        match mode {
            Mode::Beginner => Self::beginner(),
            Mode::Pro => Self::pro(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    /// 種目 ID (e.g. "squat", "pushup", "bicep_curl")
    #[serde(default = "default_exercise")]
    pub exercise: String,
    /// 判定モード
    #[serde(default)]
    pub mode: Mode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReplayConfig {
    /// ランドマーク JSONL の入力パス
    #[serde(default = "default_input")]
    pub input: String,
    /// フレームログの間引き (N フレームに 1 回)
    #[serde(default = "default_print_every")]
    pub print_every: usize,
    /// ログ出力ディレクトリ
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

fn default_exercise() -> String { "squat".to_string() }
fn default_input() -> String { "frames.jsonl".to_string() }
fn default_print_every() -> usize { 15 }
fn default_log_dir() -> String { "logs".to_string() }

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            exercise: default_exercise(),
            mode: Mode::default(),
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            input: default_input(),
            print_every: default_print_every(),
            log_dir: default_log_dir(),
        }
    }
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("failed to read {}", path.as_ref().display()))?;
        let config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.as_ref().display()))?;
        Ok(config)
    }

    /// ファイルが無ければ既定値で起動する
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}
