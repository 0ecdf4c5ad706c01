use serde::{Deserialize, Serialize};

/// MediaPipe Pose の 33 ランドマークインデックス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum LandmarkIndex {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

impl LandmarkIndex {
    pub const COUNT: usize = 33;

    pub fn from_index(index: usize) -> Option<Self> {
        use LandmarkIndex::*;
        match index {
            0 => Some(Nose),
            1 => Some(LeftEyeInner),
            2 => Some(LeftEye),
            3 => Some(LeftEyeOuter),
            4 => Some(RightEyeInner),
            5 => Some(RightEye),
            6 => Some(RightEyeOuter),
            7 => Some(LeftEar),
            8 => Some(RightEar),
            9 => Some(MouthLeft),
            10 => Some(MouthRight),
            11 => Some(LeftShoulder),
            12 => Some(RightShoulder),
            13 => Some(LeftElbow),
            14 => Some(RightElbow),
            15 => Some(LeftWrist),
            16 => Some(RightWrist),
            17 => Some(LeftPinky),
            18 => Some(RightPinky),
            19 => Some(LeftIndex),
            20 => Some(RightIndex),
            21 => Some(LeftThumb),
            22 => Some(RightThumb),
            23 => Some(LeftHip),
            24 => Some(RightHip),
            25 => Some(LeftKnee),
            26 => Some(RightKnee),
            27 => Some(LeftAnkle),
            28 => Some(RightAnkle),
            29 => Some(LeftHeel),
            30 => Some(RightHeel),
            31 => Some(LeftFootIndex),
            32 => Some(RightFootIndex),
            _ => None,
        }
    }

    /// 可視性ゲートのデバッグ表示用の短縮名
    pub fn short_name(&self) -> &'static str {
        use LandmarkIndex::*;
        match self {
            Nose => "Nose",
            LeftShoulder => "L.Shoulder",
            RightShoulder => "R.Shoulder",
            LeftElbow => "L.Elbow",
            RightElbow => "R.Elbow",
            LeftWrist => "L.Wrist",
            RightWrist => "R.Wrist",
            LeftHip => "L.Hip",
            RightHip => "R.Hip",
            LeftKnee => "L.Knee",
            RightKnee => "R.Knee",
            LeftAnkle => "L.Ankle",
            RightAnkle => "R.Ankle",
            LeftFootIndex => "L.Foot",
            RightFootIndex => "R.Foot",
            _ => "Other",
        }
    }

    pub fn shoulder(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftShoulder,
            Side::Right => Self::RightShoulder,
        }
    }

    pub fn elbow(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftElbow,
            Side::Right => Self::RightElbow,
        }
    }

    pub fn wrist(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftWrist,
            Side::Right => Self::RightWrist,
        }
    }

    pub fn hip(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftHip,
            Side::Right => Self::RightHip,
        }
    }

    pub fn knee(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftKnee,
            Side::Right => Self::RightKnee,
        }
    }

    pub fn ankle(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftAnkle,
            Side::Right => Self::RightAnkle,
        }
    }

    pub fn foot(side: Side) -> Self {
        match side {
            Side::Left => Self::LeftFootIndex,
            Side::Right => Self::RightFootIndex,
        }
    }
}

/// 体の左右。サイド依存の関節選択に使う
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// 単一ランドマーク
///
/// x/y は正規化画像座標 (0.0〜1.0)。z は腰基準の相対深度だが
/// 単眼推定では信頼できないため、角度計算はすべて 2D で行う。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    /// 検出信頼度 (0.0〜1.0)
    #[serde(default = "default_visibility")]
    pub visibility: f32,
}

fn default_visibility() -> f32 {
    1.0
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility,
        }
    }

    /// 信頼度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.visibility >= threshold
    }

    pub fn point(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

impl Default for Landmark {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
            visibility: 0.0,
        }
    }
}

/// インデックスの座標を返す。範囲外なら None
pub fn point_of(landmarks: &[Landmark], index: LandmarkIndex) -> Option<(f32, f32)> {
    landmarks.get(index as usize).map(|lm| lm.point())
}
