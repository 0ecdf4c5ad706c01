//! 主角の移動速度ウィンドウ
//!
//! 直近数フレームの角度から平均角速度 (度/フレーム) を出す。
//! 反動 (勢いで挙げる) の検出に使う。

const WINDOW: usize = 5;

#[derive(Debug, Clone)]
pub struct VelocityWindow {
    samples: [f32; WINDOW],
    len: usize,
}

impl Default for VelocityWindow {
    fn default() -> Self {
        Self {
            samples: [0.0; WINDOW],
            len: 0,
        }
    }
}

impl VelocityWindow {
    pub fn push(&mut self, angle: f32) {
        if self.len < WINDOW {
            self.samples[self.len] = angle;
            self.len += 1;
        } else {
            self.samples.rotate_left(1);
            self.samples[WINDOW - 1] = angle;
        }
    }

    /// 隣接サンプル差の絶対値平均。サンプル 2 本未満は 0.0
    pub fn velocity(&self) -> f32 {
        if self.len < 2 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 1..self.len {
            sum += (self.samples[i] - self.samples[i - 1]).abs();
        }
        sum / (self.len - 1) as f32
    }

    pub fn reset(&mut self) {
        self.len = 0;
    }
}
