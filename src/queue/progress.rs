/// 单次传输的进度过滤器
///
/// 回调可能乱序、重复，只有严格大于已记录值的进度才会被接受。
#[derive(Debug, Default)]
pub struct ProgressGate {
    current: f32,
}

impl ProgressGate {
    pub fn new() -> Self {
        Self { current: 0.0 }
    }

    /// Accepts a reported fraction only if it strictly exceeds the stored
    /// value. Returns the accepted (clamped to 1.0) value, or `None` if the
    /// report was stale.
    pub fn advance(&mut self, reported: f32) -> Option<f32> {
        let fraction = reported.min(1.0);
        if fraction > self.current {
            self.current = fraction;
            Some(fraction)
        } else {
            None
        }
    }

    pub fn value(&self) -> f32 {
        self.current
    }

    /// 完成的必要条件，完成信号以后端为准
    pub fn is_complete(&self) -> bool {
        self.current >= 1.0
    }

    /// 每次新传输开始时归零
    pub fn reset(&mut self) {
        self.current = 0.0;
    }
}
