//! 增益包络
//!
//! 声明式的 (时间, 目标增益, 过渡方式) 控制点序列。
//! 语义与离线音频图的自动化调度一致：
//! - Step: 到达该时间点时跳变
//! - Linear: 从上一个控制点线性过渡，恰好在该时间点到达目标值

use super::errors::MixError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampKind {
    Step,
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    /// 绝对时间（秒）
    pub time: f64,
    pub gain: f32,
    pub ramp: RampKind,
}

impl ControlPoint {
    pub fn step(time: f64, gain: f32) -> Self {
        Self {
            time,
            gain,
            ramp: RampKind::Step,
        }
    }

    pub fn linear(time: f64, gain: f32) -> Self {
        Self {
            time,
            gain,
            ramp: RampKind::Linear,
        }
    }
}

/// 控制点按时间非递减排列
#[derive(Debug, Clone, PartialEq)]
pub struct GainEnvelope {
    points: Vec<ControlPoint>,
}

impl GainEnvelope {
    pub fn new(points: Vec<ControlPoint>) -> Result<Self, MixError> {
        if points.is_empty() {
            return Err(MixError::InvalidEnvelope("no control points".to_string()));
        }
        if points.iter().any(|p| !p.time.is_finite()) {
            return Err(MixError::InvalidEnvelope("non-finite control point time".to_string()));
        }
        if points.windows(2).any(|w| w[1].time < w[0].time) {
            return Err(MixError::InvalidEnvelope(
                "control points must be non-decreasing in time".to_string(),
            ));
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    /// 计算 t 时刻的增益
    ///
    /// 第一个控制点之前保持其值，最后一个之后保持其值
    pub fn gain_at(&self, t: f64) -> f32 {
        let next_idx = self.points.partition_point(|p| p.time <= t);

        if next_idx == 0 {
            return self.points[0].gain;
        }
        if next_idx == self.points.len() {
            return self.points[next_idx - 1].gain;
        }

        let prev = self.points[next_idx - 1];
        let next = self.points[next_idx];
        match next.ramp {
            RampKind::Step => prev.gain,
            RampKind::Linear => {
                let span = next.time - prev.time;
                if span <= 0.0 {
                    return next.gain;
                }
                let frac = ((t - prev.time) / span) as f32;
                prev.gain + (next.gain - prev.gain) * frac
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_rejects_out_of_order_points() {
        let result = GainEnvelope::new(vec![
            ControlPoint::step(1.0, 0.5),
            ControlPoint::linear(0.5, 0.0),
        ]);
        assert!(result.is_err());
        assert!(GainEnvelope::new(vec![]).is_err());
    }

    #[test]
    fn test_step_then_linear_fade() {
        // 0.8 保持到 1s，然后 2s 内线性降到 0
        let env = GainEnvelope::new(vec![
            ControlPoint::step(0.0, 0.8),
            ControlPoint::step(1.0, 0.8),
            ControlPoint::linear(3.0, 0.0),
        ])
        .unwrap();

        assert!(approx(env.gain_at(0.0), 0.8));
        assert!(approx(env.gain_at(0.999), 0.8));
        assert!(approx(env.gain_at(2.0), 0.4));
        assert!(approx(env.gain_at(3.0), 0.0));
        assert!(approx(env.gain_at(10.0), 0.0));
    }

    #[test]
    fn test_before_first_point_holds_first_value() {
        let env = GainEnvelope::new(vec![
            ControlPoint::step(5.0, 0.0),
            ControlPoint::linear(7.0, 0.8),
        ])
        .unwrap();
        assert!(approx(env.gain_at(0.0), 0.0));
        assert!(approx(env.gain_at(6.0), 0.4));
        assert!(approx(env.gain_at(8.0), 0.8));
    }

    #[test]
    fn test_zero_length_ramp_jumps() {
        let env = GainEnvelope::new(vec![
            ControlPoint::step(0.0, 0.8),
            ControlPoint::step(0.0, 0.8),
            ControlPoint::linear(0.0, 0.0),
        ])
        .unwrap();
        assert!(approx(env.gain_at(0.0), 0.0));
    }
}
