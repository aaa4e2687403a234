//! 膝角平滑与运动速度估计
//!
//! 检测器的关键点抖动会让单帧膝角出现尖峰，直接送进状态机会造成虚假的阶段切换。
//! 这里用固定窗口的滑动平均平滑膝角，并用平滑后相邻两帧的差值估计速度（度/帧）。
//! 速度同样保留一个有界历史，下游使用其均值作为去噪后的运动快慢信号。

use std::collections::VecDeque;

use crate::analysis::config::SmoothingConfig;

#[derive(Debug, Clone)]
pub struct SignalSmoother {
    angle_window: usize,
    velocity_window: usize,
    /// 最近的原始膝角
    angle_history: VecDeque<f64>,
    /// 最近的帧间速度
    velocity_history: VecDeque<f64>,
    last_smoothed: Option<f64>,
}

impl SignalSmoother {
    pub fn new(config: &SmoothingConfig) -> Self {
        let angle_window = config.angle_window.max(1);
        let velocity_window = config.velocity_window.max(1);
        Self {
            angle_window,
            velocity_window,
            angle_history: VecDeque::with_capacity(angle_window + 1),
            velocity_history: VecDeque::with_capacity(velocity_window + 1),
            last_smoothed: None,
        }
    }

    /// 压入一帧原始膝角，返回窗口均值
    pub fn smooth(&mut self, raw_angle: f64) -> f64 {
        self.angle_history.push_back(raw_angle);
        while self.angle_history.len() > self.angle_window {
            self.angle_history.pop_front();
        }
        self.angle_history.iter().sum::<f64>() / self.angle_history.len() as f64
    }

    /// 与上一帧平滑值的差的绝对值，首帧为 0；结果同时写入速度历史
    pub fn velocity(&mut self, smoothed_angle: f64) -> f64 {
        let velocity = self
            .last_smoothed
            .map(|prev| (smoothed_angle - prev).abs())
            .unwrap_or(0.0);
        self.last_smoothed = Some(smoothed_angle);

        self.velocity_history.push_back(velocity);
        while self.velocity_history.len() > self.velocity_window {
            self.velocity_history.pop_front();
        }
        velocity
    }

    pub fn average_velocity(&self) -> f64 {
        if self.velocity_history.is_empty() {
            return 0.0;
        }
        self.velocity_history.iter().sum::<f64>() / self.velocity_history.len() as f64
    }

    pub fn angle_history_len(&self) -> usize {
        self.angle_history.len()
    }

    pub fn velocity_history_len(&self) -> usize {
        self.velocity_history.len()
    }

    pub fn reset(&mut self) {
        self.angle_history.clear();
        self.velocity_history.clear();
        self.last_smoothed = None;
    }
}
