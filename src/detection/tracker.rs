//! 多目标跟踪公共组件
//! Common components for multi-object tracking

use super::types::{BBox, Detection, TrackedDetection};

// ========== 卡尔曼滤波器 ==========

/// 简化卡尔曼滤波器 (用于单个边界框的位置和尺寸平滑)
/// 状态向量: [x_center, y_center, width, height, vx, vy, vw, vh]
#[derive(Clone, Debug)]
pub struct KalmanBoxFilter {
    /// 状态估计: [cx, cy, w, h, vx, vy, vw, vh]
    state: [f32; 8],

    /// 估计误差协方差 (简化为对角阵)
    p: [f32; 8],

    /// 过程噪声 (运动不确定性)
    q: f32,

    /// 观测噪声 (测量不确定性)
    r: f32,

    /// 速度衰减因子 (用于静止目标,0.9-0.99)
    velocity_decay: f32,

    /// 静止阈值 (像素/帧)
    stationary_threshold: f32,

    /// 连续静止帧数计数器
    stationary_count: u32,
}

impl KalmanBoxFilter {
    /// 创建新的卡尔曼滤波器
    ///
    /// # 参数
    /// - `bbox`: 初始边界框
    /// - `q`: 过程噪声 (0.1-1.0, 越小越平滑)
    /// - `r`: 观测噪声 (0.5-50.0, 越大越平滑)
    pub fn new(bbox: &BBox, q: f32, r: f32) -> Self {
        let (cx, cy) = bbox.center();

        Self {
            state: [cx, cy, bbox.width(), bbox.height(), 0.0, 0.0, 0.0, 0.0],
            p: [10.0; 8],
            q,
            r,
            velocity_decay: 0.95,
            stationary_threshold: 2.0,
            stationary_count: 0,
        }
    }

    /// 设置速度衰减与静止阈值
    pub fn with_motion(mut self, velocity_decay: f32, stationary_threshold: f32) -> Self {
        self.velocity_decay = velocity_decay;
        self.stationary_threshold = stationary_threshold;
        self
    }

    /// 预测下一帧状态 (匀速运动模型 + 速度衰减)
    pub fn predict(&mut self) {
        let speed = (self.state[4] * self.state[4] + self.state[5] * self.state[5]).sqrt();
        let is_stationary = speed < self.stationary_threshold;

        let decay = if is_stationary {
            self.stationary_count += 1;
            // 连续静止3帧后,大幅衰减速度
            if self.stationary_count > 3 {
                0.7
            } else {
                self.velocity_decay
            }
        } else {
            self.stationary_count = 0;
            self.velocity_decay
        };
        for v in &mut self.state[4..8] {
            *v *= decay;
        }

        // 状态转移: x = x + v
        for i in 0..4 {
            self.state[i] += self.state[i + 4];
        }

        // 协方差预测: P = P + Q
        let q_factor = if is_stationary { 0.5 } else { 1.0 };
        for p in &mut self.p {
            *p += self.q * q_factor;
        }
    }

    /// 更新 (融合观测值,自适应噪声调整)
    pub fn update(&mut self, bbox: &BBox) {
        let (cx, cy) = bbox.center();
        let y = [
            cx - self.state[0],
            cy - self.state[1],
            bbox.width() - self.state[2],
            bbox.height() - self.state[3],
        ];

        // 根据残差大小自适应调整观测噪声
        let residual_norm = (y[0] * y[0] + y[1] * y[1]).sqrt();
        let adaptive_r = if residual_norm < self.stationary_threshold {
            self.r * 0.3
        } else if residual_norm < 10.0 {
            self.r
        } else {
            self.r * 3.0
        };

        // 卡尔曼增益: K = P / (P + R), 速度分量观测噪声放大10倍
        let mut k = [0.0f32; 8];
        for i in 0..8 {
            let r = if i < 4 { adaptive_r } else { adaptive_r * 10.0 };
            k[i] = self.p[i] / (self.p[i] + r);
        }

        let velocity_gain = if residual_norm < self.stationary_threshold {
            0.3
        } else {
            1.0
        };
        for i in 0..4 {
            self.state[i] += k[i] * y[i];
            self.state[i + 4] += k[i + 4] * y[i] * velocity_gain;
        }

        // 协方差更新: P = (I - K) * P
        for i in 0..8 {
            self.p[i] *= 1.0 - k[i];
        }

        if residual_norm >= self.stationary_threshold {
            self.stationary_count = 0;
        }
    }

    fn bbox_from(cx: f32, cy: f32, w: f32, h: f32) -> BBox {
        let w = w.max(1.0);
        let h = h.max(1.0);
        BBox::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    /// 获取预测的边界框 (用于匹配)
    pub fn get_predicted_bbox(&self) -> BBox {
        Self::bbox_from(
            self.state[0] + self.state[4],
            self.state[1] + self.state[5],
            self.state[2] + self.state[6],
            self.state[3] + self.state[7],
        )
    }
}

// ========== 跟踪器统一接口 ==========

/// 多目标身份跟踪器 Trait
///
/// 输入一帧的检测框,输出本帧与轨迹关联上的检测框及其跟踪ID。
/// 同一目标在相邻帧中保持相同ID;新目标分配新ID;
/// 离开后重新出现的目标不保证恢复原ID。
pub trait IdentityTracker {
    /// 更新跟踪器
    fn update(&mut self, detections: &[Detection]) -> Vec<TrackedDetection>;

    /// 重置跟踪器 (清除所有跟踪)
    fn reset(&mut self);

    /// 获取当前跟踪数量
    fn track_count(&self) -> usize;
}
