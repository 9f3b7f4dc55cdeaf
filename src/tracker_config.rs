//! 跟踪器配置 - 通过JSON文件调整参数

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 检测 + 跟踪参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    // === 检测参数 ===
    pub detection_conf_threshold: f32, // 检测置信度阈值
    pub detection_iou_threshold: f32,  // NMS IOU阈值
    pub detection_batch_size: usize,   // 每批送入模型的帧数
    pub detection_input_size: u32,     // 模型输入尺寸 (正方形)
    pub class_names: Option<Vec<String>>, // 覆盖模型元数据中的类别名称

    // === ByteTrack参数 ===
    pub bytetrack_max_lost_frames: u32,      // 最大丢失帧数
    pub bytetrack_high_score_threshold: f32, // 高分阈值
    pub bytetrack_low_score_threshold: f32,  // 低分阈值
    pub bytetrack_high_iou_threshold: f32,   // 高分IOU阈值
    pub bytetrack_low_iou_threshold: f32,    // 低分IOU阈值
    pub bytetrack_kalman_obs_noise: f32,     // 卡尔曼观测噪声

    // === 卡尔曼滤波参数 ===
    pub kalman_process_noise: f32,        // 过程噪声 q
    pub kalman_velocity_decay: f32,       // 速度衰减
    pub kalman_stationary_threshold: f32, // 静止判定阈值(像素)
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            // 检测参数
            detection_conf_threshold: 0.10,
            detection_iou_threshold: 0.45,
            detection_batch_size: 20,
            detection_input_size: 640,
            class_names: None,

            // ByteTrack
            bytetrack_max_lost_frames: 30,
            bytetrack_high_score_threshold: 0.4,
            bytetrack_low_score_threshold: 0.1,
            bytetrack_high_iou_threshold: 0.3,
            bytetrack_low_iou_threshold: 0.2,
            bytetrack_kalman_obs_noise: 0.5,

            // 卡尔曼滤波
            kalman_process_noise: 0.1,
            kalman_velocity_decay: 0.95,
            kalman_stationary_threshold: 2.0,
        }
    }
}

impl TrackerConfig {
    /// 从JSON文件加载配置
    ///
    /// 文件不存在时写出默认配置;文件存在但无法解析时返回错误。
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("📝 配置文件 {} 不存在,创建默认配置", path.display());
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let json = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("配置文件解析失败: {}", path.display()))?;
        info!("✅ 配置已从 {} 加载", path.display());
        Ok(config)
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("序列化配置失败")?;
        fs::write(path, json).with_context(|| format!("保存配置失败: {}", path.display()))?;
        info!("💾 配置已保存到 {}", path.display());
        Ok(())
    }

    /// 打印当前配置
    pub fn log_summary(&self) {
        info!(
            conf = self.detection_conf_threshold,
            iou = self.detection_iou_threshold,
            batch = self.detection_batch_size,
            max_lost = self.bytetrack_max_lost_frames,
            obs_noise = self.bytetrack_kalman_obs_noise,
            "🎛️ 当前跟踪器配置"
        );
    }
}
