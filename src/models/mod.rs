//! 检测模型接口与实现
//!
//! ## Detector Trait
//! 统一的检测器接口: 一批帧 → 每帧的检测结果
//!
//! ## 批处理
//! `detect_frames` 按固定批大小切分帧序列,逐批调用检测器后拼接结果,
//! 分批只是为了限制显存/内存峰值,不改变结果。
//!
//! ## 使用示例
//! ```no_run
//! use pitch_tracker_rs::models::{detect_frames, YOLOv8};
//! use pitch_tracker_rs::TrackerConfig;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut model = YOLOv8::new("models/best.onnx", &TrackerConfig::default())?;
//! let frames = vec![image::RgbImage::new(1920, 1080)];
//! let detections = detect_frames(&mut model, &frames, 20)?;
//! # Ok(())
//! # }
//! ```
use anyhow::{Context, Result};
use image::RgbImage;
use tracing::debug;

use crate::detection::FrameDetections;
use crate::error::PipelineError;

pub mod yolov8; // YOLOv8 ONNX 检测模型

pub use yolov8::{InputShape, YOLOv8};

/// 默认批大小
pub const DEFAULT_BATCH_SIZE: usize = 20;

/// 目标检测器
///
/// 实现者必须为每个输入帧按顺序返回一个 `FrameDetections`,
/// 低于置信度阈值的检测框应已被过滤。
pub trait Detector {
    fn predict(&mut self, frames: &[RgbImage]) -> Result<Vec<FrameDetections>>;
}

/// 首次检测时才构建的检测器
///
/// 轨迹直接从缓存读取时模型不会被加载。
pub struct LazyDetector<D, F> {
    init: Option<F>,
    detector: Option<D>,
}

impl<D, F> LazyDetector<D, F>
where
    D: Detector,
    F: FnOnce() -> Result<D>,
{
    pub fn new(init: F) -> Self {
        Self {
            init: Some(init),
            detector: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.detector.is_some()
    }
}

impl<D, F> Detector for LazyDetector<D, F>
where
    D: Detector,
    F: FnOnce() -> Result<D>,
{
    fn predict(&mut self, frames: &[RgbImage]) -> Result<Vec<FrameDetections>> {
        if self.detector.is_none() {
            let init = self.init.take().context("检测器此前初始化失败")?;
            self.detector = Some(init()?);
        }
        let detector = self.detector.as_mut().context("检测器未加载")?;
        detector.predict(frames)
    }
}

/// 分批检测所有帧
pub fn detect_frames<D: Detector + ?Sized>(
    detector: &mut D,
    frames: &[RgbImage],
    batch_size: usize,
) -> Result<Vec<FrameDetections>> {
    let batch_size = batch_size.max(1);
    let mut detections = Vec::with_capacity(frames.len());

    for (batch_idx, batch) in frames.chunks(batch_size).enumerate() {
        let batch_detections = detector.predict(batch)?;
        if batch_detections.len() != batch.len() {
            return Err(PipelineError::DetectionCountMismatch {
                expected: batch.len(),
                got: batch_detections.len(),
            }
            .into());
        }
        debug!(
            batch = batch_idx,
            frames = batch.len(),
            boxes = batch_detections
                .iter()
                .map(|f| f.detections.len())
                .sum::<usize>(),
            "批次检测完成"
        );
        detections.extend(batch_detections);
    }

    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{BBox, ClassNames, Detection};

    /// 按像素值生成检测框的假检测器
    struct PixelDetector {
        calls: Vec<usize>,
    }

    impl Detector for PixelDetector {
        fn predict(&mut self, frames: &[RgbImage]) -> Result<Vec<FrameDetections>> {
            self.calls.push(frames.len());
            Ok(frames
                .iter()
                .map(|frame| {
                    let v = frame.get_pixel(0, 0)[0] as f32;
                    FrameDetections::new(
                        vec![Detection::new(BBox::new(v, v, v + 1.0, v + 1.0), 0.5, 0)],
                        ClassNames::from_list(&["player"]),
                    )
                })
                .collect())
        }
    }

    fn frames(n: u8) -> Vec<RgbImage> {
        (0..n)
            .map(|i| RgbImage::from_pixel(2, 2, image::Rgb([i, 0, 0])))
            .collect()
    }

    #[test]
    fn batching_does_not_change_results() {
        let frames = frames(7);
        let mut batched = PixelDetector { calls: Vec::new() };
        let mut whole = PixelDetector { calls: Vec::new() };

        let a = detect_frames(&mut batched, &frames, 3).unwrap();
        let b = detect_frames(&mut whole, &frames, 100).unwrap();

        assert_eq!(a, b);
        assert_eq!(batched.calls, vec![3, 3, 1]);
        assert_eq!(whole.calls, vec![7]);
    }

    #[test]
    fn lazy_detector_builds_once_on_first_use() {
        let mut builds = 0;
        {
            let mut lazy = LazyDetector::new(|| -> Result<PixelDetector> {
                builds += 1;
                Ok(PixelDetector { calls: Vec::new() })
            });
            assert!(!lazy.is_loaded());
            detect_frames(&mut lazy, &frames(5), 2).unwrap();
            assert!(lazy.is_loaded());
        }
        assert_eq!(builds, 1);

        let unused = LazyDetector::new(|| -> Result<PixelDetector> {
            anyhow::bail!("model should not load")
        });
        assert!(!unused.is_loaded());
    }

    #[test]
    fn lazy_detector_init_failure_is_reported() {
        let mut lazy = LazyDetector::new(|| -> Result<PixelDetector> {
            anyhow::bail!("missing model")
        });
        assert!(lazy.predict(&frames(1)).is_err());
        assert!(lazy.predict(&frames(1)).is_err());
        assert!(!lazy.is_loaded());
    }

    #[test]
    fn short_detector_output_is_fatal() {
        struct Dropping;
        impl Detector for Dropping {
            fn predict(&mut self, _frames: &[RgbImage]) -> Result<Vec<FrameDetections>> {
                Ok(Vec::new())
            }
        }

        let err = detect_frames(&mut Dropping, &frames(2), 20).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::DetectionCountMismatch { expected: 2, got: 0 })
        ));
    }
}
