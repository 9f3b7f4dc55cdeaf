#![allow(clippy::type_complexity)]
// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
pub mod config; // 命令行参数
pub mod detection; // 检测框 / 类别重映射 / 身份跟踪
pub mod error; // 错误类型
pub mod models; // 检测模型接口与实现
pub mod pipeline; // 轨迹表构建与缓存
pub mod renderer; // 帧标注
pub mod tracker_config; // 跟踪器配置参数

pub use crate::config::Args;
pub use crate::detection::{
    BBox, ByteTracker, ClassNames, Detection, FrameDetections, IdentityTracker, TrackedDetection,
};
pub use crate::error::{CacheError, PipelineError};
pub use crate::models::{detect_frames, Detector, YOLOv8};
pub use crate::pipeline::{ObjectTracker, TrackInfo, TrackTable, BALL_TRACK_ID};
pub use crate::renderer::Annotator;
pub use crate::tracker_config::TrackerConfig;

/// 按类别做非极大值抑制 (置信度降序, 同类别 IOU 超过阈值的框被丢弃)
pub fn non_max_suppression(xs: &mut Vec<Detection>, iou_threshold: f32) {
    xs.sort_by(|b1, b2| b2.confidence.total_cmp(&b1.confidence));

    let mut current_index = 0;
    for index in 0..xs.len() {
        let mut drop = false;
        for prev_index in 0..current_index {
            if xs[prev_index].class_id != xs[index].class_id {
                continue;
            }
            let iou = xs[prev_index].bbox.iou(&xs[index].bbox);
            if iou > iou_threshold {
                drop = true;
                break;
            }
        }
        if !drop {
            xs.swap(current_index, index);
            current_index += 1;
        }
    }
    xs.truncate(current_index);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_keeps_best_box_per_class() {
        let mut xs = vec![
            Detection::new(BBox::new(0.0, 0.0, 10.0, 10.0), 0.6, 0),
            Detection::new(BBox::new(1.0, 1.0, 11.0, 11.0), 0.9, 0),
            Detection::new(BBox::new(1.0, 1.0, 11.0, 11.0), 0.5, 1),
            Detection::new(BBox::new(50.0, 50.0, 60.0, 60.0), 0.3, 0),
        ];
        non_max_suppression(&mut xs, 0.45);

        assert_eq!(xs.len(), 3);
        assert_eq!(xs[0].confidence, 0.9);
        assert!(xs.iter().any(|d| d.class_id == 1));
        assert!(xs.iter().all(|d| d.confidence != 0.6));
    }
}
