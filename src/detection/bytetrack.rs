//! ByteTrack 算法实现
//! ByteTrack: Simple and effective multi-object tracking
//!
//! 核心思想:
//! 1. 高低分检测框分开处理
//! 2. 高分框优先匹配 (IOU)
//! 3. 低分框救援丢失的轨迹
//! 4. 纯运动模型,无需外观特征

use super::tracker::{IdentityTracker, KalmanBoxFilter};
use super::types::{BBox, Detection, TrackedDetection};
use crate::tracker_config::TrackerConfig;

/// ByteTrack 跟踪对象
#[derive(Clone, Debug)]
struct ByteTrack {
    /// 唯一跟踪ID
    id: u32,

    /// 卡尔曼滤波器
    kalman: KalmanBoxFilter,

    /// 连续丢失帧数
    frames_lost: u32,

    /// 总共被跟踪的帧数
    total_frames: u32,
}

impl ByteTrack {
    fn new(id: u32, bbox: &BBox, params: &ByteTrackParams) -> Self {
        let kalman = KalmanBoxFilter::new(bbox, params.kalman_process_noise, params.kalman_obs_noise)
            .with_motion(params.velocity_decay, params.stationary_threshold);
        Self {
            id,
            kalman,
            frames_lost: 0,
            total_frames: 1,
        }
    }

    fn predict(&mut self) {
        self.kalman.predict();
    }

    fn update(&mut self, bbox: &BBox) {
        self.kalman.update(bbox);
        self.frames_lost = 0;
        self.total_frames += 1;
    }

    fn predicted_bbox(&self) -> BBox {
        self.kalman.get_predicted_bbox()
    }
}

/// ByteTrack 参数
#[derive(Clone, Debug, PartialEq)]
pub struct ByteTrackParams {
    /// 最大允许丢失帧数
    pub max_lost_frames: u32,
    /// 高分检测阈值
    pub high_score_threshold: f32,
    /// 低分检测阈值 (用于救援)
    pub low_score_threshold: f32,
    /// 高分匹配 IOU 阈值
    pub high_iou_threshold: f32,
    /// 低分匹配 IOU 阈值
    pub low_iou_threshold: f32,
    pub kalman_process_noise: f32,
    pub kalman_obs_noise: f32,
    pub velocity_decay: f32,
    pub stationary_threshold: f32,
}

impl Default for ByteTrackParams {
    fn default() -> Self {
        Self::from(&TrackerConfig::default())
    }
}

impl From<&TrackerConfig> for ByteTrackParams {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            max_lost_frames: config.bytetrack_max_lost_frames,
            high_score_threshold: config.bytetrack_high_score_threshold,
            low_score_threshold: config.bytetrack_low_score_threshold,
            high_iou_threshold: config.bytetrack_high_iou_threshold,
            low_iou_threshold: config.bytetrack_low_iou_threshold,
            kalman_process_noise: config.kalman_process_noise,
            kalman_obs_noise: config.bytetrack_kalman_obs_noise,
            velocity_decay: config.kalman_velocity_decay,
            stationary_threshold: config.kalman_stationary_threshold,
        }
    }
}

/// ByteTrack 追踪器
#[derive(Debug)]
pub struct ByteTracker {
    /// 当前跟踪的目标
    tracks: Vec<ByteTrack>,

    /// 下一个分配的ID
    next_id: u32,

    params: ByteTrackParams,
}

impl ByteTracker {
    pub fn new() -> Self {
        Self::with_params(ByteTrackParams::default())
    }

    pub fn with_params(params: ByteTrackParams) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            params,
        }
    }

    /// IOU 匹配
    ///
    /// 返回 (检测下标, 轨迹下标) 对
    fn match_detections_to_tracks(
        &self,
        detections: &[(usize, &Detection)],
        track_indices: &[usize],
        iou_threshold: f32,
    ) -> Vec<(usize, usize)> {
        if detections.is_empty() || track_indices.is_empty() {
            return Vec::new();
        }

        // 计算 IOU 代价矩阵
        let mut candidates = Vec::new();
        for (local_det_idx, (det_idx, detection)) in detections.iter().enumerate() {
            for (local_track_idx, &track_idx) in track_indices.iter().enumerate() {
                let iou = detection
                    .bbox
                    .iou(&self.tracks[track_idx].predicted_bbox());

                if iou >= iou_threshold {
                    candidates.push((1.0 - iou, *det_idx, local_det_idx, track_idx, local_track_idx));
                }
            }
        }

        // 贪心匹配: 按代价排序
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut assignments = Vec::new();
        let mut used_det = vec![false; detections.len()];
        let mut used_track = vec![false; track_indices.len()];

        for (_, det_idx, local_det_idx, track_idx, local_track_idx) in candidates {
            if !used_det[local_det_idx] && !used_track[local_track_idx] {
                assignments.push((det_idx, track_idx));
                used_det[local_det_idx] = true;
                used_track[local_track_idx] = true;
            }
        }

        assignments
    }

    /// 获取跟踪统计信息
    pub fn get_stats(&self) -> String {
        let longest = self.tracks.iter().map(|t| t.total_frames).max().unwrap_or(0);
        format!(
            "跟踪: {} 个目标 | 总ID: {} | 最长轨迹: {} 帧",
            self.tracks.len(),
            self.next_id - 1,
            longest
        )
    }
}

impl Default for ByteTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityTracker for ByteTracker {
    /// 更新跟踪 (ByteTrack 三步匹配)
    fn update(&mut self, detections: &[Detection]) -> Vec<TrackedDetection> {
        // 1. 所有轨迹先预测
        for track in &mut self.tracks {
            track.predict();
        }

        // 2. 分离高低分检测框
        let mut high_dets: Vec<(usize, &Detection)> = Vec::new();
        let mut low_dets: Vec<(usize, &Detection)> = Vec::new();
        for (idx, det) in detections.iter().enumerate() {
            if det.confidence >= self.params.high_score_threshold {
                high_dets.push((idx, det));
            } else if det.confidence >= self.params.low_score_threshold {
                low_dets.push((idx, det));
            }
        }

        // 检测下标 → 跟踪ID
        let mut det_track_id: Vec<Option<u32>> = vec![None; detections.len()];
        let mut matched_track = vec![false; self.tracks.len()];

        // 3. 第一轮匹配: 高分检测 + 所有轨迹
        let all_tracks: Vec<usize> = (0..self.tracks.len()).collect();
        let assignments =
            self.match_detections_to_tracks(&high_dets, &all_tracks, self.params.high_iou_threshold);
        for (det_idx, track_idx) in assignments {
            matched_track[track_idx] = true;
            self.tracks[track_idx].update(&detections[det_idx].bbox);
            det_track_id[det_idx] = Some(self.tracks[track_idx].id);
        }

        // 4. 第二轮匹配: 低分检测 + 未匹配的轨迹 (救援)
        let unmatched_tracks: Vec<usize> = (0..self.tracks.len())
            .filter(|&idx| !matched_track[idx])
            .collect();
        let low_assignments = self.match_detections_to_tracks(
            &low_dets,
            &unmatched_tracks,
            self.params.low_iou_threshold,
        );
        for (det_idx, track_idx) in low_assignments {
            matched_track[track_idx] = true;
            self.tracks[track_idx].update(&detections[det_idx].bbox);
            det_track_id[det_idx] = Some(self.tracks[track_idx].id);
        }

        // 5. 未匹配的轨迹 → 标记丢失 (新轨迹加入前处理)
        for (track_idx, &matched) in matched_track.iter().enumerate() {
            if !matched {
                self.tracks[track_idx].frames_lost += 1;
            }
        }

        // 6. 未匹配的高分检测 → 新建轨迹
        for (det_idx, _) in &high_dets {
            if det_track_id[*det_idx].is_none() {
                let track = ByteTrack::new(self.next_id, &detections[*det_idx].bbox, &self.params);
                det_track_id[*det_idx] = Some(track.id);
                self.tracks.push(track);
                self.next_id += 1;
            }
        }

        // 7. 删除丢失太久的轨迹
        let max_lost = self.params.max_lost_frames;
        self.tracks.retain(|t| t.frames_lost <= max_lost);

        detections
            .iter()
            .zip(det_track_id)
            .filter_map(|(detection, track_id)| {
                track_id.map(|track_id| TrackedDetection {
                    detection: *detection,
                    track_id,
                })
            })
            .collect()
    }

    fn reset(&mut self) {
        self.tracks.clear();
        self.next_id = 1;
    }

    fn track_count(&self) -> usize {
        self.tracks.len()
    }
}
