//! 轨迹构建 (Object tracker)
//! 职责: 帧序列 → 分批检测 → 守门员重映射 → 身份跟踪 → 轨迹表 (可选缓存)

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use image::RgbImage;
use tracing::{debug, info};

use super::cache;
use super::tracks::TrackTable;
use crate::detection::{remap_goalkeepers, IdentityTracker};
use crate::models::{detect_frames, Detector, DEFAULT_BATCH_SIZE};

pub struct ObjectTracker<D, T> {
    detector: D,
    tracker: T,
    batch_size: usize,
}

impl<D: Detector, T: IdentityTracker> ObjectTracker<D, T> {
    pub fn new(detector: D, tracker: T) -> Self {
        Self {
            detector,
            tracker,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn detector(&self) -> &D {
        &self.detector
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// 获取轨迹表
    ///
    /// `read_from_stub` 为真且缓存文件存在时直接读取并返回 (不做任何校验);
    /// 否则重新计算, 给定 `stub_path` 时把结果写入缓存。
    pub fn get_object_tracks(
        &mut self,
        frames: &[RgbImage],
        read_from_stub: bool,
        stub_path: Option<&Path>,
    ) -> Result<TrackTable> {
        if let Some(path) = stub_path.filter(|p| read_from_stub && p.exists()) {
            return cache::load(path).context("读取轨迹缓存失败");
        }

        let tracks = self.compute_tracks(frames)?;

        match stub_path {
            Some(path) if !tracks.is_empty() => {
                cache::save(path, &tracks).context("保存轨迹缓存失败")?;
            }
            Some(path) => debug!(path = %path.display(), "空帧序列, 不写缓存"),
            None => {}
        }

        Ok(tracks)
    }

    /// 重新计算轨迹表 (每次调用都从新的跟踪状态开始)
    pub fn compute_tracks(&mut self, frames: &[RgbImage]) -> Result<TrackTable> {
        let start = Instant::now();
        let detections = detect_frames(&mut self.detector, frames, self.batch_size)
            .context("目标检测失败")?;

        self.tracker.reset();
        let mut tracks = TrackTable::with_capacity(frames.len());
        let mut remapped = 0;

        for mut frame in detections {
            remapped += remap_goalkeepers(&mut frame);
            let tracked = self.tracker.update(&frame.detections);
            tracks.push_frame(&frame, &tracked);
        }

        info!(
            frames = tracks.len(),
            goalkeepers_remapped = remapped,
            active_tracks = self.tracker.track_count(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "🎯 检测+跟踪完成"
        );
        Ok(tracks)
    }
}
