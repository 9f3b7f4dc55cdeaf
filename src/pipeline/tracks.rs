//! 轨迹表 (Track table)
//! 按帧索引记录 跟踪ID → 边界框, 分球员 / 裁判 / 足球 三类

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::detection::types::{BALL, PLAYER, REFEREE};
use crate::detection::{BBox, FrameDetections, TrackedDetection};

/// 足球不参与身份跟踪, 每帧固定使用该键
pub const BALL_TRACK_ID: u32 = 1;

/// 单个轨迹在某一帧的信息
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    pub bbox: BBox,
}

/// 单帧: 跟踪ID → 轨迹信息
pub type FrameTracks = BTreeMap<u32, TrackInfo>;

/// 三个按帧对齐的序列, 长度始终等于输入帧数
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackTable {
    pub players: Vec<FrameTracks>,
    pub referees: Vec<FrameTracks>,
    pub ball: Vec<FrameTracks>,
}

impl TrackTable {
    pub fn with_capacity(frames: usize) -> Self {
        Self {
            players: Vec::with_capacity(frames),
            referees: Vec::with_capacity(frames),
            ball: Vec::with_capacity(frames),
        }
    }

    /// 帧数
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// 三个序列是否按帧对齐
    pub fn is_aligned(&self) -> bool {
        self.players.len() == self.referees.len() && self.players.len() == self.ball.len()
    }

    /// 追加一帧
    ///
    /// `frame` 为重映射后的原始检测 (足球从这里取),
    /// `tracked` 为跟踪器输出 (球员与裁判从这里取)。
    pub fn push_frame(&mut self, frame: &FrameDetections, tracked: &[TrackedDetection]) {
        let player_id = frame.names.id(PLAYER);
        let referee_id = frame.names.id(REFEREE);
        let ball_id = frame.names.id(BALL);

        let mut players = FrameTracks::new();
        let mut referees = FrameTracks::new();
        for t in tracked {
            let info = TrackInfo {
                bbox: t.detection.bbox,
            };
            let class_id = Some(t.detection.class_id);
            if class_id == player_id {
                players.insert(t.track_id, info);
            } else if class_id == referee_id {
                referees.insert(t.track_id, info);
            }
        }

        // 同一帧多个足球时取置信度最高的
        let mut ball = FrameTracks::new();
        if let Some(best) = frame
            .detections
            .iter()
            .filter(|d| Some(d.class_id) == ball_id)
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
        {
            ball.insert(BALL_TRACK_ID, TrackInfo { bbox: best.bbox });
        }

        self.players.push(players);
        self.referees.push(referees);
        self.ball.push(ball);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{ClassNames, Detection};

    fn names() -> ClassNames {
        ClassNames::from_list(&["ball", "goalkeeper", "player", "referee"])
    }

    fn tracked(class_id: u32, track_id: u32, x: f32) -> TrackedDetection {
        TrackedDetection {
            detection: Detection::new(BBox::new(x, 10.0, x + 40.0, 90.0), 0.9, class_id),
            track_id,
        }
    }

    #[test]
    fn splits_players_and_referees() {
        let mut table = TrackTable::default();
        let frame = FrameDetections::new(Vec::new(), names());
        table.push_frame(
            &frame,
            &[tracked(2, 1, 10.0), tracked(3, 7, 60.0), tracked(2, 4, 120.0)],
        );

        assert_eq!(table.len(), 1);
        assert!(table.is_aligned());
        assert_eq!(table.players[0].keys().copied().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(table.referees[0].keys().copied().collect::<Vec<_>>(), vec![7]);
        assert!(table.ball[0].is_empty());
    }

    #[test]
    fn ball_recorded_without_any_tracked_objects() {
        let mut table = TrackTable::default();
        let frame = FrameDetections::new(
            vec![
                Detection::new(BBox::new(5.0, 5.0, 9.0, 9.0), 0.3, 0),
                Detection::new(BBox::new(50.0, 50.0, 54.0, 54.0), 0.8, 0),
            ],
            names(),
        );
        table.push_frame(&frame, &[]);

        assert!(table.players[0].is_empty());
        assert_eq!(table.ball[0].len(), 1);
        assert_eq!(
            table.ball[0][&BALL_TRACK_ID].bbox,
            BBox::new(50.0, 50.0, 54.0, 54.0)
        );
    }

    #[test]
    fn missing_category_names_yield_empty_entries() {
        let mut table = TrackTable::default();
        let frame = FrameDetections::new(
            vec![Detection::new(BBox::new(5.0, 5.0, 9.0, 9.0), 0.3, 0)],
            ClassNames::new([(2, "player")]),
        );
        table.push_frame(&frame, &[tracked(2, 3, 0.0), tracked(0, 9, 0.0)]);

        assert_eq!(table.players[0].len(), 1);
        assert!(table.referees[0].is_empty());
        assert!(table.ball[0].is_empty());
        assert!(table.is_aligned());
    }
}
