//! 帧标注 (Renderer)
//! 球员/裁判脚下绘制椭圆弧, 球员附带ID标签, 足球上方绘制倒三角

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_rect_mut, draw_hollow_polygon_mut, draw_line_segment_mut, draw_polygon_mut,
    draw_text_mut,
};
use imageproc::point::Point;
use imageproc::rect::Rect;
use tracing::{info, warn};

use crate::detection::BBox;
use crate::error::PipelineError;
use crate::pipeline::{FrameTracks, TrackTable};

pub const PLAYER_COLOR: Rgb<u8> = Rgb([255, 0, 0]); // 红色
pub const REFEREE_COLOR: Rgb<u8> = Rgb([255, 255, 0]); // 黄色
pub const BALL_COLOR: Rgb<u8> = Rgb([0, 255, 0]); // 绿色
const OUTLINE_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

// 椭圆弧起止角度 (度), 顶部留空, 看起来像脚下的标记
const ARC_START_DEG: f32 = -45.0;
const ARC_END_DEG: f32 = 235.0;
const ARC_STEP_DEG: f32 = 5.0;
const ELLIPSE_MINOR_RATIO: f32 = 0.35;

// ID 标签
const BADGE_WIDTH: u32 = 40;
const BADGE_HEIGHT: u32 = 20;
const BADGE_TEXT_X: i32 = 12;
const BADGE_TEXT_SCALE: f32 = 16.0;

// 足球倒三角
const TRIANGLE_HALF_WIDTH: f32 = 10.0;
const TRIANGLE_HEIGHT: f32 = 20.0;

#[derive(Default)]
pub struct Annotator {
    font: Option<FontVec>,
}

impl Annotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_font(font: FontVec) -> Self {
        Self { font: Some(font) }
    }

    /// 加载标签字体
    pub fn from_font_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("读取字体失败: {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .with_context(|| format!("字体解析失败: {}", path.display()))?;
        info!(font = %path.display(), "✅ 标签字体加载成功");
        Ok(Self::with_font(font))
    }

    /// 为每一帧绘制标注, 返回新的帧序列 (输入帧不会被修改)
    pub fn draw_annotations(&self, frames: &[RgbImage], tracks: &TrackTable) -> Result<Vec<RgbImage>> {
        if tracks.len() < frames.len() || !tracks.is_aligned() {
            return Err(PipelineError::TrackTableTooShort {
                frames: frames.len(),
                tracks: tracks.len().min(tracks.referees.len()).min(tracks.ball.len()),
            }
            .into());
        }
        if self.font.is_none() && tracks.players.iter().any(|f| !f.is_empty()) {
            warn!("⚠️ 未加载字体, 球员标签只绘制色块");
        }

        let output = frames
            .iter()
            .enumerate()
            .map(|(frame_num, frame)| {
                let mut frame = frame.clone();
                self.draw_frame(
                    &mut frame,
                    &tracks.players[frame_num],
                    &tracks.referees[frame_num],
                    &tracks.ball[frame_num],
                );
                frame
            })
            .collect();
        Ok(output)
    }

    fn draw_frame(
        &self,
        frame: &mut RgbImage,
        players: &FrameTracks,
        referees: &FrameTracks,
        ball: &FrameTracks,
    ) {
        // 球员
        for (track_id, player) in players {
            self.draw_ellipse(frame, &player.bbox, PLAYER_COLOR, Some(*track_id));
        }

        // 裁判
        for referee in referees.values() {
            self.draw_ellipse(frame, &referee.bbox, REFEREE_COLOR, None);
        }

        // 足球
        for ball in ball.values() {
            draw_triangle(frame, &ball.bbox, BALL_COLOR);
        }
    }

    /// 在边界框底边中点绘制椭圆弧, 给定ID时在下方绘制标签
    pub fn draw_ellipse(&self, frame: &mut RgbImage, bbox: &BBox, color: Rgb<u8>, track_id: Option<u32>) {
        let (x_center, y2) = bbox.bottom_center();
        let width = bbox.width().max(1.0);
        let axes = (width, ELLIPSE_MINOR_RATIO * width);

        // 椭圆与标签都落在画面外时跳过
        let half_width = axes.0.max(BADGE_WIDTH as f32 / 2.0);
        let bottom = (y2 + axes.1).max(y2 + 5.0 + BADGE_HEIGHT as f32);
        if !overlaps_frame(
            frame,
            (x_center - half_width, y2 - axes.1),
            (x_center + half_width, bottom),
        ) {
            return;
        }

        // 线宽 2: 内外两条弧
        for inset in [0.0, 1.0] {
            draw_arc(
                frame,
                (x_center, y2),
                (axes.0 - inset, (axes.1 - inset).max(0.0)),
                color,
            );
        }

        let Some(track_id) = track_id else {
            return;
        };

        let x1_rect = x_center as i32 - BADGE_WIDTH as i32 / 2;
        let y1_rect = y2 as i32 + 5;
        draw_filled_rect_mut(
            frame,
            Rect::at(x1_rect, y1_rect).of_size(BADGE_WIDTH, BADGE_HEIGHT),
            color,
        );

        if let Some(font) = &self.font {
            let mut x1_text = x1_rect + BADGE_TEXT_X;
            // 三位数ID左移, 保持居中
            if track_id > 99 {
                x1_text -= 10;
            }
            draw_text_mut(
                frame,
                OUTLINE_COLOR,
                x1_text,
                y1_rect + 2,
                PxScale::from(BADGE_TEXT_SCALE),
                font,
                &track_id.to_string(),
            );
        }
    }
}

/// 椭圆弧 (角度顺时针, 图像 y 轴向下)
fn draw_arc(frame: &mut RgbImage, center: (f32, f32), axes: (f32, f32), color: Rgb<u8>) {
    let point = |deg: f32| {
        let t = deg.to_radians();
        (center.0 + axes.0 * t.cos(), center.1 + axes.1 * t.sin())
    };

    let mut deg = ARC_START_DEG;
    let mut prev = point(deg);
    while deg < ARC_END_DEG {
        deg = (deg + ARC_STEP_DEG).min(ARC_END_DEG);
        let next = point(deg);
        draw_line_segment_mut(frame, prev, next, color);
        prev = next;
    }
}

/// 区域 [min, max] 是否与画面相交 (坐标非有限值时视为不相交)
///
/// 画面外的框不绘制, 避免坐标转换为整数时饱和。
fn overlaps_frame(frame: &RgbImage, min: (f32, f32), max: (f32, f32)) -> bool {
    let (width, height) = (frame.width() as f32, frame.height() as f32);
    [min.0, min.1, max.0, max.1].iter().all(|v| v.is_finite())
        && max.0 >= 0.0
        && max.1 >= 0.0
        && min.0 < width
        && min.1 < height
}

/// 在边界框顶边中点上方绘制实心倒三角 + 黑色描边
fn draw_triangle(frame: &mut RgbImage, bbox: &BBox, color: Rgb<u8>) {
    let (x, _) = bbox.center();
    let y = bbox.y1;
    if !overlaps_frame(
        frame,
        (x - TRIANGLE_HALF_WIDTH, y - TRIANGLE_HEIGHT),
        (x + TRIANGLE_HALF_WIDTH, y),
    ) {
        return;
    }
    let corners = [
        (x, y),
        (x - TRIANGLE_HALF_WIDTH, y - TRIANGLE_HEIGHT),
        (x + TRIANGLE_HALF_WIDTH, y - TRIANGLE_HEIGHT),
    ];

    let filled: Vec<Point<i32>> = corners
        .iter()
        .map(|&(px, py)| Point::new(px.round() as i32, py.round() as i32))
        .collect();
    draw_polygon_mut(frame, &filled, color);

    let outline: Vec<Point<f32>> = corners.iter().map(|&(px, py)| Point::new(px, py)).collect();
    draw_hollow_polygon_mut(frame, &outline, OUTLINE_COLOR);
}
