//! 检测系统数据结构定义
//! Data structures shared by detector, tracker and track table

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

// ========== 公共常量 ==========

/// 类别名称: 球员
pub const PLAYER: &str = "player";
/// 类别名称: 守门员 (跟踪前统一映射为球员)
pub const GOALKEEPER: &str = "goalkeeper";
/// 类别名称: 裁判
pub const REFEREE: &str = "referee";
/// 类别名称: 足球
pub const BALL: &str = "ball";

// ========== 数据结构 ==========

/// 检测框 (left, top, right, bottom, 像素坐标)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// 中心点
    pub fn center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, (self.y1 + self.y2) / 2.0)
    }

    /// 底边中点 (脚下位置)
    pub fn bottom_center(&self) -> (f32, f32) {
        ((self.x1 + self.x2) / 2.0, self.y2)
    }

    /// 交并比 (Intersection over Union)
    pub fn iou(&self, other: &BBox) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

/// 单个检测结果 (检测器输出)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BBox,
    pub confidence: f32,
    pub class_id: u32,
}

impl Detection {
    pub fn new(bbox: BBox, confidence: f32, class_id: u32) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }
}

/// 带跟踪ID的检测结果 (跟踪器输出)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackedDetection {
    pub detection: Detection,
    pub track_id: u32,
}

/// 类别名称表 (id → name 及其反向表)
///
/// 每一帧都根据检测器上报的名称重新构建,帧之间互不依赖。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassNames {
    names: BTreeMap<u32, String>,
    inverse: HashMap<String, u32>,
}

impl ClassNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = (u32, S)>,
        S: Into<String>,
    {
        let names: BTreeMap<u32, String> = names
            .into_iter()
            .map(|(id, name)| (id, name.into()))
            .collect();
        let inverse = names
            .iter()
            .map(|(id, name)| (name.clone(), *id))
            .collect();
        Self { names, inverse }
    }

    /// 按模型输出顺序构建 (下标即类别ID)
    pub fn from_list<S: AsRef<str>>(names: &[S]) -> Self {
        Self::new(
            names
                .iter()
                .enumerate()
                .map(|(id, name)| (id as u32, name.as_ref().to_string())),
        )
    }

    pub fn name(&self, class_id: u32) -> Option<&str> {
        self.names.get(&class_id).map(String::as_str)
    }

    pub fn id(&self, name: &str) -> Option<u32> {
        self.inverse.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// 单帧检测结果 (检测框 + 该帧的类别名称表)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameDetections {
    pub detections: Vec<Detection>,
    pub names: ClassNames,
}

impl FrameDetections {
    pub fn new(detections: Vec<Detection>, names: ClassNames) -> Self {
        Self { detections, names }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names_inverse_lookup() {
        let names = ClassNames::from_list(&["ball", "goalkeeper", "player", "referee"]);
        assert_eq!(names.id(PLAYER), Some(2));
        assert_eq!(names.name(1), Some(GOALKEEPER));
        assert_eq!(names.id("coach"), None);
        assert_eq!(names.len(), 4);
    }

    #[test]
    fn bbox_geometry() {
        let bbox = BBox::new(10.0, 10.0, 50.0, 90.0);
        assert_eq!(bbox.width(), 40.0);
        assert_eq!(bbox.bottom_center(), (30.0, 90.0));
        assert_eq!(bbox.iou(&bbox), 1.0);
        assert_eq!(bbox.iou(&BBox::new(60.0, 10.0, 100.0, 90.0)), 0.0);
    }
}
