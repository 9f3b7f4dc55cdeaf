//! 类别重映射 (Class remapper)
//! 守门员在跟踪前统一视为球员

use tracing::warn;

use super::types::{FrameDetections, GOALKEEPER, PLAYER};

/// 将本帧所有 "goalkeeper" 检测改写为 "player" 的类别ID
///
/// 本帧名称表中没有 "player" 时跳过该检测并记录警告,不会中断流水线。
/// 返回被改写的检测数量。
pub fn remap_goalkeepers(frame: &mut FrameDetections) -> usize {
    let player_id = frame.names.id(PLAYER);
    let mut remapped = 0;

    for detection in &mut frame.detections {
        if frame.names.name(detection.class_id) != Some(GOALKEEPER) {
            continue;
        }
        match player_id {
            Some(id) => {
                detection.class_id = id;
                remapped += 1;
            }
            None => {
                warn!(
                    class_id = detection.class_id,
                    classes = frame.names.len(),
                    "⚠️ 类别表中没有 'player', 守门员保持原类别"
                );
            }
        }
    }

    remapped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::types::{BBox, ClassNames, Detection};

    fn frame(names: ClassNames) -> FrameDetections {
        FrameDetections::new(
            vec![
                Detection::new(BBox::new(10.0, 10.0, 50.0, 90.0), 0.9, 2),
                Detection::new(BBox::new(60.0, 10.0, 100.0, 90.0), 0.8, 1),
            ],
            names,
        )
    }

    #[test]
    fn goalkeeper_becomes_player() {
        let mut f = frame(ClassNames::from_list(&["ball", "goalkeeper", "player", "referee"]));
        assert_eq!(remap_goalkeepers(&mut f), 1);
        assert!(f.detections.iter().all(|d| d.class_id == 2));
    }

    #[test]
    fn remap_is_idempotent() {
        let mut once = frame(ClassNames::from_list(&["ball", "goalkeeper", "player", "referee"]));
        remap_goalkeepers(&mut once);
        let mut twice = once.clone();
        assert_eq!(remap_goalkeepers(&mut twice), 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn missing_player_label_leaves_goalkeeper() {
        let names = ClassNames::new([(0, "ball"), (1, "goalkeeper"), (3, "referee")]);
        let mut f = frame(names);
        let before = f.clone();
        assert_eq!(remap_goalkeepers(&mut f), 0);
        assert_eq!(f, before);
    }
}
