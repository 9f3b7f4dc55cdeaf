/// 检测系统 (Detection System)
///
/// - types:     检测框 / 类别名称表
/// - remap:     守门员 → 球员 类别重映射
/// - tracker:   身份跟踪接口 + 卡尔曼滤波
/// - bytetrack: ByteTrack 身份跟踪器
pub mod bytetrack;
pub mod remap;
pub mod tracker;
pub mod types;

pub use bytetrack::{ByteTrackParams, ByteTracker};
pub use remap::remap_goalkeepers;
pub use tracker::{IdentityTracker, KalmanBoxFilter};
pub use types::{BBox, ClassNames, Detection, FrameDetections, TrackedDetection};
