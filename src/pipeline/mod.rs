/// 轨迹处理流水线 (Track pipeline)
///
/// 单线程批处理:
/// - ObjectTracker: 检测 → 重映射 → 跟踪 → 轨迹表
/// - cache:         轨迹表缓存文件 (stub)
/// - tracks:        轨迹表数据结构
pub mod cache;
pub mod object_tracker;
pub mod tracks;

pub use object_tracker::ObjectTracker;
pub use tracks::{FrameTracks, TrackInfo, TrackTable, BALL_TRACK_ID};
