//! 错误类型
//! 调用方可能需要区分处理的错误,其余错误统一走 anyhow

use std::path::PathBuf;

use thiserror::Error;

/// 流水线数据错误 (检测/渲染输入不一致,不可恢复)
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("detector returned {got} frame results for a batch of {expected} frames")]
    DetectionCountMismatch { expected: usize, got: usize },

    #[error("track table covers {tracks} frames but {frames} frames were given")]
    TrackTableTooShort { frames: usize, tracks: usize },
}

/// 轨迹缓存文件错误 (不会回退到重新计算)
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("failed to access track cache {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode track cache {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("failed to encode track cache {}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: bincode::Error,
    },

    #[error("{} is not a track cache file", path.display())]
    BadMagic { path: PathBuf },

    #[error("track cache version mismatch: expected {expected}, got {found}")]
    VersionMismatch { expected: u32, found: u32 },
}
