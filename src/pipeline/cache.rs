//! 轨迹缓存文件 (stub)
//!
//! 文件格式: bincode 编码的 `StubHeader` 紧跟 `TrackTable`。
//! 魔数或版本不符时直接报错, 不会回退到重新计算。

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::tracks::TrackTable;
use crate::error::CacheError;

const STUB_MAGIC: [u8; 4] = *b"PTRK";

/// 当前缓存格式版本, `TrackTable` 结构变化时递增
pub const STUB_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StubHeader {
    magic: [u8; 4],
    version: u32,
}

/// 保存轨迹表
pub fn save(path: &Path, tracks: &TrackTable) -> Result<(), CacheError> {
    let io_err = |source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    };
    let encode_err = |source| CacheError::Encode {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut writer = BufWriter::new(File::create(path).map_err(io_err)?);
    let header = StubHeader {
        magic: STUB_MAGIC,
        version: STUB_VERSION,
    };
    bincode::serialize_into(&mut writer, &header).map_err(encode_err)?;
    bincode::serialize_into(&mut writer, tracks).map_err(encode_err)?;
    writer.flush().map_err(io_err)?;

    info!(
        path = %path.display(),
        frames = tracks.len(),
        "💾 轨迹缓存已保存"
    );
    Ok(())
}

/// 读取轨迹表 (不校验是否与当前输入帧对应)
pub fn load(path: &Path) -> Result<TrackTable, CacheError> {
    let decode_err = |source| CacheError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);

    let header: StubHeader = bincode::deserialize_from(&mut reader).map_err(decode_err)?;
    if header.magic != STUB_MAGIC {
        return Err(CacheError::BadMagic {
            path: path.to_path_buf(),
        });
    }
    if header.version != STUB_VERSION {
        return Err(CacheError::VersionMismatch {
            expected: STUB_VERSION,
            found: header.version,
        });
    }

    let tracks: TrackTable = bincode::deserialize_from(&mut reader).map_err(decode_err)?;
    info!(
        path = %path.display(),
        frames = tracks.len(),
        "📦 从缓存读取轨迹"
    );
    Ok(tracks)
}
