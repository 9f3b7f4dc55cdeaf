/// 球场标注 (Pitch annotator)
///
/// 流程:
/// 1. 读取帧目录 (按文件名排序)
/// 2. 检测 + 跟踪 (或读取轨迹缓存)
/// 3. 绘制标注并写出到输出目录
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use image::RgbImage;
use tracing::info;

use pitch_tracker_rs::detection::ByteTrackParams;
use pitch_tracker_rs::models::LazyDetector;
use pitch_tracker_rs::{Annotator, Args, ByteTracker, ObjectTracker, TrackerConfig, YOLOv8};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    info!("🚀 球场标注启动");

    let mut config = TrackerConfig::load(&args.config)?;
    if let Some(batch) = args.batch {
        config.detection_batch_size = batch;
    }
    config.log_summary();

    let frames = read_frames(&args.input)?;
    info!(frames = frames.len(), input = %args.input.display(), "📹 帧读取完成");

    // 模型在首次检测时才加载, 读取缓存时不加载
    let model_path = args.model.clone();
    let model_config = config.clone();
    let detector = LazyDetector::new(move || YOLOv8::new(&model_path, &model_config));
    let tracker = ByteTracker::with_params(ByteTrackParams::from(&config));
    let mut object_tracker =
        ObjectTracker::new(detector, tracker).with_batch_size(config.detection_batch_size);
    let tracks = object_tracker.get_object_tracks(
        &frames,
        args.read_from_stub,
        args.stub_path.as_deref(),
    )?;
    if object_tracker.detector().is_loaded() {
        info!("{}", object_tracker.tracker().get_stats());
    }

    let annotator = match &args.font {
        Some(font) => Annotator::from_font_file(font)?,
        None => Annotator::new(),
    };
    let output = annotator.draw_annotations(&frames, &tracks)?;

    write_frames(&args.output, &output)?;
    info!(frames = output.len(), output = %args.output.display(), "✅ 标注完成");
    Ok(())
}

fn read_frames(dir: &Path) -> Result<Vec<RgbImage>> {
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("读取帧目录失败: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    paths.sort();

    paths
        .iter()
        .map(|path| {
            image::open(path)
                .map(|img| img.to_rgb8())
                .with_context(|| format!("读取帧失败: {}", path.display()))
        })
        .collect()
}

fn write_frames(dir: &Path, frames: &[RgbImage]) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("创建输出目录失败: {}", dir.display()))?;
    for (idx, frame) in frames.iter().enumerate() {
        let path = dir.join(format!("frame_{idx:05}.png"));
        frame
            .save(&path)
            .with_context(|| format!("写出帧失败: {}", path.display()))?;
    }
    Ok(())
}
