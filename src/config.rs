//! 命令行参数

use std::path::PathBuf;

use clap::Parser;

/// 球场视频标注: 检测 → 跟踪 → 缓存 → 绘制
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "足球比赛球员/裁判/足球 跟踪标注", long_about = None)]
pub struct Args {
    /// ONNX 检测模型路径
    #[arg(short, long, default_value = "models/best.onnx")]
    pub model: PathBuf,

    /// 输入帧目录 (按文件名排序)
    #[arg(short, long)]
    pub input: PathBuf,

    /// 标注结果输出目录
    #[arg(short, long, default_value = "output_frames")]
    pub output: PathBuf,

    /// 轨迹缓存文件
    #[arg(long)]
    pub stub_path: Option<PathBuf>,

    /// 缓存存在时直接读取, 跳过检测与跟踪
    #[arg(long, default_value_t = false)]
    pub read_from_stub: bool,

    /// 跟踪器配置 (JSON)
    #[arg(short, long, default_value = "tracker_config.json")]
    pub config: PathBuf,

    /// 标签字体 (TTF/OTF), 不指定则只绘制色块
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// 覆盖配置中的批大小
    #[arg(long)]
    pub batch: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_driver_flags() {
        let args = Args::try_parse_from([
            "annotate",
            "--input",
            "frames",
            "--stub-path",
            "stubs/track_stubs.bin",
            "--read-from-stub",
            "--batch",
            "8",
        ])
        .unwrap();
        assert_eq!(args.input, PathBuf::from("frames"));
        assert!(args.read_from_stub);
        assert_eq!(args.batch, Some(8));
        assert_eq!(args.model, PathBuf::from("models/best.onnx"));
    }
}
