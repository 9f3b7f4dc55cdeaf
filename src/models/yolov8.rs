// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//
// YOLOv8 ONNX 检测模型
// 包含: 模型加载、预处理、推理、后处理

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use fast_image_resize as fr;
use image::RgbImage;
use ndarray::{s, Array, ArrayD, Axis};
use once_cell::sync::Lazy;
use ort::session::Session;
use ort::value::Tensor;
use regex::Regex;
use tracing::{debug, info};

use super::Detector;
use crate::detection::{BBox, ClassNames, Detection, FrameDetections};
use crate::non_max_suppression;
use crate::tracker_config::TrackerConfig;

const CXYWH_OFFSET: usize = 4;
const PAD_VALUE: f32 = 144.0 / 255.0;

/// 解析元数据中的 `{0: 'ball', 1: 'goalkeeper', ...}`
static NAMES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(\d+)\s*:\s*['"]([^'"]+)['"]"#).expect("names regex"));

/// 模型输入形状 (NCHW)
///
/// 固定维度以模型为准, 动态维度 (<= 0) 才使用配置值;
/// `batch` 为 `None` 表示批大小动态。
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InputShape {
    pub batch: Option<usize>,
    pub height: u32,
    pub width: u32,
}

impl InputShape {
    pub fn resolve(dims: &[i64], fallback_size: u32) -> Result<Self> {
        if dims.len() != 4 {
            bail!("模型输入应为 NCHW 四维张量: {:?}", dims);
        }
        let fixed = |d: i64| (d > 0).then_some(d as usize);
        if let Some(channels) = fixed(dims[1]) {
            if channels != 3 {
                bail!("模型输入通道数应为 3: {:?}", dims);
            }
        }

        Ok(Self {
            batch: fixed(dims[0]),
            height: fixed(dims[2]).map_or(fallback_size, |h| h as u32),
            width: fixed(dims[3]).map_or(fallback_size, |w| w as u32),
        })
    }

    pub fn is_batch_dynamic(&self) -> bool {
        self.batch.is_none()
    }
}

/// YOLOv8 检测模型 (ONNX Runtime 后端)
pub struct YOLOv8 {
    session: Session,
    names: ClassNames,
    input: InputShape,
    conf: f32,
    iou: f32,
    resizer: fr::Resizer,
}

impl YOLOv8 {
    /// 加载模型
    ///
    /// 类别名称优先使用配置中的 `class_names`,否则读取模型元数据 `names`。
    pub fn new(model_path: impl AsRef<Path>, config: &TrackerConfig) -> Result<Self> {
        let model_path = model_path.as_ref();
        let session = Session::builder()
            .map_err(|e| anyhow!("创建推理会话失败: {e}"))?
            .commit_from_file(model_path)
            .map_err(|e| anyhow!("加载模型失败 {}: {e}", model_path.display()))?;

        let dims: Vec<i64> = session
            .inputs
            .first()
            .and_then(|input| input.input_type.tensor_shape())
            .map(|shape| shape.iter().copied().collect())
            .context("模型缺少张量输入")?;
        let input = InputShape::resolve(&dims, config.detection_input_size)?;

        let names = match &config.class_names {
            Some(names) => ClassNames::from_list(names),
            None => {
                let metadata = session
                    .metadata()
                    .map_err(|e| anyhow!("读取模型元数据失败: {e}"))?;
                let raw = metadata
                    .custom("names")
                    .map_err(|e| anyhow!("读取模型元数据失败: {e}"))?
                    .context("模型缺少 names 元数据, 请在配置中指定 class_names")?;
                parse_names(&raw)
            }
        };
        if names.is_empty() {
            bail!("模型类别表为空: {}", model_path.display());
        }

        info!(
            model = %model_path.display(),
            classes = names.len(),
            batch = input.batch.map_or_else(|| "Dynamic".to_string(), |b| b.to_string()),
            height = input.height,
            width = input.width,
            "✅ YOLOv8 检测模型加载成功"
        );

        Ok(Self {
            session,
            names,
            input,
            conf: config.detection_conf_threshold,
            iou: config.detection_iou_threshold,
            resizer: fr::Resizer::new(),
        })
    }

    /// 预处理: 等比缩放到左上角, 其余区域填充灰色, NCHW 归一化到 [0, 1]
    ///
    /// `batch_len` 大于帧数时多出的槽位保持填充色 (固定批大小的模型)。
    fn preprocess(&mut self, frames: &[RgbImage], batch_len: usize) -> Result<Array<f32, ndarray::Ix4>> {
        let (h, w) = (self.input.height as usize, self.input.width as usize);
        let mut ys = Array::from_elem((batch_len, 3, h, w), PAD_VALUE);

        for (idx, frame) in frames.iter().enumerate() {
            let (_, w_new, h_new) = scale_wh(
                frame.width() as f32,
                frame.height() as f32,
                self.input.width,
                self.input.height,
            );
            let src = fr::images::Image::from_vec_u8(
                frame.width(),
                frame.height(),
                frame.as_raw().clone(),
                fr::PixelType::U8x3,
            )?;
            let mut dst = fr::images::Image::new(w_new.max(1), h_new.max(1), fr::PixelType::U8x3);
            self.resizer.resize(
                &src,
                &mut dst,
                &fr::ResizeOptions::new()
                    .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear)),
            )?;

            let row = dst.width() as usize;
            for (i, rgb) in dst.buffer().chunks_exact(3).enumerate() {
                let (x, y) = (i % row, i / row);
                if x >= w || y >= h {
                    continue;
                }
                ys[[idx, 0, y, x]] = rgb[0] as f32 / 255.0;
                ys[[idx, 1, y, x]] = rgb[1] as f32 / 255.0;
                ys[[idx, 2, y, x]] = rgb[2] as f32 / 255.0;
            }
        }

        Ok(ys)
    }

    fn run(&mut self, xs: Array<f32, ndarray::Ix4>) -> Result<ArrayD<f32>> {
        let input = Tensor::from_array(xs).map_err(|e| anyhow!("构建输入张量失败: {e}"))?;
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| anyhow!("模型推理失败: {e}"))?;
        let preds = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e| anyhow!("读取模型输出失败: {e}"))?
            .to_owned();
        Ok(preds)
    }

    /// 单次推理 (帧数不超过模型批大小)
    fn infer(&mut self, frames: &[RgbImage]) -> Result<Vec<FrameDetections>> {
        let batch_len = self.input.batch.unwrap_or(frames.len());
        let t_pre = std::time::Instant::now();
        let xs = self.preprocess(frames, batch_len)?;
        let t_run = std::time::Instant::now();
        let ys = self.run(xs)?;
        let t_post = std::time::Instant::now();
        let sizes: Vec<(u32, u32)> = frames.iter().map(|f| f.dimensions()).collect();
        let results = decode_predictions(
            &ys,
            &sizes,
            (self.input.width, self.input.height),
            self.conf,
            self.iou,
            &self.names,
        )?;
        debug!(
            frames = frames.len(),
            preprocess_ms = (t_run - t_pre).as_secs_f64() * 1000.0,
            inference_ms = (t_post - t_run).as_secs_f64() * 1000.0,
            postprocess_ms = t_post.elapsed().as_secs_f64() * 1000.0,
            "YOLOv8 推理完成"
        );
        Ok(results)
    }
}

impl Detector for YOLOv8 {
    /// 固定批大小的模型按其批大小切分后逐次推理
    fn predict(&mut self, frames: &[RgbImage]) -> Result<Vec<FrameDetections>> {
        if frames.is_empty() {
            return Ok(Vec::new());
        }
        let Some(chunk) = self.input.batch else {
            return self.infer(frames);
        };

        let mut results = Vec::with_capacity(frames.len());
        for batch in frames.chunks(chunk.max(1)) {
            results.extend(self.infer(batch)?);
        }
        Ok(results)
    }
}

/// 等比缩放比例及缩放后尺寸
fn scale_wh(w0: f32, h0: f32, width: u32, height: u32) -> (f32, u32, u32) {
    let r = (width as f32 / w0).min(height as f32 / h0);
    (r, (w0 * r).round() as u32, (h0 * r).round() as u32)
}

/// 后处理: [batch, 4 + nc, anchors] → 每帧检测框
///
/// `frame_sizes` 为原始帧 (宽, 高), `input_size` 为模型输入 (宽, 高)。
/// 输出批次中超出帧数的槽位 (填充帧) 被忽略。
pub fn decode_predictions(
    preds: &ArrayD<f32>,
    frame_sizes: &[(u32, u32)],
    input_size: (u32, u32),
    conf: f32,
    iou: f32,
    names: &ClassNames,
) -> Result<Vec<FrameDetections>> {
    let shape = preds.shape();
    if shape.len() != 3 || shape[0] < frame_sizes.len() || shape[1] <= CXYWH_OFFSET {
        bail!("模型输出形状异常: {:?}", shape);
    }

    let mut ys = Vec::with_capacity(frame_sizes.len());
    for (idx, &(width, height)) in frame_sizes.iter().enumerate() {
        let width_original = width as f32;
        let height_original = height as f32;
        let (ratio, _, _) = scale_wh(width_original, height_original, input_size.0, input_size.1);

        let anchors = preds.slice(s![idx, .., ..]);
        let mut detections = Vec::new();
        for pred in anchors.axis_iter(Axis(1)) {
            let Some((id, confidence)) = pred
                .iter()
                .skip(CXYWH_OFFSET)
                .copied()
                .enumerate()
                .reduce(|max, x| if x.1 > max.1 { x } else { max })
            else {
                continue;
            };
            if confidence < conf {
                continue;
            }

            let cx = pred[0] / ratio;
            let cy = pred[1] / ratio;
            let w = pred[2] / ratio;
            let h = pred[3] / ratio;
            let bbox = BBox::new(
                (cx - w / 2.).clamp(0.0, width_original),
                (cy - h / 2.).clamp(0.0, height_original),
                (cx + w / 2.).clamp(0.0, width_original),
                (cy + h / 2.).clamp(0.0, height_original),
            );
            detections.push(Detection::new(bbox, confidence, id as u32));
        }

        non_max_suppression(&mut detections, iou);
        ys.push(FrameDetections::new(detections, names.clone()));
    }

    Ok(ys)
}

/// 解析模型元数据中的类别名称
pub fn parse_names(raw: &str) -> ClassNames {
    let names: BTreeMap<u32, String> = NAMES_RE
        .captures_iter(raw)
        .filter_map(|cap| Some((cap[1].parse().ok()?, cap[2].to_string())))
        .collect();
    ClassNames::new(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn parses_ultralytics_names_metadata() {
        let names = parse_names("{0: 'ball', 1: 'goalkeeper', 2: 'player', 3: 'referee'}");
        assert_eq!(names.len(), 4);
        assert_eq!(names.id("referee"), Some(3));
        assert_eq!(names.name(0), Some("ball"));
    }

    #[test]
    fn parses_double_quoted_names() {
        let names = parse_names(r#"{0: "person", 32: "sports ball"}"#);
        assert_eq!(names.id("sports ball"), Some(32));
    }

    #[test]
    fn fixed_input_dims_override_config() {
        let shape = InputShape::resolve(&[1, 3, 640, 640], 1280).unwrap();
        assert_eq!(
            shape,
            InputShape {
                batch: Some(1),
                height: 640,
                width: 640
            }
        );
    }

    #[test]
    fn dynamic_input_dims_fall_back_to_config() {
        let shape = InputShape::resolve(&[-1, 3, -1, -1], 960).unwrap();
        assert!(shape.is_batch_dynamic());
        assert_eq!((shape.height, shape.width), (960, 960));

        assert!(InputShape::resolve(&[1, 3, 640], 640).is_err());
        assert!(InputShape::resolve(&[1, 1, 640, 640], 640).is_err());
    }

    /// 按通道行给出 [1, 4 + 2, anchors] 的输出
    fn preds(rows: [[f32; 4]; 6]) -> ArrayD<f32> {
        let data: Vec<f32> = rows.iter().flatten().copied().collect();
        ArrayD::from_shape_vec(IxDyn(&[1, 6, 4]), data).unwrap()
    }

    #[test]
    fn decodes_rescales_and_suppresses() {
        let preds = preds([
            [100.0, 101.0, 300.0, 2.0],  // cx
            [50.0, 50.0, 50.0, 300.0],   // cy
            [20.0, 20.0, 20.0, 20.0],    // w
            [40.0, 40.0, 40.0, 20.0],    // h
            [0.9, 0.8, 0.0, 0.0],        // class 0
            [0.0, 0.0, 0.05, 0.5],       // class 1
        ]);
        let names = ClassNames::from_list(&["player", "ball"]);

        // 1280x720 → 640x640 缩放比例 0.5
        let out = decode_predictions(&preds, &[(1280, 720)], (640, 640), 0.1, 0.45, &names).unwrap();
        assert_eq!(out.len(), 1);
        let dets = &out[0].detections;

        // 低于阈值的锚点被丢弃, 重叠的同类框只保留一个
        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].class_id, 0);
        assert_eq!(dets[0].confidence, 0.9);
        assert_eq!(dets[0].bbox, BBox::new(180.0, 60.0, 220.0, 140.0));

        // 越过左边界的框被裁剪
        assert_eq!(dets[1].class_id, 1);
        assert_eq!(dets[1].bbox, BBox::new(0.0, 580.0, 24.0, 620.0));
        assert_eq!(out[0].names, names);
    }

    #[test]
    fn padded_batch_slots_are_ignored() {
        let preds = ArrayD::<f32>::zeros(IxDyn(&[4, 6, 8]));
        let names = ClassNames::from_list(&["player", "ball"]);
        let out = decode_predictions(&preds, &[(640, 480)], (640, 640), 0.1, 0.45, &names).unwrap();
        assert_eq!(out.len(), 1);
        assert!(out[0].detections.is_empty());

        let too_small = ArrayD::<f32>::zeros(IxDyn(&[1, 6, 8]));
        assert!(decode_predictions(&too_small, &[(640, 480); 2], (640, 640), 0.1, 0.45, &names).is_err());
    }
}
