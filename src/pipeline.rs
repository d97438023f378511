// 该文件是 Saoshi （扫视） 项目的一部分。
// src/pipeline.rs - 单帧检测流水线
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::time::Duration;

use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use crate::model::{Engine, ModelError, TensorInput};

pub mod governor;
pub mod letterbox;
pub mod nms;
pub mod remap;
pub mod smooth;
pub mod tensor;

mod filter;

pub use self::filter::{FilteredCandidates, filter_candidates};
pub use self::governor::{DropReason, FrameGovernor, GovernorState, InFlightGuard};
pub use self::letterbox::{DEFAULT_CANVAS_SIZE, LetterboxParams, Letterboxer};
pub use self::nms::nms;
pub use self::remap::remap_box;
pub use self::smooth::TemporalSmoother;
pub use self::tensor::{CandidateTable, TensorLayout};

/// 一个最终检测结果，边界框为源帧像素坐标 (x1, y1, x2, y2)
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub bbox: [f32; 4],
  pub score: f32,
  pub class_id: usize,
}

impl Detection {
  /// 边界框中心点
  pub fn center(&self) -> (f32, f32) {
    (
      (self.bbox[0] + self.bbox[2]) / 2.0,
      (self.bbox[1] + self.bbox[3]) / 2.0,
    )
  }
}

#[derive(Error, Debug)]
pub enum PipelineError {
  /// 模型输出批大小不为 1，该帧跳过
  #[error("不支持的批大小: {0}")]
  UnsupportedBatchSize(usize),
  /// 输出张量秩或长度异常，与批大小错误同类处理，该帧跳过
  #[error("输出张量形状异常: {0:?}")]
  MalformedTensor(Box<[usize]>),
  #[error("模型没有产生输出")]
  MissingOutput,
  #[error("推理失败: {0}")]
  InferenceFailure(#[from] ModelError),
}

impl PipelineError {
  /// 解码类错误（区别于引擎调用失败）
  pub fn is_decode_error(&self) -> bool {
    matches!(
      self,
      PipelineError::UnsupportedBatchSize(_)
        | PipelineError::MalformedTensor(_)
        | PipelineError::MissingOutput
    )
  }
}

/// 流水线可调参数
#[derive(Debug, Clone)]
pub struct PipelineConfig {
  /// 信箱画布边长
  pub canvas_size: u32,
  /// 置信度阈值，候选分数达到该值（含）保留
  pub confidence_threshold: f32,
  /// NMS IoU 阈值
  pub iou_threshold: f32,
  /// 时间平滑系数，越大越偏向当前帧
  pub smoothing_alpha: f32,
  /// 跨帧关联半径（源帧像素）
  pub association_radius: f32,
  /// 平滑历史容量
  pub history_capacity: usize,
  /// 两次准入之间的最小间隔
  pub min_interval: Duration,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      canvas_size: DEFAULT_CANVAS_SIZE,
      confidence_threshold: 0.5,
      iou_threshold: 0.7,
      smoothing_alpha: 0.65,
      association_radius: 80.0,
      history_capacity: 5,
      min_interval: Duration::from_millis(100),
    }
  }
}

impl PipelineConfig {
  pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
    self.confidence_threshold = threshold;
    self
  }

  pub fn with_iou_threshold(mut self, threshold: f32) -> Self {
    self.iou_threshold = threshold;
    self
  }

  pub fn with_smoothing_alpha(mut self, alpha: f32) -> Self {
    self.smoothing_alpha = alpha;
    self
  }

  pub fn with_association_radius(mut self, radius: f32) -> Self {
    self.association_radius = radius;
    self
  }

  pub fn with_min_interval(mut self, interval: Duration) -> Self {
    self.min_interval = interval;
    self
  }

  pub fn with_canvas_size(mut self, size: u32) -> Self {
    self.canvas_size = size;
    self
  }
}

/// 每个扫描会话独占的流水线状态
///
/// 由调用方显式构造并持有，而不是进程级全局状态；`reset` 对应
/// 扫描停止时的状态清空（历史、缓存的信箱参数、失败计数保留）。
pub struct FramePipeline {
  config: PipelineConfig,
  letterboxer: Letterboxer,
  smoother: TemporalSmoother,
  inference_failures: u64,
  decode_failures: u64,
}

impl FramePipeline {
  pub fn new(config: PipelineConfig) -> Self {
    let letterboxer = Letterboxer::new(config.canvas_size);
    let smoother = TemporalSmoother::new(
      config.smoothing_alpha,
      config.association_radius,
      config.history_capacity,
    );
    Self {
      config,
      letterboxer,
      smoother,
      inference_failures: 0,
      decode_failures: 0,
    }
  }

  pub fn config(&self) -> &PipelineConfig {
    &self.config
  }

  /// 清空平滑历史与缓存的信箱参数
  pub fn reset(&mut self) {
    self.letterboxer.reset();
    self.smoother.reset();
  }

  /// 推理调用失败的帧数
  pub fn inference_failures(&self) -> u64 {
    self.inference_failures
  }

  /// 输出张量解码失败的帧数
  pub fn decode_failures(&self) -> u64 {
    self.decode_failures
  }

  /// 当前平滑历史长度
  pub fn history_len(&self) -> usize {
    self.smoother.history_len()
  }

  /// 处理一帧：信箱预处理 → 推理 → 解码 → 过滤 → NMS → 逆映射 → 平滑
  ///
  /// 任何失败只作用于当前帧；失败计入相应计数器，调用方记录后继续。
  pub fn process<E: Engine>(
    &mut self,
    engine: &E,
    image: &RgbImage,
  ) -> Result<Vec<Detection>, PipelineError> {
    match self.run(engine, image) {
      Ok(detections) => Ok(detections),
      Err(err) => {
        if err.is_decode_error() {
          self.decode_failures += 1;
        } else {
          self.inference_failures += 1;
        }
        Err(err)
      }
    }
  }

  fn run<E: Engine>(
    &mut self,
    engine: &E,
    image: &RgbImage,
  ) -> Result<Vec<Detection>, PipelineError> {
    let (vw, vh) = image.dimensions();
    let size = self.config.canvas_size as usize;

    // 本次调用捕获自己的信箱参数，逆映射始终使用同一份
    let (canvas, params) = self.letterboxer.letterbox(image);

    let input = TensorInput {
      name: engine.input_name(),
      shape: [1, 3, size, size],
      data: canvas.as_planar(),
    };
    let outputs = engine.infer(&input)?;
    let raw = outputs.primary().ok_or(PipelineError::MissingOutput)?;

    let table = CandidateTable::from_raw(raw)?;
    debug!(
      "输出张量: {:?}, {} 个候选, {} 个通道",
      table.layout(),
      table.num_candidates(),
      table.channels()
    );

    let filtered = filter_candidates(&table, self.config.confidence_threshold);
    let keep = nms(&filtered.boxes, &filtered.scores, self.config.iou_threshold);

    let mut detections = Vec::with_capacity(keep.len());
    for &index in &keep {
      detections.push(Detection {
        bbox: remap_box(filtered.boxes[index], &params, vw, vh),
        score: filtered.scores[index],
        class_id: filtered.class_ids[index],
      });
    }

    debug!("检测到 {} 个物体", detections.len());
    Ok(self.smoother.smooth(detections))
  }
}
