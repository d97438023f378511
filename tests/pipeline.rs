// 该文件是 Saoshi （扫视） 项目的一部分。
// tests/pipeline.rs - 流水线端到端测试
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

use image::RgbImage;

use saoshi::model::{Engine, EngineOutputs, ModelError, RawTensor, StubEngine, TensorInput};
use saoshi::pipeline::{FramePipeline, PipelineConfig, PipelineError};

/// 每次调用都失败的引擎
struct FailingEngine;

impl Engine for FailingEngine {
  fn input_name(&self) -> &str {
    "images"
  }

  fn infer(&self, _input: &TensorInput) -> Result<EngineOutputs, ModelError> {
    Err(ModelError::InferenceFailure("engine down".to_string()))
  }
}

/// 320x240 源帧, 640 画布: scale = 2.0, pad_x = 0, pad_y = 80
fn test_image() -> RgbImage {
  RgbImage::from_pixel(320, 240, image::Rgb([32, 64, 96]))
}

fn zero_row() -> Vec<f32> {
  vec![0.0; 6]
}

#[test]
fn detections_end_up_in_frame_space() {
  // 两个高度重叠的候选: 全局 NMS 只留下分数高的那个
  let mut rows = vec![
    vec![320.0, 320.0, 160.0, 160.0, 0.1, 0.9],
    vec![322.0, 322.0, 160.0, 160.0, 0.1, 0.8],
  ];
  rows.extend(std::iter::repeat_with(zero_row).take(6));
  let engine = StubEngine::with_tensor(StubEngine::channel_major(2, &rows));

  let mut pipeline = FramePipeline::new(PipelineConfig::default());
  let detections = pipeline.process(&engine, &test_image()).unwrap();

  assert_eq!(detections.len(), 1);
  // 画布 (240,240,400,400) 逆映射回源帧
  assert_eq!(detections[0].bbox, [120.0, 80.0, 200.0, 160.0]);
  assert_eq!(detections[0].class_id, 1);
  assert!((detections[0].score - 0.9).abs() < 1e-6);
}

#[test]
fn candidate_major_layout_gives_same_result() {
  let mut rows = vec![vec![320.0, 320.0, 160.0, 160.0, 0.1, 0.9]];
  rows.extend(std::iter::repeat_with(zero_row).take(7));
  let engine = StubEngine::with_tensor(StubEngine::candidate_major(2, &rows));

  let mut pipeline = FramePipeline::new(PipelineConfig::default());
  let detections = pipeline.process(&engine, &test_image()).unwrap();

  assert_eq!(detections.len(), 1);
  assert_eq!(detections[0].bbox, [120.0, 80.0, 200.0, 160.0]);
}

#[test]
fn boxes_clipped_to_frame_bounds() {
  // 候选盒越过画布右下边界
  let mut rows = vec![vec![600.0, 560.0, 200.0, 200.0, 0.9, 0.1]];
  rows.extend(std::iter::repeat_with(zero_row).take(7));
  let engine = StubEngine::with_tensor(StubEngine::channel_major(2, &rows));

  let mut pipeline = FramePipeline::new(PipelineConfig::default());
  let detections = pipeline.process(&engine, &test_image()).unwrap();

  assert_eq!(detections.len(), 1);
  let bbox = detections[0].bbox;
  assert!(bbox[2] <= 319.0);
  assert!(bbox[3] <= 239.0);
}

#[test]
fn smoothing_blends_across_frames() {
  let alpha = 0.5;
  let config = PipelineConfig::default().with_smoothing_alpha(alpha);
  let mut pipeline = FramePipeline::new(config);

  let mut rows = vec![vec![320.0, 320.0, 160.0, 160.0, 0.1, 0.9]];
  rows.extend(std::iter::repeat_with(zero_row).take(7));
  let engine = StubEngine::with_tensor(StubEngine::channel_major(2, &rows));
  let first = pipeline.process(&engine, &test_image()).unwrap();
  assert_eq!(first[0].bbox, [120.0, 80.0, 200.0, 160.0]);

  // 目标移动 4 像素, 关联成功并按系数混合
  let mut rows = vec![vec![328.0, 328.0, 160.0, 160.0, 0.1, 0.9]];
  rows.extend(std::iter::repeat_with(zero_row).take(7));
  let engine = StubEngine::with_tensor(StubEngine::channel_major(2, &rows));
  let second = pipeline.process(&engine, &test_image()).unwrap();

  assert_eq!(second[0].bbox, [122.0, 82.0, 202.0, 162.0]);
  assert_eq!(pipeline.history_len(), 2);
}

#[test]
fn reset_clears_session_state() {
  let mut rows = vec![vec![320.0, 320.0, 160.0, 160.0, 0.1, 0.9]];
  rows.extend(std::iter::repeat_with(zero_row).take(7));
  let engine = StubEngine::with_tensor(StubEngine::channel_major(2, &rows));

  let mut pipeline = FramePipeline::new(PipelineConfig::default());
  pipeline.process(&engine, &test_image()).unwrap();
  assert_eq!(pipeline.history_len(), 1);

  pipeline.reset();
  assert_eq!(pipeline.history_len(), 0);
}

#[test]
fn inference_failure_is_counted_and_not_fatal() {
  let mut pipeline = FramePipeline::new(PipelineConfig::default());

  let result = pipeline.process(&FailingEngine, &test_image());
  assert!(matches!(result, Err(PipelineError::InferenceFailure(_))));
  assert_eq!(pipeline.inference_failures(), 1);
  assert_eq!(pipeline.decode_failures(), 0);

  // 下一帧换一个正常引擎, 会话照常工作
  let engine = StubEngine::empty();
  let detections = pipeline.process(&engine, &test_image()).unwrap();
  assert!(detections.is_empty());
}

#[test]
fn unsupported_batch_is_a_decode_failure() {
  let tensor = RawTensor {
    dims: vec![2, 6, 8].into_boxed_slice(),
    data: vec![0.0; 96].into_boxed_slice(),
  };
  let engine = StubEngine::with_tensor(tensor);

  let mut pipeline = FramePipeline::new(PipelineConfig::default());
  let result = pipeline.process(&engine, &test_image());

  assert!(matches!(
    result,
    Err(PipelineError::UnsupportedBatchSize(2))
  ));
  assert_eq!(pipeline.decode_failures(), 1);
}

#[test]
fn empty_stub_yields_no_detections() {
  let engine = StubEngine::empty();
  let mut pipeline = FramePipeline::new(PipelineConfig::default());
  let detections = pipeline.process(&engine, &test_image()).unwrap();
  assert!(detections.is_empty());
}
