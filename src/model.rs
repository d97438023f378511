// 该文件是 Saoshi （扫视） 项目的一部分。
// src/model.rs - 推理引擎接口定义
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

use thiserror::Error;
use url::Url;

use crate::FromUrl;

mod stub;
pub use self::stub::StubEngine;

#[cfg(feature = "model_tract")]
mod tract;
#[cfg(feature = "model_tract")]
pub use self::tract::{TractEngine, TractEngineBuilder, TractEngineError};

/// 推理输入张量，命名、float32、形状固定为 [1, 3, S, S]
pub struct TensorInput<'a> {
  pub name: &'a str,
  pub shape: [usize; 4],
  pub data: &'a [f32],
}

/// 推理引擎返回的原始输出张量
#[derive(Debug, Clone)]
pub struct RawTensor {
  pub dims: Box<[usize]>,
  pub data: Box<[f32]>,
}

/// 输出名称到张量的映射
#[derive(Debug, Clone, Default)]
pub struct EngineOutputs {
  outputs: Vec<(String, RawTensor)>,
}

impl EngineOutputs {
  pub fn new(outputs: Vec<(String, RawTensor)>) -> Self {
    Self { outputs }
  }

  /// 第一个输出张量，检测流水线只消费这一个
  pub fn primary(&self) -> Option<&RawTensor> {
    self.outputs.first().map(|(_, tensor)| tensor)
  }

  pub fn get(&self, name: &str) -> Option<&RawTensor> {
    self
      .outputs
      .iter()
      .find(|(n, _)| n == name)
      .map(|(_, tensor)| tensor)
  }

  pub fn len(&self) -> usize {
    self.outputs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.outputs.is_empty()
  }
}

#[derive(Error, Debug)]
pub enum ModelError {
  /// 推理会话尚未就绪，该帧跳过
  #[error("推理会话不可用")]
  SessionUnavailable,
  /// 引擎调用失败，该帧跳过，扫描循环继续
  #[error("推理执行失败: {0}")]
  InferenceFailure(String),
  #[error("模型加载错误: {0}")]
  ModelLoadError(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

/// 推理引擎
///
/// 流水线把推理视为一次不透明的外部调用：输入一个命名张量，返回
/// 输出名称到张量的映射。调用可能失败，失败由调用方按帧捕获。
pub trait Engine {
  /// 模型期望的输入张量名称
  fn input_name(&self) -> &str;

  fn infer(&self, input: &TensorInput) -> Result<EngineOutputs, ModelError>;
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn from_label_id(id: u32) -> Self;
  fn to_label_id(&self) -> u32;
}

/// COCO 数据集类别名称
pub const COCO_CLASSES: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

/// COCO 类别标签，未知编号退化为数字本身
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CocoLabel(u32);

impl WithLabel for CocoLabel {
  fn to_label_str(&self) -> String {
    COCO_CLASSES
      .get(self.0 as usize)
      .map(|name| name.to_string())
      .unwrap_or_else(|| format!("{}", self.0))
  }

  fn from_label_id(id: u32) -> Self {
    CocoLabel(id)
  }

  fn to_label_id(&self) -> u32 {
    self.0
  }
}

pub enum EngineWrapper {
  Stub(StubEngine),
  #[cfg(feature = "model_tract")]
  Tract(TractEngine),
}

impl FromUrl for EngineWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == StubEngine::SCHEME {
        return Ok(EngineWrapper::Stub(StubEngine::from_url(url)?));
      }
    }
    #[cfg(feature = "model_tract")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == TractEngineBuilder::SCHEME {
        let engine = TractEngineBuilder::from_url(url)
          .map_err(|e| ModelError::ModelLoadError(e.to_string()))?
          .build()
          .map_err(|e| ModelError::ModelLoadError(e.to_string()))?;
        return Ok(EngineWrapper::Tract(engine));
      }
    }
    Err(ModelError::SchemeMismatch)
  }
}

impl Engine for EngineWrapper {
  fn input_name(&self) -> &str {
    match self {
      EngineWrapper::Stub(engine) => engine.input_name(),
      #[cfg(feature = "model_tract")]
      EngineWrapper::Tract(engine) => engine.input_name(),
    }
  }

  fn infer(&self, input: &TensorInput) -> Result<EngineOutputs, ModelError> {
    match self {
      EngineWrapper::Stub(engine) => engine.infer(input),
      #[cfg(feature = "model_tract")]
      EngineWrapper::Tract(engine) => engine.infer(input),
    }
  }
}
