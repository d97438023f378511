// 该文件是 Saoshi （扫视） 项目的一部分。
// src/model/tract.rs - Tract ONNX 推理引擎
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
use tract_onnx::prelude::*;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Engine, EngineOutputs, ModelError, RawTensor, TensorInput},
};

const TRACT_SCHEME: &str = "tract";
const DEFAULT_INPUT_NAME: &str = "images";
const DEFAULT_INPUT_SIZE: u32 = 640;

#[derive(Error, Debug)]
pub enum TractEngineError {
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("Tract 错误: {0}")]
  TractError(String),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl From<TractError> for TractEngineError {
  fn from(err: TractError) -> Self {
    TractEngineError::TractError(format!("{err}"))
  }
}

pub struct TractEngineBuilder {
  model_path: String,
  input_size: u32,
  input_name: String,
}

impl FromUrlWithScheme for TractEngineBuilder {
  const SCHEME: &'static str = TRACT_SCHEME;
}

impl FromUrl for TractEngineBuilder {
  type Error = TractEngineError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != TRACT_SCHEME {
      return Err(TractEngineError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        TRACT_SCHEME
      )));
    }

    let mut builder = TractEngineBuilder {
      model_path: url.path().to_string(),
      input_size: DEFAULT_INPUT_SIZE,
      input_name: DEFAULT_INPUT_NAME.to_string(),
    };

    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "size" => {
          builder.input_size = v
            .parse()
            .map_err(|_| TractEngineError::ModelPathError(format!("无效的输入尺寸: {}", v)))?;
        }
        "input" => builder.input_name = v.to_string(),
        _ => {}
      }
    }

    Ok(builder)
  }
}

impl TractEngineBuilder {
  pub fn input_size(mut self, size: u32) -> Self {
    self.input_size = size;
    self
  }

  pub fn build(self) -> Result<TractEngine, TractEngineError> {
    info!("加载模型文件: {}", self.model_path);
    let size = self.input_size as usize;
    let model = tract_onnx::onnx()
      .model_for_path(&self.model_path)?
      .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, size, size)))?
      .into_optimized()?
      .into_runnable()?;

    let num_outputs = model.model().outputs.len();
    if num_outputs == 0 {
      return Err(TractEngineError::ModelInvalid(
        "模型没有任何输出".to_string(),
      ));
    }
    debug!("模型输出数量: {}", num_outputs);
    info!("模型加载完成");

    Ok(TractEngine {
      model,
      input_size: self.input_size,
      input_name: self.input_name,
    })
  }
}

/// 基于 tract-onnx 的推理引擎
///
/// Tract 的输入按位置绑定，TensorInput 中的名称仅作记录。
pub struct TractEngine {
  model: TypedSimplePlan<TypedModel>,
  input_size: u32,
  input_name: String,
}

impl TractEngine {
  fn run(&self, input: &TensorInput) -> Result<EngineOutputs, TractEngineError> {
    let expected = [1, 3, self.input_size as usize, self.input_size as usize];
    if input.shape != expected {
      return Err(TractEngineError::ModelInvalid(format!(
        "输入形状不匹配: 期望 {:?}, 实际 {:?}",
        expected, input.shape
      )));
    }

    let tensor = Tensor::from_shape(&input.shape, input.data)?;
    let results = self.model.run(tvec!(tensor.into()))?;

    let mut outputs = Vec::with_capacity(results.len());
    for (index, value) in results.iter().enumerate() {
      let view = value.to_array_view::<f32>()?;
      outputs.push((
        format!("output{}", index),
        RawTensor {
          dims: view.shape().to_vec().into_boxed_slice(),
          data: view.iter().copied().collect::<Vec<_>>().into_boxed_slice(),
        },
      ));
    }

    Ok(EngineOutputs::new(outputs))
  }
}

impl Engine for TractEngine {
  fn input_name(&self) -> &str {
    &self.input_name
  }

  fn infer(&self, input: &TensorInput) -> Result<EngineOutputs, ModelError> {
    debug!("执行模型推理");
    self
      .run(input)
      .map_err(|e| ModelError::InferenceFailure(e.to_string()))
  }
}
