// 该文件是 Saoshi （扫视） 项目的一部分。
// src/model/stub.rs - 固定输出的桩引擎
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

use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Engine, EngineOutputs, ModelError, RawTensor, TensorInput},
};

const STUB_CLASS_NUM: usize = 80;
const STUB_CANDIDATE_NUM: usize = 100;
const STUB_OUTPUT_NAME: &str = "output0";
const STUB_INPUT_NAME: &str = "images";

/// 每次推理都返回同一份预置输出的引擎，用于测试与演示
pub struct StubEngine {
  input_name: String,
  outputs: EngineOutputs,
}

impl StubEngine {
  /// 输出一张全零的 (1, C, N) 张量，过滤后没有任何检测
  pub fn empty() -> Self {
    let channels = 4 + STUB_CLASS_NUM;
    let tensor = RawTensor {
      dims: vec![1, channels, STUB_CANDIDATE_NUM].into_boxed_slice(),
      data: vec![0.0; channels * STUB_CANDIDATE_NUM].into_boxed_slice(),
    };
    Self::with_tensor(tensor)
  }

  pub fn with_tensor(tensor: RawTensor) -> Self {
    Self {
      input_name: STUB_INPUT_NAME.to_string(),
      outputs: EngineOutputs::new(vec![(STUB_OUTPUT_NAME.to_string(), tensor)]),
    }
  }

  pub fn with_outputs(outputs: EngineOutputs) -> Self {
    Self {
      input_name: STUB_INPUT_NAME.to_string(),
      outputs,
    }
  }

  /// 构造 (1, C, N) 排列的候选张量，行格式为 (cx, cy, w, h, 各类分数)
  ///
  /// 注意轴序判定规则要求 N >= C，候选不足时调用方需补零行。
  pub fn channel_major(num_classes: usize, rows: &[Vec<f32>]) -> RawTensor {
    let channels = 4 + num_classes;
    let num = rows.len();
    let mut data = vec![0.0f32; channels * num];
    for (n, row) in rows.iter().enumerate() {
      assert_eq!(row.len(), channels, "候选行长度与通道数不一致");
      for (c, value) in row.iter().enumerate() {
        data[c * num + n] = *value;
      }
    }
    RawTensor {
      dims: vec![1, channels, num].into_boxed_slice(),
      data: data.into_boxed_slice(),
    }
  }

  /// 构造 (1, N, C) 排列的候选张量
  pub fn candidate_major(num_classes: usize, rows: &[Vec<f32>]) -> RawTensor {
    let channels = 4 + num_classes;
    let num = rows.len();
    let mut data = vec![0.0f32; num * channels];
    for (n, row) in rows.iter().enumerate() {
      assert_eq!(row.len(), channels, "候选行长度与通道数不一致");
      data[n * channels..(n + 1) * channels].copy_from_slice(row);
    }
    RawTensor {
      dims: vec![1, num, channels].into_boxed_slice(),
      data: data.into_boxed_slice(),
    }
  }
}

impl FromUrlWithScheme for StubEngine {
  const SCHEME: &'static str = "stub";
}

impl FromUrl for StubEngine {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ModelError::SchemeMismatch);
    }
    Ok(Self::empty())
  }
}

impl Engine for StubEngine {
  fn input_name(&self) -> &str {
    &self.input_name
  }

  fn infer(&self, _input: &TensorInput) -> Result<EngineOutputs, ModelError> {
    Ok(self.outputs.clone())
  }
}
