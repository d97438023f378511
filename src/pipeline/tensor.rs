// 该文件是 Saoshi （扫视） 项目的一部分。
// src/pipeline/tensor.rs - 原始输出张量解码
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

use crate::model::RawTensor;
use crate::pipeline::PipelineError;

/// 盒编码占用的通道数 (cx, cy, w, h)
const BOX_CHANNELS: usize = 4;

/// 模型输出的两种轴序，对每个张量只判定一次
///
/// 判定规则: dims[2] < dims[1] 时为 (1, N, C)，否则为 (1, C, N)。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
  /// (1, N, C): 候选为外层轴，行内连续
  CandidateMajor,
  /// (1, C, N): 通道为外层轴，按候选跨步访问
  ChannelMajor,
}

/// 统一为行主序语义的候选表视图
///
/// 不复制数据；两种轴序都通过跨步下标读取，通道含义不变。
pub struct CandidateTable<'a> {
  data: &'a [f32],
  layout: TensorLayout,
  num_candidates: usize,
  channels: usize,
}

impl<'a> CandidateTable<'a> {
  pub fn from_raw(raw: &'a RawTensor) -> Result<Self, PipelineError> {
    if raw.dims.len() != 3 {
      return Err(PipelineError::MalformedTensor(raw.dims.clone()));
    }
    if raw.dims[0] != 1 {
      return Err(PipelineError::UnsupportedBatchSize(raw.dims[0]));
    }

    let (layout, num_candidates, channels) = if raw.dims[2] < raw.dims[1] {
      (TensorLayout::CandidateMajor, raw.dims[1], raw.dims[2])
    } else {
      (TensorLayout::ChannelMajor, raw.dims[2], raw.dims[1])
    };

    // 至少需要盒编码加一个类别分数
    if channels <= BOX_CHANNELS || raw.data.len() != num_candidates * channels {
      return Err(PipelineError::MalformedTensor(raw.dims.clone()));
    }

    Ok(Self {
      data: &raw.data,
      layout,
      num_candidates,
      channels,
    })
  }

  pub fn layout(&self) -> TensorLayout {
    self.layout
  }

  pub fn num_candidates(&self) -> usize {
    self.num_candidates
  }

  pub fn channels(&self) -> usize {
    self.channels
  }

  /// 类别数
  pub fn num_classes(&self) -> usize {
    self.channels - BOX_CHANNELS
  }

  /// 读取第 candidate 行的第 channel 个值
  pub fn value(&self, candidate: usize, channel: usize) -> f32 {
    match self.layout {
      TensorLayout::CandidateMajor => self.data[candidate * self.channels + channel],
      TensorLayout::ChannelMajor => self.data[channel * self.num_candidates + candidate],
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::RawTensor;

  fn tensor(dims: &[usize], data: Vec<f32>) -> RawTensor {
    RawTensor {
      dims: dims.to_vec().into_boxed_slice(),
      data: data.into_boxed_slice(),
    }
  }

  #[test]
  fn candidate_major_layout_resolved() {
    // (1, N=6, C=5): dims[2] < dims[1]
    let raw = tensor(&[1, 6, 5], (0..30).map(|v| v as f32).collect());
    let table = CandidateTable::from_raw(&raw).unwrap();
    assert_eq!(table.layout(), TensorLayout::CandidateMajor);
    assert_eq!(table.num_candidates(), 6);
    assert_eq!(table.channels(), 5);
    assert_eq!(table.num_classes(), 1);
    // 第 2 行第 3 个值: 2*5+3
    assert_eq!(table.value(2, 3), 13.0);
  }

  #[test]
  fn channel_major_layout_transposed() {
    // (1, C=5, N=6): 逻辑转置后与行主序一致
    let raw = tensor(&[1, 5, 6], (0..30).map(|v| v as f32).collect());
    let table = CandidateTable::from_raw(&raw).unwrap();
    assert_eq!(table.layout(), TensorLayout::ChannelMajor);
    assert_eq!(table.num_candidates(), 6);
    assert_eq!(table.channels(), 5);
    // 第 2 个候选的第 3 个通道: 3*6+2
    assert_eq!(table.value(2, 3), 20.0);
  }

  #[test]
  fn batch_size_other_than_one_rejected() {
    let raw = tensor(&[2, 5, 6], vec![0.0; 60]);
    match CandidateTable::from_raw(&raw) {
      Err(PipelineError::UnsupportedBatchSize(batch)) => assert_eq!(batch, 2),
      other => panic!("期望批大小错误, 实际 {:?}", other.map(|_| ())),
    }
  }

  #[test]
  fn unexpected_rank_rejected() {
    let raw = tensor(&[1, 30], vec![0.0; 30]);
    assert!(matches!(
      CandidateTable::from_raw(&raw),
      Err(PipelineError::MalformedTensor(_))
    ));

    let raw = tensor(&[1, 2, 3, 5], vec![0.0; 30]);
    assert!(matches!(
      CandidateTable::from_raw(&raw),
      Err(PipelineError::MalformedTensor(_))
    ));
  }

  #[test]
  fn data_length_mismatch_rejected() {
    let raw = tensor(&[1, 5, 6], vec![0.0; 29]);
    assert!(matches!(
      CandidateTable::from_raw(&raw),
      Err(PipelineError::MalformedTensor(_))
    ));
  }
}
