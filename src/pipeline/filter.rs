// 该文件是 Saoshi （扫视） 项目的一部分。
// src/pipeline/filter.rs - 候选过滤
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

use crate::pipeline::tensor::CandidateTable;

/// 过滤后的候选，三个序列平行且保持输入行序（尚未按分数排序）
#[derive(Debug, Clone, Default)]
pub struct FilteredCandidates {
  /// 画布坐标角点形式 (x1, y1, x2, y2)
  pub boxes: Vec<[f32; 4]>,
  pub scores: Vec<f32>,
  pub class_ids: Vec<usize>,
}

impl FilteredCandidates {
  pub fn len(&self) -> usize {
    self.boxes.len()
  }

  pub fn is_empty(&self) -> bool {
    self.boxes.is_empty()
  }
}

/// 逐行取最优类别，分数达到阈值（含）保留，并把盒编码转为角点形式
pub fn filter_candidates(table: &CandidateTable, confidence_threshold: f32) -> FilteredCandidates {
  let mut filtered = FilteredCandidates::default();

  for n in 0..table.num_candidates() {
    let mut best_score = f32::NEG_INFINITY;
    let mut best_class = 0usize;
    for k in 0..table.num_classes() {
      let score = table.value(n, 4 + k);
      if score > best_score {
        best_score = score;
        best_class = k;
      }
    }

    if best_score < confidence_threshold {
      continue;
    }

    let cx = table.value(n, 0);
    let cy = table.value(n, 1);
    let w = table.value(n, 2);
    let h = table.value(n, 3);

    filtered.boxes.push([
      cx - w / 2.0,
      cy - h / 2.0,
      cx + w / 2.0,
      cy + h / 2.0,
    ]);
    filtered.scores.push(best_score);
    filtered.class_ids.push(best_class);
  }

  filtered
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::StubEngine;
  use crate::pipeline::tensor::CandidateTable;

  #[test]
  fn threshold_boundary_is_inclusive() {
    // 两个类别: 一行恰好等于阈值, 一行低一个 epsilon
    let rows = vec![
      vec![100.0, 100.0, 20.0, 20.0, 0.5, 0.1],
      vec![200.0, 200.0, 20.0, 20.0, 0.5 - f32::EPSILON, 0.1],
      vec![0.0; 6],
      vec![0.0; 6],
      vec![0.0; 6],
      vec![0.0; 6],
    ];
    let raw = StubEngine::channel_major(2, &rows);
    let table = CandidateTable::from_raw(&raw).unwrap();
    let filtered = filter_candidates(&table, 0.5);

    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered.class_ids[0], 0);
    assert_eq!(filtered.scores[0], 0.5);
  }

  #[test]
  fn boxes_converted_to_corner_form() {
    // 注意 (1, N, C) 需要 N > C 才会被轴序规则判定为候选主序
    let rows = vec![
      vec![100.0, 80.0, 40.0, 20.0, 0.2, 0.9],
      vec![0.0; 6],
      vec![0.0; 6],
      vec![0.0; 6],
      vec![0.0; 6],
      vec![0.0; 6],
      vec![0.0; 6],
    ];
    let raw = StubEngine::candidate_major(2, &rows);
    let table = CandidateTable::from_raw(&raw).unwrap();
    let filtered = filter_candidates(&table, 0.5);

    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered.boxes[0], [80.0, 70.0, 120.0, 90.0]);
    assert_eq!(filtered.class_ids[0], 1);
  }

  #[test]
  fn output_preserves_input_row_order() {
    let rows = vec![
      vec![10.0, 10.0, 4.0, 4.0, 0.6, 0.0],
      vec![20.0, 20.0, 4.0, 4.0, 0.9, 0.0],
      vec![30.0, 30.0, 4.0, 4.0, 0.7, 0.0],
      vec![0.0; 6],
      vec![0.0; 6],
      vec![0.0; 6],
    ];
    let raw = StubEngine::channel_major(2, &rows);
    let table = CandidateTable::from_raw(&raw).unwrap();
    let filtered = filter_candidates(&table, 0.5);

    // 行序与输入一致, 不按分数排序
    assert_eq!(filtered.scores, vec![0.6, 0.9, 0.7]);
  }
}
