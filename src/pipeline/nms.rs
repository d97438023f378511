// 该文件是 Saoshi （扫视） 项目的一部分。
// src/pipeline/nms.rs - 非极大值抑制
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

/// 并集分母修正项，避免零面积相除
const UNION_EPSILON: f32 = 1e-9;

/// 计算两个轴对齐矩形的 IoU，零面积盒视为无重叠
fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
  let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);

  inter / (area_a + area_b - inter + UNION_EPSILON)
}

/// 贪心分数序 IoU 抑制，返回保留的下标
///
/// 抑制是全类别的，类别不参与判定。分数相同时按原始顺序
/// 先出现者先保留，结果可复现。
pub fn nms(boxes: &[[f32; 4]], scores: &[f32], iou_threshold: f32) -> Vec<usize> {
  let mut order: Vec<usize> = (0..boxes.len()).collect();
  // 稳定排序保证同分时维持原始顺序
  order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

  let mut keep = Vec::new();
  while let Some(&index) = order.first() {
    keep.push(index);
    order.retain(|&other| other != index && iou(&boxes[index], &boxes[other]) <= iou_threshold);
  }

  keep
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn suppression_is_deterministic() {
    let boxes = [
      [0.0, 0.0, 10.0, 10.0],
      [1.0, 1.0, 11.0, 11.0],
      [50.0, 50.0, 60.0, 60.0],
    ];
    let scores = [0.9, 0.8, 0.95];
    let keep = nms(&boxes, &scores, 0.5);
    // 2 号分数最高先保留; 0 号与之无重叠; 1 号被 0 号抑制
    assert_eq!(keep, vec![2, 0]);
  }

  #[test]
  fn rerun_on_kept_set_is_identity() {
    let boxes = [
      [0.0, 0.0, 10.0, 10.0],
      [1.0, 1.0, 11.0, 11.0],
      [50.0, 50.0, 60.0, 60.0],
      [49.0, 49.0, 61.0, 61.0],
    ];
    let scores = [0.9, 0.8, 0.95, 0.7];
    let keep = nms(&boxes, &scores, 0.5);

    let kept_boxes: Vec<[f32; 4]> = keep.iter().map(|&i| boxes[i]).collect();
    let kept_scores: Vec<f32> = keep.iter().map(|&i| scores[i]).collect();
    let again = nms(&kept_boxes, &kept_scores, 0.5);

    assert_eq!(again, (0..keep.len()).collect::<Vec<_>>());
  }

  #[test]
  fn ties_resolve_by_original_order() {
    let boxes = [
      [0.0, 0.0, 10.0, 10.0],
      [100.0, 100.0, 110.0, 110.0],
    ];
    let scores = [0.8, 0.8];
    assert_eq!(nms(&boxes, &scores, 0.5), vec![0, 1]);
  }

  #[test]
  fn zero_area_boxes_never_overlap() {
    let boxes = [[5.0, 5.0, 5.0, 5.0], [0.0, 0.0, 10.0, 10.0]];
    let scores = [0.9, 0.8];
    // 零面积盒 IoU 为 0, 两者都保留
    assert_eq!(nms(&boxes, &scores, 0.5), vec![0, 1]);
  }

  #[test]
  fn suppression_ignores_class() {
    // 由调用方语义保证: 这里只有盒和分数, 没有类别参与
    let boxes = [[0.0, 0.0, 10.0, 10.0], [0.0, 0.0, 10.0, 10.0]];
    let scores = [0.9, 0.85];
    assert_eq!(nms(&boxes, &scores, 0.5), vec![0]);
  }
}
