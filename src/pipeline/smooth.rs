// 该文件是 Saoshi （扫视） 项目的一部分。
// src/pipeline/smooth.rs - 跨帧时间平滑
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

use std::collections::VecDeque;

use crate::pipeline::Detection;

/// 跨帧平滑器
///
/// 只与上一帧的平滑输出做同类别最近中心点关联，关联成功的盒
/// 做指数平滑，未关联的原样通过。一跳之外不保留任何身份信息，
/// 遮挡或交叉的目标可能串位，这是已知取舍。
pub struct TemporalSmoother {
  alpha: f32,
  radius: f32,
  capacity: usize,
  history: VecDeque<Vec<Detection>>,
}

impl TemporalSmoother {
  pub fn new(alpha: f32, radius: f32, capacity: usize) -> Self {
    Self {
      alpha,
      radius,
      capacity,
      history: VecDeque::new(),
    }
  }

  /// 清空滚动历史
  pub fn reset(&mut self) {
    self.history.clear();
  }

  pub fn history_len(&self) -> usize {
    self.history.len()
  }

  /// 平滑当前帧检测并推入历史（超出容量时淘汰最旧一帧）
  pub fn smooth(&mut self, current: Vec<Detection>) -> Vec<Detection> {
    let smoothed = match self.history.back() {
      None => current,
      Some(previous) => current
        .into_iter()
        .map(|detection| self.blend(detection, previous))
        .collect(),
    };

    self.history.push_back(smoothed.clone());
    while self.history.len() > self.capacity {
      self.history.pop_front();
    }

    smoothed
  }

  /// 在上一帧同类别检测中找最近中心点，半径内按系数混合坐标
  fn blend(&self, detection: Detection, previous: &[Detection]) -> Detection {
    let (cx, cy) = detection.center();

    let mut best: Option<(&Detection, f32)> = None;
    for prev in previous {
      if prev.class_id != detection.class_id {
        continue;
      }
      let (px, py) = prev.center();
      let distance = ((cx - px).powi(2) + (cy - py).powi(2)).sqrt();
      if best.map(|(_, d)| distance < d).unwrap_or(true) {
        best = Some((prev, distance));
      }
    }

    match best {
      Some((prev, distance)) if distance < self.radius => {
        let mut bbox = detection.bbox;
        for (value, prev_value) in bbox.iter_mut().zip(prev.bbox.iter()) {
          *value = self.alpha * *value + (1.0 - self.alpha) * prev_value;
        }
        Detection { bbox, ..detection }
      }
      // 新目标或距离过远: 不平滑
      _ => detection,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn detection(bbox: [f32; 4], class_id: usize) -> Detection {
    Detection {
      bbox,
      score: 0.9,
      class_id,
    }
  }

  #[test]
  fn first_frame_passes_through() {
    let mut smoother = TemporalSmoother::new(0.5, 80.0, 5);
    let current = vec![detection([10.0, 10.0, 20.0, 20.0], 0)];
    let smoothed = smoother.smooth(current.clone());
    assert_eq!(smoothed, current);
    assert_eq!(smoother.history_len(), 1);
  }

  #[test]
  fn associated_detection_blended() {
    let mut smoother = TemporalSmoother::new(0.5, 80.0, 5);
    smoother.smooth(vec![detection([10.0, 10.0, 20.0, 20.0], 0)]);
    let smoothed = smoother.smooth(vec![detection([14.0, 14.0, 24.0, 24.0], 0)]);
    assert_eq!(smoothed[0].bbox, [12.0, 12.0, 22.0, 22.0]);
  }

  #[test]
  fn different_class_not_associated() {
    let mut smoother = TemporalSmoother::new(0.5, 80.0, 5);
    smoother.smooth(vec![detection([10.0, 10.0, 20.0, 20.0], 0)]);
    let smoothed = smoother.smooth(vec![detection([14.0, 14.0, 24.0, 24.0], 1)]);
    assert_eq!(smoothed[0].bbox, [14.0, 14.0, 24.0, 24.0]);
  }

  #[test]
  fn outside_radius_not_associated() {
    let mut smoother = TemporalSmoother::new(0.5, 80.0, 5);
    smoother.smooth(vec![detection([0.0, 0.0, 10.0, 10.0], 0)]);
    let smoothed = smoother.smooth(vec![detection([200.0, 200.0, 210.0, 210.0], 0)]);
    assert_eq!(smoothed[0].bbox, [200.0, 200.0, 210.0, 210.0]);
  }

  #[test]
  fn nearest_centroid_wins() {
    let mut smoother = TemporalSmoother::new(0.5, 80.0, 5);
    smoother.smooth(vec![
      detection([0.0, 0.0, 10.0, 10.0], 0),
      detection([30.0, 30.0, 40.0, 40.0], 0),
    ]);
    // 当前盒离第二个更近
    let smoothed = smoother.smooth(vec![detection([28.0, 28.0, 38.0, 38.0], 0)]);
    assert_eq!(smoothed[0].bbox, [29.0, 29.0, 39.0, 39.0]);
  }

  #[test]
  fn association_only_uses_immediately_preceding_frame() {
    let mut smoother = TemporalSmoother::new(0.5, 80.0, 5);
    smoother.smooth(vec![detection([10.0, 10.0, 20.0, 20.0], 0)]);
    // 中间一帧没有该目标
    smoother.smooth(vec![]);
    let smoothed = smoother.smooth(vec![detection([14.0, 14.0, 24.0, 24.0], 0)]);
    // 两跳之前的历史不参与关联
    assert_eq!(smoothed[0].bbox, [14.0, 14.0, 24.0, 24.0]);
  }

  #[test]
  fn history_bounded_to_capacity() {
    let mut smoother = TemporalSmoother::new(0.5, 80.0, 5);
    for i in 0..8 {
      smoother.smooth(vec![detection([i as f32, 0.0, i as f32 + 10.0, 10.0], 0)]);
    }
    assert_eq!(smoother.history_len(), 5);
  }

  #[test]
  fn reset_clears_history() {
    let mut smoother = TemporalSmoother::new(0.5, 80.0, 5);
    smoother.smooth(vec![detection([10.0, 10.0, 20.0, 20.0], 0)]);
    smoother.reset();
    assert_eq!(smoother.history_len(), 0);
    // 复位后第一帧原样通过
    let smoothed = smoother.smooth(vec![detection([14.0, 14.0, 24.0, 24.0], 0)]);
    assert_eq!(smoothed[0].bbox, [14.0, 14.0, 24.0, 24.0]);
  }
}
