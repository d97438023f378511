// 该文件是 Saoshi （扫视） 项目的一部分。
// src/pipeline/remap.rs - 画布坐标到源帧坐标的逆映射
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

use crate::pipeline::letterbox::LetterboxParams;

/// 逆信箱变换: 去掉填充偏移、除以缩放、裁剪到帧边界并取整
///
/// 与信箱正变换互为逆运算，往返误差不超过 1 像素。
pub fn remap_box(bbox: [f32; 4], params: &LetterboxParams, vw: u32, vh: u32) -> [f32; 4] {
  let max_x = vw.saturating_sub(1) as f64;
  let max_y = vh.saturating_sub(1) as f64;

  let unmap_x = |x: f32| {
    let x = (x as f64 - params.pad_x as f64) / params.scale;
    x.clamp(0.0, max_x).round() as f32
  };
  let unmap_y = |y: f32| {
    let y = (y as f64 - params.pad_y as f64) / params.scale;
    y.clamp(0.0, max_y).round() as f32
  };

  [
    unmap_x(bbox[0]),
    unmap_y(bbox[1]),
    unmap_x(bbox[2]),
    unmap_y(bbox[3]),
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn padding_and_scale_inverted() {
    // 1280x720 -> 640 画布: scale 0.5, pad_y 140
    let params = LetterboxParams::compute(1280, 720, 640);
    let mapped = remap_box([100.0, 240.0, 200.0, 340.0], &params, 1280, 720);
    assert_eq!(mapped, [200.0, 200.0, 400.0, 400.0]);
  }

  #[test]
  fn coordinates_clipped_to_frame_bounds() {
    let params = LetterboxParams {
      scale: 1.0,
      pad_x: 0,
      pad_y: 0,
      canvas_size: 640,
    };
    // x2 = 700 超出 vw=640, 裁剪到 639
    let mapped = remap_box([-20.0, 10.0, 700.0, 480.0], &params, 640, 480);
    assert_eq!(mapped, [0.0, 10.0, 639.0, 479.0]);
  }

  #[test]
  fn output_is_integer_pixels() {
    let params = LetterboxParams::compute(333, 77, 640);
    let mapped = remap_box([17.3, 260.9, 333.4, 371.2], &params, 333, 77);
    for v in mapped {
      assert_eq!(v, v.round());
    }
  }
}
