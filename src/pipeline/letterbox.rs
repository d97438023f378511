// 该文件是 Saoshi （扫视） 项目的一部分。
// src/pipeline/letterbox.rs - 信箱化预处理
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
use image::imageops::FilterType;

use crate::frame::CanvasFrame;

pub const DEFAULT_CANVAS_SIZE: u32 = 640;

/// 填充背景灰度值
const PAD_FILL: u8 = 114;

/// 一帧的信箱变换参数
///
/// 不变量: scale = min(canvas_size/vw, canvas_size/vh)，
/// pad_x/pad_y 使缩放后的图像在画布中居中。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxParams {
  pub scale: f64,
  pub pad_x: i32,
  pub pad_y: i32,
  pub canvas_size: i32,
}

impl LetterboxParams {
  pub fn compute(vw: u32, vh: u32, canvas_size: u32) -> Self {
    let size = canvas_size as f64;
    let scale = (size / vw as f64).min(size / vh as f64);
    let nw = (vw as f64 * scale).round() as i32;
    let nh = (vh as f64 * scale).round() as i32;
    Self {
      scale,
      pad_x: (canvas_size as i32 - nw) / 2,
      pad_y: (canvas_size as i32 - nh) / 2,
      canvas_size: canvas_size as i32,
    }
  }

  /// 缩放后的图像尺寸
  pub fn scaled_size(&self, vw: u32, vh: u32) -> (u32, u32) {
    (
      (vw as f64 * self.scale).round() as u32,
      (vh as f64 * self.scale).round() as u32,
    )
  }
}

/// 信箱化预处理器，缓存上一帧的变换参数
pub struct Letterboxer {
  canvas_size: u32,
  cached: Option<(u32, u32, LetterboxParams)>,
}

impl Letterboxer {
  pub fn new(canvas_size: u32) -> Self {
    Self {
      canvas_size,
      cached: None,
    }
  }

  pub fn canvas_size(&self) -> u32 {
    self.canvas_size
  }

  pub fn reset(&mut self) {
    self.cached = None;
  }

  /// 帧尺寸未变化时复用缓存参数，否则重新计算
  pub fn params_for(&mut self, vw: u32, vh: u32) -> LetterboxParams {
    if let Some((w, h, params)) = self.cached
      && w == vw
      && h == vh
    {
      return params;
    }
    let params = LetterboxParams::compute(vw, vh, self.canvas_size);
    self.cached = Some((vw, vh, params));
    params
  }

  /// 保纵横比缩放并居中填充到方形画布
  ///
  /// 输出为平面 RGB 浮点数据，每个值除以 255，背景为 114 灰。
  pub fn letterbox(&mut self, image: &RgbImage) -> (CanvasFrame, LetterboxParams) {
    let (vw, vh) = image.dimensions();
    let params = self.params_for(vw, vh);
    let (nw, nh) = params.scaled_size(vw, vh);

    let resized = image::imageops::resize(image, nw.max(1), nh.max(1), FilterType::Triangle);

    let size = self.canvas_size as usize;
    let plane = size * size;
    let mut canvas = CanvasFrame::filled(self.canvas_size, PAD_FILL as f32 / 255.0);
    let data = canvas.as_planar_mut();

    for (x, y, pixel) in resized.enumerate_pixels() {
      let cx = x as i64 + params.pad_x as i64;
      let cy = y as i64 + params.pad_y as i64;
      if cx < 0 || cy < 0 || cx >= size as i64 || cy >= size as i64 {
        continue;
      }
      let index = (cy as usize) * size + cx as usize;
      data[index] = pixel[0] as f32 / 255.0;
      data[plane + index] = pixel[1] as f32 / 255.0;
      data[2 * plane + index] = pixel[2] as f32 / 255.0;
    }

    (canvas, params)
  }
}
