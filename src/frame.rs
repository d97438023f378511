// 该文件是 Saoshi （扫视） 项目的一部分。
// src/frame.rs - 帧定义
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::RgbImage;

const RGB_CHANNELS: usize = 3;

/// 来自输入源的一帧图像
pub struct Frame {
  /// RGB 图像数据
  pub image: RgbImage,
  /// 帧索引
  pub index: u64,
  /// 时间戳（毫秒）
  pub timestamp_ms: u64,
}

impl Frame {
  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }
}

/// 信箱化后的方形画布帧
///
/// 数据为平面（planar）排列的归一化 RGB 浮点值：先所有 R 值，再所有 G 值，
/// 最后所有 B 值，每个通道按行主序展开，每个值除以 255 归一化到 [0, 1]。
#[derive(Debug, Clone)]
pub struct CanvasFrame {
  size: u32,
  data: Box<[f32]>,
}

impl CanvasFrame {
  /// 创建一个以常量值填满的画布
  pub fn filled(size: u32, value: f32) -> Self {
    let len = RGB_CHANNELS * (size as usize) * (size as usize);
    Self {
      size,
      data: vec![value; len].into_boxed_slice(),
    }
  }

  pub fn size(&self) -> u32 {
    self.size
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  /// 平面排列的张量数据，长度为 3 * size * size
  pub fn as_planar(&self) -> &[f32] {
    &self.data
  }

  pub fn as_planar_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}

impl From<(u32, Vec<f32>)> for CanvasFrame {
  fn from((size, data): (u32, Vec<f32>)) -> Self {
    if data.len() != RGB_CHANNELS * (size as usize) * (size as usize) {
      panic!(
        "数据长度不匹配: 期望长度 {}, 实际长度 {}",
        RGB_CHANNELS * (size as usize) * (size as usize),
        data.len()
      );
    }

    Self {
      size,
      data: data.into_boxed_slice(),
    }
  }
}
