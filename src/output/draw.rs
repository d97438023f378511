// 该文件是 Saoshi （扫视） 项目的一部分。
// src/output/draw.rs - 检测结果叠加绘制
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

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use std::path::Path;

use crate::model::WithLabel;
use crate::pipeline::Detection;

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // 每字符平均宽度（粗略估计）
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const LABEL_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const BORDER_THICKNESS: i32 = 2;

pub struct Draw {
  font_size: f32,
  label_text_height: i32,
  label_char_width: f32,
  label_text_vertical_padding: i32,
  label_color: [u8; 3],
  font: Option<FontVec>,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      font_size: LABEL_FONT_SIZE,
      label_text_height: LABEL_TEXT_HEIGHT,
      label_char_width: LABEL_CHAR_WIDTH,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      label_color: LABEL_COLOR,
      font: None,
    }
  }
}

impl Draw {
  /// 从路径加载标签字体；没有字体时只画框不写标签
  pub fn with_font_path<P: AsRef<Path>>(mut self, path: P) -> Result<Self, DrawError> {
    let data = std::fs::read(path.as_ref()).map_err(DrawError::FontIoError)?;
    let font = FontVec::try_from_vec(data).map_err(|_| DrawError::FontInvalid)?;
    self.font = Some(font);
    Ok(self)
  }

  /// 把检测结果画到目标图像上
  ///
  /// bbox 为源帧像素坐标；目标图像尺寸不同时按 显示/源 比例缩放。
  pub fn draw_detections_on_image<L: WithLabel>(
    &self,
    image: &mut RgbImage,
    source_size: (u32, u32),
    detections: &[Detection],
  ) {
    let (sw, sh) = source_size;
    if sw == 0 || sh == 0 {
      return;
    }
    let sx = image.width() as f32 / sw as f32;
    let sy = image.height() as f32 / sh as f32;

    for detection in detections {
      self.draw_bbox_with_label::<L>(image, detection, sx, sy);
    }
  }

  fn draw_bbox_with_label<L: WithLabel>(
    &self,
    image: &mut RgbImage,
    detection: &Detection,
    sx: f32,
    sy: f32,
  ) {
    let (w, h) = (image.width() as i32, image.height() as i32);

    let mut x_min = (detection.bbox[0] * sx).floor() as i32;
    let mut y_min = (detection.bbox[1] * sy).floor() as i32;
    let mut x_max = (detection.bbox[2] * sx).ceil() as i32;
    let mut y_max = (detection.bbox[3] * sy).ceil() as i32;

    // Clamp to image bounds
    x_min = x_min.clamp(0, w - 1);
    y_min = y_min.clamp(0, h - 1);
    x_max = x_max.clamp(0, w - 1);
    y_max = y_max.clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    // 绘制边框（加粗为2像素）
    for thickness in 0..BORDER_THICKNESS {
      let x_min_t = (x_min + thickness).min(w - 1);
      let y_min_t = (y_min + thickness).min(h - 1);
      let x_max_t = (x_max - thickness).max(0);
      let y_max_t = (y_max - thickness).max(0);
      if x_min_t >= x_max_t || y_min_t >= y_max_t {
        break;
      }
      let rect = Rect::at(x_min_t, y_min_t)
        .of_size((x_max_t - x_min_t) as u32, (y_max_t - y_min_t) as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.label_color));
    }

    let Some(font) = &self.font else {
      return;
    };

    // 创建标签文本
    let label = format!(
      "{} {:.2}",
      L::from_label_id(detection.class_id as u32).to_label_str(),
      detection.score
    );

    // 文本参数
    let scale = PxScale::from(self.font_size);
    let text_color = Rgb([255u8, 255u8, 255u8]); // 白色文本

    // 估算文本大小（粗略估计）
    let text_width = (label.len() as f32 * self.label_char_width) as i32;
    let text_height = self.label_text_height;

    // 确定标签背景位置（在边框上方）
    let label_x = x_min.max(0);
    let label_y = (y_min - text_height).max(0);

    // 确保标签不超出图像边界
    let max_width = (w - label_x).max(0);
    let label_width = text_width.min(max_width) as u32;
    let label_height = text_height as u32;

    // 仅在标签有空间时绘制
    if label_width > 0 && label_height > 0 {
      // 绘制标签背景
      let rect = Rect::at(label_x, label_y).of_size(label_width, label_height);
      draw_filled_rect_mut(image, rect, Rgb(self.label_color));

      // 绘制文本
      draw_text_mut(
        image,
        text_color,
        label_x,
        label_y + self.label_text_vertical_padding,
        scale,
        font,
        &label,
      );
    }
  }
}

#[derive(thiserror::Error, Debug)]
pub enum DrawError {
  #[error("字体读取错误: {0}")]
  FontIoError(std::io::Error),
  #[error("字体数据无效")]
  FontInvalid,
}
