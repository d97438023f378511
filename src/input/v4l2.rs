// 该文件是 Saoshi （扫视） 项目的一部分。
// src/input/v4l2.rs - V4L2 摄像头输入源
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

use std::pin::Pin;
use std::time::Instant;

use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  input::{InputError, InputSource, InputSourceType},
};

const V4L2_SCHEME: &str = "v4l2";
const DEFAULT_CAPTURE_WIDTH: u32 = 640;
const DEFAULT_CAPTURE_HEIGHT: u32 = 480;

#[derive(Error, Debug)]
pub enum V4l2InputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("无法打开设备 {0}: {1}")]
  DeviceOpenError(String, std::io::Error),
  #[error("无法设置视频格式: {0}")]
  FormatError(std::io::Error),
  #[error("无法创建捕获流: {0}")]
  StreamError(std::io::Error),
  #[error("无法捕获帧: {0}")]
  CaptureError(std::io::Error),
  #[error("无法创建 RGB 图像")]
  FrameConversionError,
}

/// V4L2 摄像头输入源
///
/// 由于 v4l 库的 Stream 需要引用 Device，我们使用 Pin<Box> 来保证
/// Device 的内存地址稳定，从而可以安全地创建引用它的 Stream。
pub struct V4l2Input {
  /// V4L2 设备（使用 Pin<Box> 固定内存位置）
  device: Pin<Box<Device>>,
  /// 捕获流（生命周期与 device 关联）
  stream: Option<Stream<'static>>,
  /// 帧索引
  frame_index: u64,
  /// 视频宽度
  width: u32,
  /// 视频高度
  height: u32,
  /// 开始时间
  start_time: Instant,
}

impl FromUrlWithScheme for V4l2Input {
  const SCHEME: &'static str = V4L2_SCHEME;
}

impl FromUrl for V4l2Input {
  type Error = V4l2InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != V4L2_SCHEME {
      return Err(V4l2InputError::SchemeMismatch);
    }

    let mut width = DEFAULT_CAPTURE_WIDTH;
    let mut height = DEFAULT_CAPTURE_HEIGHT;
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "width" => width = v.parse().unwrap_or(DEFAULT_CAPTURE_WIDTH),
        "height" => height = v.parse().unwrap_or(DEFAULT_CAPTURE_HEIGHT),
        _ => {}
      }
    }

    Self::new(url.path(), width, height)
  }
}

impl V4l2Input {
  /// 打开摄像头并协商 YUYV 捕获格式
  pub fn new(device_path: &str, width: u32, height: u32) -> Result<Self, V4l2InputError> {
    let device = Box::pin(
      Device::with_path(device_path)
        .map_err(|e| V4l2InputError::DeviceOpenError(device_path.to_string(), e))?,
    );

    // 设置视频格式
    let mut format = device.format().map_err(V4l2InputError::FormatError)?;
    format.width = width;
    format.height = height;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device
      .set_format(&format)
      .map_err(V4l2InputError::FormatError)?;

    info!(
      "摄像头 {} 已打开: {}x{}",
      device_path, format.width, format.height
    );

    let mut source = Self {
      device,
      stream: None,
      frame_index: 0,
      width: format.width,
      height: format.height,
      start_time: Instant::now(),
    };

    // 创建捕获流
    // SAFETY: device 被 Pin<Box> 固定，不会移动，所以引用始终有效
    // Stream 的生命周期通过 source 的 Drop 来管理
    let device_ref: &Device = &source.device;
    let stream = unsafe {
      // 将设备引用的生命周期延长到 'static
      // 这是安全的，因为:
      // 1. device 被 Pin<Box> 固定在堆上，不会移动
      // 2. stream 存储在同一个结构体中，会在 device 之前被 drop
      // 3. Drop 顺序：stream (Option::take) -> device
      let device_static: &'static Device = std::mem::transmute(device_ref);
      Stream::with_buffers(device_static, Type::VideoCapture, 4)
        .map_err(V4l2InputError::StreamError)?
    };

    source.stream = Some(stream);
    Ok(source)
  }

  /// 将 YUYV 格式转换为 RGB
  fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);

    for chunk in yuyv.chunks(4) {
      if chunk.len() < 4 {
        break;
      }

      let y0 = chunk[0] as f32;
      let u = chunk[1] as f32 - 128.0;
      let y1 = chunk[2] as f32;
      let v = chunk[3] as f32 - 128.0;

      // 第一个像素
      let r = (y0 + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y0 - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y0 + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);

      // 第二个像素
      let r = (y1 + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y1 - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y1 + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);
    }

    rgb
  }
}

impl Drop for V4l2Input {
  fn drop(&mut self) {
    // 确保 stream 在 device 之前被 drop
    self.stream.take();
  }
}

impl Iterator for V4l2Input {
  type Item = Result<Frame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let stream = self.stream.as_mut()?;

    match stream.next() {
      Ok((buffer, _meta)) => {
        let rgb_data = Self::yuyv_to_rgb(buffer, self.width, self.height);

        let image = match RgbImage::from_raw(self.width, self.height, rgb_data) {
          Some(image) => image,
          None => {
            return Some(Err(V4l2InputError::FrameConversionError.into()));
          }
        };

        let timestamp_ms = self.start_time.elapsed().as_millis() as u64;

        let frame = Frame {
          image,
          index: self.frame_index,
          timestamp_ms,
        };

        self.frame_index += 1;
        Some(Ok(frame))
      }
      Err(e) => Some(Err(V4l2InputError::CaptureError(e).into())),
    }
  }
}

impl InputSource for V4l2Input {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::V4l2
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }

  fn fps(&self) -> Option<f64> {
    // V4L2 默认帧率
    Some(30.0)
  }

  fn is_ready(&self) -> bool {
    self.stream.is_some()
  }
}
