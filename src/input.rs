// 该文件是 Saoshi （扫视） 项目的一部分。
// src/input.rs - 帧输入源
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, frame::Frame};

#[cfg(feature = "read_image_file")]
mod image_file;
#[cfg(feature = "read_image_file")]
pub use self::image_file::{ImageFileInput, ImageFileInputError};

mod v4l2;
pub use self::v4l2::{V4l2Input, V4l2InputError};

/// 输入源类型
pub enum InputSourceType {
  /// 图片文件
  Image,
  /// V4L2 摄像头
  V4l2,
}

/// 帧输入源
///
/// 流水线只读取帧，不发起采集；就绪判定与尺寸由源暴露。
pub trait InputSource: Iterator<Item = Result<Frame, InputError>> {
  /// 获取输入源类型
  fn source_type(&self) -> InputSourceType;

  /// 获取帧宽度
  fn width(&self) -> u32;

  /// 获取帧高度
  fn height(&self) -> u32;

  /// 获取帧率（如果适用）
  fn fps(&self) -> Option<f64>;

  /// 源是否就绪可出帧
  fn is_ready(&self) -> bool;
}

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("V4L2 输入错误: {0}")]
  V4l2InputError(#[from] V4l2InputError),
  #[error("URI 方案不匹配")]
  SchemeMismatch,
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ImageFile(ImageFileInput),
  V4l2(V4l2Input),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        return Ok(InputWrapper::ImageFile(ImageFileInput::from_url(url)?));
      }
    }
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == V4l2Input::SCHEME {
        return Ok(InputWrapper::V4l2(V4l2Input::from_url(url)?));
      }
    }
    Err(InputError::SchemeMismatch)
  }
}

impl Iterator for InputWrapper {
  type Item = Result<Frame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ImageFile(input) => input.next(),
      InputWrapper::V4l2(input) => input.next(),
    }
  }
}

impl InputSource for InputWrapper {
  fn source_type(&self) -> InputSourceType {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ImageFile(input) => input.source_type(),
      InputWrapper::V4l2(input) => input.source_type(),
    }
  }

  fn width(&self) -> u32 {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ImageFile(input) => input.width(),
      InputWrapper::V4l2(input) => input.width(),
    }
  }

  fn height(&self) -> u32 {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ImageFile(input) => input.height(),
      InputWrapper::V4l2(input) => input.height(),
    }
  }

  fn fps(&self) -> Option<f64> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ImageFile(input) => input.fps(),
      InputWrapper::V4l2(input) => input.fps(),
    }
  }

  fn is_ready(&self) -> bool {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ImageFile(input) => input.is_ready(),
      InputWrapper::V4l2(input) => input.is_ready(),
    }
  }
}
