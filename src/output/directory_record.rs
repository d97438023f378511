// 该文件是 Saoshi （扫视） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use chrono::{Datelike, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  model::{CocoLabel, WithLabel},
  output::{
    Render,
    draw::{Draw, DrawError},
  },
  pipeline::Detection,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体错误: {0}")]
  FontError(#[from] DrawError),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

enum RecordMode {
  /// 只保存叠加后的图像
  Draw,
  /// 保存原始图像并附带 JSON 检测记录
  Json,
}

pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: Draw,
  mode: RecordMode,
  frame_counters: Arc<Mutex<u16>>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let mut draw = Draw::default();
    let mut mode = RecordMode::Draw;
    let mut always = false;
    for (k, v) in uri.query_pairs() {
      match k.as_ref() {
        "record" => mode = RecordMode::Json,
        "always" => always = true,
        "font" => draw = draw.with_font_path(v.as_ref())?,
        _ => {}
      }
    }

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      draw,
      mode,
      frame_counters: Arc::new(Mutex::new(0)),
      always,
    })
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    let mut counter = self.frame_counters.lock().unwrap();
    let id = counter.wrapping_add(1);
    *counter = id;
    id
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    if !directory.exists() {
      std::fs::create_dir_all(&directory)?;
    }

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }

  fn record_json(
    &self,
    path: &PathBuf,
    frame: &Frame,
    detections: &[Detection],
  ) -> Result<(), DirectoryRecordOutputError> {
    let records: Vec<serde_json::Value> = detections
      .iter()
      .map(|detection| {
        serde_json::json!({
          "bbox": detection.bbox,
          "score": detection.score,
          "class_id": detection.class_id,
          "label": CocoLabel::from_label_id(detection.class_id as u32).to_label_str(),
        })
      })
      .collect();

    let record = serde_json::json!({
      "frame": frame.index,
      "timestamp_ms": frame.timestamp_ms,
      "detections": records,
    });

    std::fs::write(
      path.with_extension("json"),
      serde_json::to_string_pretty(&record)?,
    )?;
    Ok(())
  }
}

impl Render for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &Frame, detections: &[Detection]) -> Result<(), Self::Error> {
    if detections.is_empty() && !self.always {
      return Ok(());
    }

    let path = self.frame_path()?;
    match self.mode {
      RecordMode::Draw => {
        let mut image = frame.image.clone();
        let source_size = (frame.width(), frame.height());
        self
          .draw
          .draw_detections_on_image::<CocoLabel>(&mut image, source_size, detections);
        image.save(&path)?;
      }
      RecordMode::Json => {
        frame.image.save(&path)?;
        self.record_json(&path, frame, detections)?;
      }
    }

    Ok(())
  }
}
