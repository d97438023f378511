// 该文件是 Saoshi （扫视） 项目的一部分。
// src/main.rs - 项目主程序
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

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use url::Url;

use saoshi::{
  FromUrl,
  input::InputWrapper,
  model::EngineWrapper,
  output::OutputWrapper,
  pipeline::PipelineConfig,
  task::{ScanTask, Task},
};

/// Saoshi 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型来源
  /// 支持格式:
  /// - Tract ONNX: tract:/path/to/model.onnx?size=640
  /// - 桩引擎: stub:
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输入来源
  /// 支持格式:
  /// - 图片: image:/path/to/photo.jpg
  /// - V4L2: v4l2:/dev/video0?width=640&height=480
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 输出路径
  /// 支持格式:
  /// - 图片: image:/path/to/result.png
  /// - 目录: folder:/path/to/records?record&always
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IoU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.7", value_name = "THRESHOLD")]
  pub iou_threshold: f32,

  /// 时间平滑系数 (0.0 - 1.0)
  #[arg(long, default_value = "0.65", value_name = "ALPHA")]
  pub alpha: f32,

  /// 跨帧关联半径（像素）
  #[arg(long, default_value = "80", value_name = "RADIUS")]
  pub radius: f32,

  /// 两次准入的最小间隔（毫秒）
  #[arg(long, default_value = "100", value_name = "MS")]
  pub interval_ms: u64,

  /// 最大处理帧数
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型来源: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let engine = EngineWrapper::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let config = PipelineConfig::default()
    .with_confidence_threshold(args.confidence)
    .with_iou_threshold(args.iou_threshold)
    .with_smoothing_alpha(args.alpha)
    .with_association_radius(args.radius)
    .with_min_interval(Duration::from_millis(args.interval_ms));

  ScanTask::default()
    .with_config(config)
    .with_frame_number(args.frame_number)
    .run_task(input, engine, output)?;

  Ok(())
}
