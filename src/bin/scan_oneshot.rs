// 该文件是 Saoshi （扫视） 项目的一部分。
// src/bin/scan_oneshot.rs - 单张图片推理
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
  task::{OneShotTask, Task},
};

/// Saoshi 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型来源
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入图片
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IoU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.7", value_name = "THRESHOLD")]
  pub iou_threshold: f32,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型来源: {}", args.model);
  info!("输入图片: {}", args.input);
  info!("输出路径: {}", args.output);

  let input = InputWrapper::from_url(&args.input)?;
  let engine = EngineWrapper::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let config = PipelineConfig::default()
    .with_confidence_threshold(args.confidence)
    .with_iou_threshold(args.iou_threshold);

  OneShotTask::default()
    .with_config(config)
    .run_task(input, engine, output)?;

  Ok(())
}
