// 该文件是 Saoshi （扫视） 项目的一部分。
// src/bin/scan_camera.rs - 摄像头连续扫描
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
  input::V4l2Input,
  model::EngineWrapper,
  output::OutputWrapper,
  pipeline::PipelineConfig,
  task::{ScanTask, Task},
};

/// Saoshi 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// V4L2 设备路径
  #[arg(long, default_value = "/dev/video0", value_name = "DEVICE")]
  pub device: String,

  /// 采集宽度
  #[arg(long, default_value = "640", value_name = "WIDTH")]
  pub width: u32,

  /// 采集高度
  #[arg(long, default_value = "480", value_name = "HEIGHT")]
  pub height: u32,

  /// 模型来源
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

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

  info!("摄像头设备: {}", args.device);
  info!("模型来源: {}", args.model);
  info!("输出路径: {}", args.output);

  let input = V4l2Input::new(&args.device, args.width, args.height)?;
  let engine = EngineWrapper::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;

  let config =
    PipelineConfig::default().with_min_interval(Duration::from_millis(args.interval_ms));

  ScanTask::default()
    .with_config(config)
    .with_frame_number(args.frame_number)
    .run_task(input, engine, output)?;

  Ok(())
}
