// 该文件是 Saoshi （扫视） 项目的一部分。
// src/task.rs - 任务循环
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

use std::{thread, time::Duration, time::Instant};
use tracing::{debug, info, warn};

use crate::{
  input::InputSource,
  model::Engine,
  output::Render,
  pipeline::{FrameGovernor, FramePipeline, PipelineConfig},
};

pub trait Task<I, E, O>: Sized {
  type Error;
  fn run_task(self, input: I, engine: E, output: O) -> Result<(), Self::Error>;
}

/// 单帧任务: 取一帧、跑一遍流水线、渲染输出
#[derive(Default)]
pub struct OneShotTask {
  config: PipelineConfig,
}

impl OneShotTask {
  pub fn with_config(mut self, config: PipelineConfig) -> Self {
    self.config = config;
    self
  }
}

impl<
  I: InputSource,
  E: Engine,
  O: Render<Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
> Task<I, E, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, engine: E, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))??;
    info!("输入帧获取成功，开始推理...");

    let mut pipeline = FramePipeline::new(self.config);
    let now = Instant::now();
    let detections = pipeline.process(&engine, &frame.image)?;
    let elapsed = now.elapsed();
    info!("推理完成，检测到 {} 个目标，耗时: {:.2?}", detections.len(), elapsed);
    output.render_result(&frame, &detections)?;
    info!("渲染完成");

    Ok(())
  }
}

/// 连续扫描任务
///
/// 每个到达的源帧是一次准入节拍；被准入的帧经过完整流水线并渲染，
/// 被拒绝的帧直接丢弃。单帧的推理或解码失败只记录，不中断扫描。
#[derive(Default)]
pub struct ScanTask {
  config: PipelineConfig,
  frame_number: Option<usize>,
}

impl ScanTask {
  pub fn with_config(mut self, config: PipelineConfig) -> Self {
    self.config = config;
    self
  }

  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl<
  I: InputSource,
  E: Engine,
  O: Render<Error = RE>,
  RE: std::error::Error + Sync + Send + 'static,
> Task<I, E, O> for ScanTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, engine: E, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(Duration::from_secs(30));
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })
    .expect("Error setting Ctrl-C handler");

    if !input.is_ready() {
      warn!("输入源尚未就绪");
    }

    let mut governor = FrameGovernor::new(self.config.min_interval);
    let mut pipeline = FramePipeline::new(self.config);
    pipeline.reset();
    governor.start();

    let mut frame_index = 0;
    for frame_result in input {
      let frame = match frame_result {
        Ok(frame) => frame,
        Err(e) => {
          warn!("读取帧失败: {}", e);
          continue;
        }
      };
      frame_index = (frame_index + 1) % usize::MAX;

      match governor.tick(Instant::now()) {
        Ok(_guard) => {
          let now = Instant::now();
          match pipeline.process(&engine, &frame.image) {
            Ok(detections) => {
              output.render_result(&frame, &detections)?;
              info!(
                "第 {} 帧: {} 个目标, 耗时 {:.2?}",
                frame.index,
                detections.len(),
                now.elapsed()
              );
            }
            // 单帧失败: 记录后继续扫描
            Err(e) => warn!("第 {} 帧处理失败: {}", frame.index, e),
          }
        }
        Err(reason) => debug!("丢弃第 {} 帧: {:?}", frame.index, reason),
      }

      if self.frame_number.map(|n| frame_index >= n).unwrap_or(false) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    governor.stop();
    pipeline.reset();

    info!(
      "任务完成: 准入 {} 帧, 在途丢弃 {} 帧, 间隔丢弃 {} 帧, 推理失败 {} 次, 解码失败 {} 次",
      governor.admitted(),
      governor.dropped_in_flight(),
      governor.dropped_interval(),
      pipeline.inference_failures(),
      pipeline.decode_failures()
    );

    Ok(())
  }
}
