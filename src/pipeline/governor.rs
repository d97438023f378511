// 该文件是 Saoshi （扫视） 项目的一部分。
// src/pipeline/governor.rs - 帧准入控制
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

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GovernorState {
  Idle,
  Scanning,
}

/// 一次节拍被拒绝的原因；被拒绝的帧直接丢弃，绝不排队
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
  /// 未处于扫描状态
  Idle,
  /// 已有一次流水线运行在途
  InFlight,
  /// 距上次准入未满最小间隔
  Interval,
}

/// 在途运行凭据，释放时清除在途标志
///
/// 无论运行成功、失败还是提前返回，标志都会在 Drop 时复位，
/// 单次失败不会永久阻塞后续帧。
pub struct InFlightGuard {
  flag: Arc<AtomicBool>,
}

impl Drop for InFlightGuard {
  fn drop(&mut self) {
    self.flag.store(false, Ordering::Release);
  }
}

/// 帧准入控制器
///
/// 两状态机（Idle / Scanning）。扫描期间每个节拍最多准入一次
/// 流水线运行：距上次准入不小于最小间隔，且没有运行在途。
/// 准入与完成都发生在同一协作调度里，在途标志只用于阻止逻辑
/// 上的重叠。
pub struct FrameGovernor {
  state: GovernorState,
  min_interval: Duration,
  last_admitted: Option<Instant>,
  in_flight: Arc<AtomicBool>,
  admitted: u64,
  dropped_in_flight: u64,
  dropped_interval: u64,
}

impl FrameGovernor {
  pub fn new(min_interval: Duration) -> Self {
    Self {
      state: GovernorState::Idle,
      min_interval,
      last_admitted: None,
      in_flight: Arc::new(AtomicBool::new(false)),
      admitted: 0,
      dropped_in_flight: 0,
      dropped_interval: 0,
    }
  }

  pub fn state(&self) -> GovernorState {
    self.state
  }

  /// Idle → Scanning，并重置准入时间基准
  pub fn start(&mut self) {
    self.state = GovernorState::Scanning;
    self.last_admitted = None;
  }

  /// Scanning → Idle
  ///
  /// 不要求中止在途运行；其凭据释放时照常清除标志。
  pub fn stop(&mut self) {
    self.state = GovernorState::Idle;
  }

  /// 一次准入检查
  ///
  /// 通过时标记在途并返回凭据；拒绝时返回原因，不为该节拍安排
  /// 任何后续运行。
  pub fn tick(&mut self, now: Instant) -> Result<InFlightGuard, DropReason> {
    if self.state != GovernorState::Scanning {
      return Err(DropReason::Idle);
    }

    if self.in_flight.load(Ordering::Acquire) {
      self.dropped_in_flight += 1;
      return Err(DropReason::InFlight);
    }

    if let Some(last) = self.last_admitted
      && now.duration_since(last) < self.min_interval
    {
      self.dropped_interval += 1;
      return Err(DropReason::Interval);
    }

    self.in_flight.store(true, Ordering::Release);
    self.last_admitted = Some(now);
    self.admitted += 1;

    Ok(InFlightGuard {
      flag: Arc::clone(&self.in_flight),
    })
  }

  pub fn admitted(&self) -> u64 {
    self.admitted
  }

  pub fn dropped_in_flight(&self) -> u64 {
    self.dropped_in_flight
  }

  pub fn dropped_interval(&self) -> u64 {
    self.dropped_interval
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn governor(interval_ms: u64) -> FrameGovernor {
    let mut governor = FrameGovernor::new(Duration::from_millis(interval_ms));
    governor.start();
    governor
  }

  #[test]
  fn idle_governor_admits_nothing() {
    let mut governor = FrameGovernor::new(Duration::from_millis(100));
    assert_eq!(governor.tick(Instant::now()).err(), Some(DropReason::Idle));
  }

  #[test]
  fn at_most_one_run_in_flight() {
    let mut governor = governor(0);
    let now = Instant::now();

    let guard = governor.tick(now).ok().unwrap();
    // 凭据未释放期间的所有节拍都被拒绝
    for i in 1..10u64 {
      let tick = governor.tick(now + Duration::from_millis(i * 50));
      assert_eq!(tick.err(), Some(DropReason::InFlight));
    }
    assert_eq!(governor.admitted(), 1);
    assert_eq!(governor.dropped_in_flight(), 9);

    drop(guard);
    assert!(governor.tick(now + Duration::from_millis(500)).is_ok());
  }

  #[test]
  fn guard_releases_flag_on_failure_path() {
    let mut governor = governor(0);
    let now = Instant::now();

    {
      let _guard = governor.tick(now).ok().unwrap();
      // 模拟运行失败: 提前退出作用域
    }
    assert!(governor.tick(now + Duration::from_millis(1)).is_ok());
  }

  #[test]
  fn interval_gates_admission() {
    let mut governor = governor(100);
    let now = Instant::now();

    drop(governor.tick(now).ok().unwrap());
    let denied = governor.tick(now + Duration::from_millis(50));
    assert_eq!(denied.err(), Some(DropReason::Interval));

    assert!(governor.tick(now + Duration::from_millis(100)).is_ok());
  }

  #[test]
  fn denied_ticks_are_dropped_not_queued() {
    let mut governor = governor(100);
    let now = Instant::now();

    drop(governor.tick(now).ok().unwrap());
    for i in 1..5u64 {
      let _ = governor.tick(now + Duration::from_millis(i * 10));
    }
    // 被拒绝的节拍没有积压: 只有那次准入被计数
    assert_eq!(governor.admitted(), 1);
    assert_eq!(governor.dropped_interval(), 4);

    // 间隔满足后也只准入一次
    drop(governor.tick(now + Duration::from_millis(200)).ok().unwrap());
    assert_eq!(governor.admitted(), 2);
  }

  #[test]
  fn stop_returns_to_idle() {
    let mut governor = governor(0);
    governor.stop();
    assert_eq!(governor.state(), GovernorState::Idle);
    assert_eq!(governor.tick(Instant::now()).err(), Some(DropReason::Idle));
  }
}
