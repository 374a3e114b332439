// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/stats.rs - 检测统计与帧率
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

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::detect::Detection;

pub const HISTORY_LIMIT: usize = 10;
const HISTORY_ITEMS: usize = 5;
const FPS_WINDOW: Duration = Duration::from_secs(1);

pub fn clock_text(time: &DateTime<Local>) -> String {
  time.format("%H:%M:%S").to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
  pub timestamp: String,
  pub count: usize,
  pub items: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
  pub total_detections: u64,
  pub detection_history: VecDeque<HistoryEntry>,
  pub fps: f32,
}

impl Stats {
  /// 空结果不计入历史
  pub fn record(&mut self, detections: &[Detection], now: &DateTime<Local>) {
    if detections.is_empty() {
      return;
    }
    self.total_detections += detections.len() as u64;
    self.detection_history.push_back(HistoryEntry {
      timestamp: clock_text(now),
      count: detections.len(),
      items: detections
        .iter()
        .take(HISTORY_ITEMS)
        .map(|d| d.label.clone())
        .collect(),
    });
    while self.detection_history.len() > HISTORY_LIMIT {
      self.detection_history.pop_front();
    }
  }
}

/// 以一秒为窗口统计帧率
#[derive(Debug, Clone)]
pub struct FpsCounter {
  window_start: Option<Instant>,
  frames: u32,
  fps: f32,
}

impl Default for FpsCounter {
  fn default() -> Self {
    Self::new()
  }
}

impl FpsCounter {
  pub fn new() -> Self {
    Self {
      window_start: None,
      frames: 0,
      fps: 0.0,
    }
  }

  pub fn fps(&self) -> f32 {
    self.fps
  }

  pub fn tick(&mut self, now: Instant) -> f32 {
    let start = *self.window_start.get_or_insert(now);
    self.frames += 1;
    let elapsed = now.saturating_duration_since(start);
    if elapsed >= FPS_WINDOW {
      self.fps = self.frames as f32 / elapsed.as_secs_f32();
      self.frames = 0;
      self.window_start = Some(now);
    }
    self.fps
  }
}
