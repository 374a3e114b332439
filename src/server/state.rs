// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/server/state.rs - 会话状态与共享上下文
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

use std::{
  collections::BTreeMap,
  sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
  },
};

use axum::body::Bytes;
use chrono::{DateTime, Local};
use image::RgbImage;
use serde::Serialize;
use tokio::sync::watch;

use crate::{
  category::Category,
  detect::{Detection, Filter, category_counts},
  output::ScreenshotWriter,
  stats::{Stats, clock_text},
};

/// 网页端的检测会话，只存在于内存中
#[derive(Debug, Default)]
pub struct Session {
  armed: bool,
  continuous: bool,
  filter: Filter,
  last_detections: Vec<Detection>,
  stats: Stats,
}

#[derive(Debug, Serialize)]
pub struct DetectionsSnapshot {
  pub detections: Vec<Detection>,
  pub category_counts: BTreeMap<Category, usize>,
  pub stats: Stats,
  pub timestamp: String,
}

impl Session {
  pub fn arm(&mut self) {
    self.armed = true;
  }

  /// 检测开关跟随连续模式
  pub fn toggle_continuous(&mut self) -> bool {
    self.continuous = !self.continuous;
    self.armed = self.continuous;
    self.continuous
  }

  pub fn is_continuous(&self) -> bool {
    self.continuous
  }

  pub fn set_filter(&mut self, filter: Filter) -> Filter {
    self.filter = filter;
    filter
  }

  pub fn filter(&self) -> Filter {
    self.filter
  }

  pub fn wants_detection(&self) -> bool {
    self.armed
  }

  /// 以当前过滤器整体替换检测结果，单次检测后解除触发
  pub fn record_pass(&mut self, detections: Vec<Detection>, now: &DateTime<Local>) {
    let detections = self.filter.apply(detections);
    self.stats.record(&detections, now);
    self.last_detections = detections;
    if !self.continuous {
      self.armed = false;
    }
  }

  pub fn set_fps(&mut self, fps: f32) {
    self.stats.fps = fps;
  }

  pub fn last_detections(&self) -> &[Detection] {
    &self.last_detections
  }

  pub fn stats(&self) -> &Stats {
    &self.stats
  }

  pub fn snapshot(&self, now: &DateTime<Local>) -> DetectionsSnapshot {
    DetectionsSnapshot {
      detections: self.last_detections.clone(),
      category_counts: category_counts(&self.last_detections),
      stats: self.stats.clone(),
      timestamp: clock_text(now),
    }
  }
}

pub type SharedSession = Arc<Mutex<Session>>;

/// 会话锁中毒时沿用其中的数据
pub fn lock_session(session: &Mutex<Session>) -> MutexGuard<'_, Session> {
  session.lock().unwrap_or_else(PoisonError::into_inner)
}

type LatestFrame = Arc<Mutex<Option<Arc<RgbImage>>>>;

/// 处理器共享的应用状态
#[derive(Clone)]
pub struct AppState {
  pub session: SharedSession,
  pub frames: watch::Receiver<Option<Bytes>>,
  pub latest_frame: LatestFrame,
  pub screenshots: Arc<ScreenshotWriter>,
  stop: Arc<AtomicBool>,
}

/// 采集线程持有的发布端
pub struct FrameSink {
  session: SharedSession,
  latest_frame: LatestFrame,
  frames: watch::Sender<Option<Bytes>>,
  stop: Arc<AtomicBool>,
}

impl AppState {
  pub fn new(screenshots: ScreenshotWriter) -> (Self, FrameSink) {
    let session = SharedSession::default();
    let latest_frame = LatestFrame::default();
    let stop = Arc::new(AtomicBool::new(false));
    let (tx, rx) = watch::channel(None);
    let state = AppState {
      session: session.clone(),
      frames: rx,
      latest_frame: latest_frame.clone(),
      screenshots: Arc::new(screenshots),
      stop: stop.clone(),
    };
    let sink = FrameSink {
      session,
      latest_frame,
      frames: tx,
      stop,
    };
    (state, sink)
  }

  pub fn session(&self) -> MutexGuard<'_, Session> {
    lock_session(&self.session)
  }

  /// 通知采集线程退出，发布端释放后所有视频流随之结束
  pub fn request_stop(&self) {
    self.stop.store(true, Ordering::Relaxed);
  }

  pub fn latest_frame(&self) -> Option<Arc<RgbImage>> {
    self
      .latest_frame
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }
}

impl FrameSink {
  pub fn session(&self) -> MutexGuard<'_, Session> {
    lock_session(&self.session)
  }

  /// 服务请求停止，或所有接收端都已释放
  pub fn is_closed(&self) -> bool {
    self.stop.load(Ordering::Relaxed) || self.frames.is_closed()
  }

  pub fn publish(&self, raw: RgbImage, jpeg: Vec<u8>) {
    *self
      .latest_frame
      .lock()
      .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(raw));
    self.frames.send_replace(Some(Bytes::from(jpeg)));
  }
}
