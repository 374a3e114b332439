// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/server/worker.rs - 采集线程
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
  fmt,
  sync::mpsc,
  thread::{self, JoinHandle},
  time::Instant,
};

use anyhow::Context;
use tracing::{debug, error, info, warn};

use crate::{
  detect::{DEFAULT_CONFIDENCE, Detector},
  frame::Frame,
  input::CaptureSource,
  model::{DetectResult, Model},
  output::{
    draw::{Annotation, Draw},
    mjpeg::{DEFAULT_QUALITY, encode_jpeg},
  },
  server::state::FrameSink,
  stats::FpsCounter,
};

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
  pub confidence: f32,
  pub jpeg_quality: u8,
}

impl Default for WorkerSettings {
  fn default() -> Self {
    Self {
      confidence: DEFAULT_CONFIDENCE,
      jpeg_quality: DEFAULT_QUALITY,
    }
  }
}

/// 独占摄像头与模型：读取 → 检测 → 绘制 → 编码 → 发布
pub struct CaptureWorker<I, M> {
  input: I,
  detector: Detector<M>,
  draw: Draw<'static>,
  sink: FrameSink,
  jpeg_quality: u8,
}

impl<I, M> CaptureWorker<I, M>
where
  I: CaptureSource,
  I::Error: fmt::Display,
  M: Model<Input = Frame, Output = DetectResult>,
  M::Error: fmt::Display,
{
  pub fn new(
    input: I,
    model: M,
    draw: Draw<'static>,
    sink: FrameSink,
    settings: WorkerSettings,
  ) -> Self {
    Self {
      input,
      detector: Detector::new(model).with_confidence(settings.confidence),
      draw,
      sink,
      jpeg_quality: settings.jpeg_quality,
    }
  }

  /// 采集失败或服务停止时返回，发布端随之释放，所有视频流结束
  pub fn run(mut self) {
    info!("采集线程启动");
    let mut fps = FpsCounter::new();

    while !self.sink.is_closed() {
      let frame = match self.input.read() {
        Ok(frame) => frame,
        Err(e) => {
          error!("采集失败: {}, 停止推流", e);
          break;
        }
      };

      let current_fps = fps.tick(Instant::now());
      let wants_detection = {
        let mut session = self.sink.session();
        session.set_fps(current_fps);
        session.wants_detection()
      };

      if wants_detection {
        let detections = self.detector.detect_or_empty(&frame);
        debug!("帧 {}: 检测到 {} 个物品", frame.index, detections.len());
        self
          .sink
          .session()
          .record_pass(detections, &frame.captured_at);
      }

      let detections = self.sink.session().last_detections().to_vec();
      let annotated = self
        .draw
        .annotate(&frame.image, &Annotation::boxes(&detections));
      match encode_jpeg(&annotated, self.jpeg_quality) {
        Ok(jpeg) => self.sink.publish(frame.image, jpeg),
        Err(e) => warn!("帧 {} 编码失败: {}", frame.index, e),
      }
    }

    info!("采集线程退出");
  }
}

/// 在独立线程中打开采集源与模型并运行采集循环
///
/// 打开失败时返回错误，此时服务不应启动。
pub fn spawn_worker<I, M, F>(
  open: F,
  draw: Draw<'static>,
  sink: FrameSink,
  settings: WorkerSettings,
) -> anyhow::Result<JoinHandle<()>>
where
  F: FnOnce() -> anyhow::Result<(I, M)> + Send + 'static,
  I: CaptureSource,
  I::Error: fmt::Display,
  M: Model<Input = Frame, Output = DetectResult>,
  M::Error: fmt::Display,
{
  let (ready_tx, ready_rx) = mpsc::sync_channel(1);

  let handle = thread::Builder::new()
    .name("capture-worker".to_string())
    .spawn(move || {
      let (input, model) = match open() {
        Ok(opened) => {
          let _ = ready_tx.send(Ok(()));
          opened
        }
        Err(e) => {
          let _ = ready_tx.send(Err(e));
          return;
        }
      };
      CaptureWorker::new(input, model, draw, sink, settings).run();
    })
    .context("无法创建采集线程")?;

  ready_rx
    .recv()
    .context("采集线程意外退出")??;
  Ok(handle)
}
