// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/task.rs - 交互任务
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
  sync::mpsc::{self, Receiver},
  thread,
  time::{Duration, Instant},
};

use tracing::{debug, error, info, warn};

use crate::{
  detect::{DEFAULT_CONFIDENCE, Detection, Detector, Filter, group_by_category},
  frame::Frame,
  input::CaptureSource,
  model::{DetectResult, Model},
  output::{
    Screen, ScreenshotWriter,
    draw::{Annotation, Draw, StatusOverlay},
  },
  stats::FpsCounter,
};

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

/// 交互循环的检测状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
  #[default]
  Idle,
  /// 下一帧执行一次检测
  ManualArmed,
  /// 每帧检测；`resume_armed` 记录进入前是否已触发，退出时恢复
  Continuous { resume_armed: bool },
}

impl LoopState {
  pub fn trigger(self) -> Self {
    match self {
      LoopState::Idle | LoopState::ManualArmed => LoopState::ManualArmed,
      continuous @ LoopState::Continuous { .. } => continuous,
    }
  }

  pub fn toggle_continuous(self) -> Self {
    match self {
      LoopState::Continuous { resume_armed: true } => LoopState::ManualArmed,
      LoopState::Continuous { resume_armed: false } => LoopState::Idle,
      LoopState::Idle => LoopState::Continuous { resume_armed: false },
      LoopState::ManualArmed => LoopState::Continuous { resume_armed: true },
    }
  }

  pub fn should_detect(self) -> bool {
    self != LoopState::Idle
  }

  pub fn after_pass(self) -> Self {
    match self {
      LoopState::ManualArmed => LoopState::Idle,
      other => other,
    }
  }

  pub fn is_continuous(self) -> bool {
    matches!(self, LoopState::Continuous { .. })
  }
}

/// 与按键无关的交互命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  Trigger,
  ToggleContinuous,
  CycleFilter,
  Screenshot,
  Quit,
}

/// 需要在渲染之后执行的命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
  Screenshot,
  Quit,
}

/// 交互状态机：模式、过滤器与保留的检测结果
#[derive(Debug, Default)]
pub struct Controller {
  state: LoopState,
  filter: Filter,
  retained: Vec<Detection>,
}

impl Controller {
  pub fn state(&self) -> LoopState {
    self.state
  }

  pub fn filter(&self) -> Filter {
    self.filter
  }

  pub fn detections(&self) -> &[Detection] {
    &self.retained
  }

  pub fn should_detect(&self) -> bool {
    self.state.should_detect()
  }

  pub fn handle(&mut self, command: Command) -> Option<Effect> {
    match command {
      Command::Trigger => {
        self.state = self.state.trigger();
        None
      }
      Command::ToggleContinuous => {
        let leaving = self.state.is_continuous();
        self.state = self.state.toggle_continuous();
        if leaving {
          self.retained.clear();
        }
        info!(
          "连续检测: {}",
          if self.state.is_continuous() { "开" } else { "关" }
        );
        None
      }
      Command::CycleFilter => {
        self.filter = self.filter.cycle();
        self.retained.clear();
        info!("过滤器: {}", self.filter);
        None
      }
      Command::Screenshot => Some(Effect::Screenshot),
      Command::Quit => Some(Effect::Quit),
    }
  }

  /// 记录一次检测的结果，返回这次检测是否由手动触发
  pub fn accept(&mut self, detections: Vec<Detection>) -> bool {
    let manual = self.state == LoopState::ManualArmed;
    self.retained = self.filter.apply(detections);
    self.state = self.state.after_pass();
    manual
  }
}

fn log_detections(detections: &[Detection]) {
  if detections.is_empty() {
    info!("未检测到物品");
    return;
  }
  info!("检测到 {} 个物品:", detections.len());
  for (category, items) in group_by_category(detections) {
    info!("{}:", category);
    for d in items {
      info!("  - {}: {:.2}", d.label, d.confidence);
    }
  }
}

/// 安装 Ctrl-C 处理器，收到信号时向返回的通道发送通知
pub fn interrupt_channel() -> Result<Receiver<()>, ctrlc::Error> {
  let (tx, rx) = mpsc::channel();
  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;
  Ok(rx)
}

const READ_RETRY_DELAY: Duration = Duration::from_millis(10);

/// 摄像头 → 检测 → 绘制 → 窗口 的交互循环
pub struct InteractiveTask<'a> {
  confidence: f32,
  frame_number: Option<u64>,
  draw: Draw<'a>,
  screenshots: ScreenshotWriter,
  interrupt: Option<Receiver<()>>,
}

impl<'a> InteractiveTask<'a> {
  pub fn new(draw: Draw<'a>, screenshots: ScreenshotWriter) -> Self {
    Self {
      confidence: DEFAULT_CONFIDENCE,
      frame_number: None,
      draw,
      screenshots,
      interrupt: None,
    }
  }

  pub fn with_confidence(mut self, confidence: f32) -> Self {
    self.confidence = confidence;
    self
  }

  pub fn with_frame_number(mut self, frame_number: Option<u64>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_interrupt(mut self, interrupt: Receiver<()>) -> Self {
    self.interrupt = Some(interrupt);
    self
  }

  fn interrupted(&self) -> bool {
    self
      .interrupt
      .as_ref()
      .is_some_and(|rx| rx.try_recv().is_ok())
  }
}

impl<I, M, O> Task<I, M, O> for InteractiveTask<'_>
where
  I: CaptureSource,
  I::Error: fmt::Display,
  M: Model<Input = Frame, Output = DetectResult>,
  M::Error: fmt::Display,
  O: Screen,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, mut output: O) -> Result<(), Self::Error> {
    info!("开始交互任务...");
    let detector = Detector::new(model).with_confidence(self.confidence);
    let mut controller = Controller::default();
    let mut fps = FpsCounter::new();
    let mut frames = 0u64;
    // 读帧失败时截图请求顺延到下一帧
    let mut screenshot_pending = false;

    while output.is_open() {
      let effects: Vec<Effect> = output
        .commands()
        .into_iter()
        .filter_map(|command| controller.handle(command))
        .collect();
      screenshot_pending |= effects.contains(&Effect::Screenshot);

      let frame = match input.read() {
        Ok(frame) => frame,
        Err(e) => {
          warn!("读取帧失败: {}", e);
          if effects.contains(&Effect::Quit) || self.interrupted() {
            break;
          }
          if screenshot_pending {
            warn!("暂无画面，截图顺延到下一帧");
          }
          // 没有新画面也要处理窗口事件，否则按键与关闭窗口都收不到
          output.idle()?;
          thread::sleep(READ_RETRY_DELAY);
          continue;
        }
      };

      let current_fps = fps.tick(Instant::now());
      if controller.should_detect() {
        let now = Instant::now();
        let detections = detector.detect_or_empty(&frame);
        debug!("检测耗时: {:.2?}", now.elapsed());
        if controller.accept(detections) {
          log_detections(controller.detections());
        }
      }

      let rendered = self.draw.annotate(
        &frame.image,
        &Annotation {
          detections: controller.detections(),
          summary: true,
          status: Some(StatusOverlay {
            fps: current_fps,
            continuous: controller.state().is_continuous(),
            filter: controller.filter(),
            show_controls: true,
          }),
        },
      );
      output.show(&rendered)?;

      if screenshot_pending {
        screenshot_pending = false;
        match self.screenshots.save(&rendered) {
          Ok(path) => info!("截图已保存: {}", path.display()),
          Err(e) => error!("保存截图失败: {}", e),
        }
      }
      if effects.contains(&Effect::Quit) {
        info!("收到退出命令");
        break;
      }

      frames += 1;
      if self.frame_number.is_some_and(|n| frames >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frames);
        break;
      }
      if self.interrupted() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，共处理 {} 帧", frames);
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::collections::VecDeque;

  use image::{Rgb, RgbImage};
  use thiserror::Error;

  use super::*;
  use crate::{
    category::Category,
    detect::tests::{StubModel, detection, item},
  };

  #[derive(Error, Debug)]
  #[error("模拟错误")]
  struct StubError;

  struct StubSource {
    failures: usize,
    reads: u64,
  }

  impl StubSource {
    fn new(failures: usize) -> Self {
      Self { failures, reads: 0 }
    }
  }

  impl CaptureSource for StubSource {
    type Error = StubError;

    fn read(&mut self) -> Result<Frame, StubError> {
      if self.failures > 0 {
        self.failures -= 1;
        return Err(StubError);
      }
      self.reads += 1;
      Ok(Frame::new(
        self.reads,
        RgbImage::from_pixel(320, 240, Rgb([30, 30, 30])),
      ))
    }

    fn width(&self) -> u32 {
      320
    }

    fn height(&self) -> u32 {
      240
    }
  }

  /// 每次 `commands` 按脚本回放一组命令
  #[derive(Default)]
  struct StubScreen {
    script: VecDeque<Vec<Command>>,
    shown: Vec<RgbImage>,
    idles: usize,
  }

  impl StubScreen {
    fn scripted(script: Vec<Vec<Command>>) -> Self {
      Self {
        script: script.into(),
        ..Default::default()
      }
    }
  }

  impl Screen for &mut StubScreen {
    type Error = StubError;

    fn show(&mut self, image: &RgbImage) -> Result<(), StubError> {
      self.shown.push(image.clone());
      Ok(())
    }

    fn idle(&mut self) -> Result<(), StubError> {
      self.idles += 1;
      Ok(())
    }

    fn commands(&mut self) -> Vec<Command> {
      self.script.pop_front().unwrap_or_default()
    }

    fn is_open(&self) -> bool {
      true
    }
  }

  fn chair_model() -> StubModel {
    StubModel::returning(vec![item(56, 0.8, [200.0, 20.0, 300.0, 100.0])])
  }

  fn task(dir: &std::path::Path, frames: u64) -> InteractiveTask<'static> {
    InteractiveTask::new(Draw::new().unwrap(), ScreenshotWriter::cli(dir))
      .with_frame_number(Some(frames))
  }

  fn has_box(image: &RgbImage) -> bool {
    *image.get_pixel(200, 60) == Category::Furniture.color()
  }

  #[test]
  fn toggling_twice_restores_state() {
    assert_eq!(
      LoopState::Idle.toggle_continuous().toggle_continuous(),
      LoopState::Idle
    );
    assert_eq!(
      LoopState::ManualArmed.toggle_continuous().toggle_continuous(),
      LoopState::ManualArmed
    );
    let continuous = LoopState::Idle.toggle_continuous();
    assert!(continuous.is_continuous());
    assert_eq!(continuous.trigger(), continuous);
    assert_eq!(continuous.after_pass(), continuous);
    assert_eq!(LoopState::Idle.trigger(), LoopState::ManualArmed);
    assert_eq!(LoopState::ManualArmed.after_pass(), LoopState::Idle);
    assert!(!LoopState::Idle.should_detect());
  }

  #[test]
  fn armed_pass_survives_a_continuous_round_trip() {
    let mut controller = Controller::default();
    controller.handle(Command::Trigger);
    controller.handle(Command::ToggleContinuous);
    assert!(controller.state().is_continuous());
    controller.handle(Command::ToggleContinuous);
    assert_eq!(controller.state(), LoopState::ManualArmed);
    assert!(controller.should_detect());
  }

  #[test]
  fn manual_pass_returns_to_idle_and_keeps_results() {
    let mut controller = Controller::default();
    assert_eq!(controller.handle(Command::Trigger), None);
    assert!(controller.should_detect());
    assert!(controller.accept(vec![detection("chair", Category::Furniture)]));
    assert_eq!(controller.state(), LoopState::Idle);
    assert_eq!(controller.detections().len(), 1);
  }

  #[test]
  fn filter_and_mode_changes_clear_results() {
    let mut controller = Controller::default();
    controller.handle(Command::ToggleContinuous);
    assert!(!controller.accept(vec![detection("chair", Category::Furniture)]));
    assert_eq!(controller.detections().len(), 1);
    controller.handle(Command::ToggleContinuous);
    assert!(controller.detections().is_empty());

    controller.handle(Command::Trigger);
    controller.accept(vec![detection("chair", Category::Furniture)]);
    controller.handle(Command::CycleFilter);
    assert_eq!(controller.filter(), Filter::only(Category::Furniture));
    assert!(controller.detections().is_empty());
  }

  #[test]
  fn active_filter_drops_other_categories() {
    let mut controller = Controller::default();
    controller.handle(Command::CycleFilter);
    controller.handle(Command::CycleFilter);
    assert_eq!(controller.filter(), Filter::only(Category::Electronics));
    controller.handle(Command::Trigger);
    controller.accept(vec![detection("chair", Category::Furniture)]);
    assert!(controller.detections().is_empty());
  }

  #[test]
  fn screenshot_and_quit_are_effects() {
    let mut controller = Controller::default();
    assert_eq!(controller.handle(Command::Screenshot), Some(Effect::Screenshot));
    assert_eq!(controller.handle(Command::Quit), Some(Effect::Quit));
    assert_eq!(controller.state(), LoopState::Idle);
  }

  #[test]
  fn idle_loop_never_runs_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let model = chair_model();
    let mut screen = StubScreen::default();
    task(dir.path(), 3)
      .run_task(StubSource::new(0), &model, &mut screen)
      .unwrap();
    assert_eq!(model.calls.get(), 0);
    assert_eq!(screen.shown.len(), 3);
    assert!(!screen.shown.iter().any(has_box));
  }

  #[test]
  fn trigger_runs_one_pass_and_keeps_boxes() {
    let dir = tempfile::tempdir().unwrap();
    let model = chair_model();
    let mut screen = StubScreen::scripted(vec![vec![], vec![Command::Trigger]]);
    task(dir.path(), 4)
      .run_task(StubSource::new(0), &model, &mut screen)
      .unwrap();
    assert_eq!(model.calls.get(), 1);
    assert!(!has_box(&screen.shown[0]));
    assert!(screen.shown[1..].iter().all(has_box));
  }

  #[test]
  fn continuous_mode_runs_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let model = chair_model();
    let mut screen = StubScreen::scripted(vec![vec![Command::ToggleContinuous]]);
    task(dir.path(), 5)
      .run_task(StubSource::new(0), &model, &mut screen)
      .unwrap();
    assert_eq!(model.calls.get(), 5);
  }

  #[test]
  fn inference_failure_keeps_looping() {
    let dir = tempfile::tempdir().unwrap();
    let model = StubModel::failing();
    let mut screen = StubScreen::scripted(vec![vec![Command::ToggleContinuous]]);
    task(dir.path(), 3)
      .run_task(StubSource::new(0), &model, &mut screen)
      .unwrap();
    assert_eq!(model.calls.get(), 3);
    assert_eq!(screen.shown.len(), 3);
  }

  #[test]
  fn quit_ends_after_rendering() {
    let dir = tempfile::tempdir().unwrap();
    let model = chair_model();
    let mut screen = StubScreen::scripted(vec![vec![], vec![Command::Quit]]);
    task(dir.path(), 100)
      .run_task(StubSource::new(0), &model, &mut screen)
      .unwrap();
    assert_eq!(screen.shown.len(), 2);
  }

  #[test]
  fn screenshot_writes_rendered_frame() {
    let dir = tempfile::tempdir().unwrap();
    let model = chair_model();
    let mut screen =
      StubScreen::scripted(vec![vec![Command::Trigger, Command::Screenshot, Command::Quit]]);
    task(dir.path(), 10)
      .run_task(StubSource::new(0), &model, &mut screen)
      .unwrap();

    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);
    let path = files[0].as_ref().unwrap().path();
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("detection_") && name.ends_with(".jpg"));
  }

  #[test]
  fn read_failures_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let model = chair_model();
    let mut screen = StubScreen::default();
    task(dir.path(), 2)
      .run_task(StubSource::new(3), &model, &mut screen)
      .unwrap();
    assert_eq!(screen.shown.len(), 2);
  }

  #[test]
  fn quit_works_while_the_camera_keeps_failing() {
    let dir = tempfile::tempdir().unwrap();
    let model = chair_model();
    let mut screen = StubScreen::scripted(vec![vec![], vec![], vec![Command::Quit]]);
    task(dir.path(), 100)
      .run_task(StubSource::new(usize::MAX), &model, &mut screen)
      .unwrap();
    assert!(screen.shown.is_empty());
    assert_eq!(screen.idles, 2);
  }

  #[test]
  fn screenshot_waits_for_the_next_frame() {
    let dir = tempfile::tempdir().unwrap();
    let model = chair_model();
    let mut screen = StubScreen::scripted(vec![vec![Command::Screenshot]]);
    task(dir.path(), 1)
      .run_task(StubSource::new(2), &model, &mut screen)
      .unwrap();
    assert_eq!(screen.idles, 2);
    assert_eq!(screen.shown.len(), 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
  }
}
