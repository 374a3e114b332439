// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/output/window.rs - 预览窗口与按键
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

use image::RgbImage;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use thiserror::Error;
use tracing::info;

use crate::{color::pack_0rgb, output::Screen, task::Command};

const TARGET_FPS: usize = 60;

#[derive(Error, Debug)]
pub enum WindowError {
  #[error("窗口错误: {0}")]
  MinifbError(#[from] minifb::Error),
}

pub struct WindowOutput {
  window: Window,
  buffer: Vec<u32>,
}

impl WindowOutput {
  pub fn new(title: &str, width: u32, height: u32) -> Result<Self, WindowError> {
    let mut window = Window::new(
      title,
      width as usize,
      height as usize,
      WindowOptions::default(),
    )?;
    window.set_target_fps(TARGET_FPS);
    info!("打开预览窗口: {} ({}x{})", title, width, height);
    Ok(Self {
      window,
      buffer: Vec::new(),
    })
  }
}

/// 窗口按键到交互命令的映射
pub fn command_for(key: Key) -> Option<Command> {
  match key {
    Key::Space => Some(Command::Trigger),
    Key::C => Some(Command::ToggleContinuous),
    Key::F => Some(Command::CycleFilter),
    Key::S => Some(Command::Screenshot),
    Key::Q | Key::Escape => Some(Command::Quit),
    _ => None,
  }
}

impl Screen for WindowOutput {
  type Error = WindowError;

  fn show(&mut self, image: &RgbImage) -> Result<(), Self::Error> {
    self.buffer.clear();
    self.buffer.extend(image.pixels().map(|p| pack_0rgb(*p)));
    self.window.update_with_buffer(
      &self.buffer,
      image.width() as usize,
      image.height() as usize,
    )?;
    Ok(())
  }

  fn idle(&mut self) -> Result<(), Self::Error> {
    self.window.update();
    Ok(())
  }

  fn commands(&mut self) -> Vec<Command> {
    self
      .window
      .get_keys_pressed(KeyRepeat::No)
      .into_iter()
      .filter_map(command_for)
      .collect()
  }

  fn is_open(&self) -> bool {
    self.window.is_open()
  }
}
