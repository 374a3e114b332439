// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/output.rs - 结果输出
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

use crate::task::Command;

/// 显示渲染结果并回报用户命令的界面
pub trait Screen {
  type Error;

  fn show(&mut self, image: &RgbImage) -> Result<(), Self::Error>;
  /// 没有新画面时仍需处理窗口事件
  fn idle(&mut self) -> Result<(), Self::Error>;
  /// 自上次调用以来的命令，按发生顺序排列
  fn commands(&mut self) -> Vec<Command>;
  fn is_open(&self) -> bool;
}

pub mod draw;
pub mod mjpeg;

mod save_image_file;
pub use self::save_image_file::{SaveImageFileError, ScreenshotWriter};

#[cfg(feature = "window")]
mod window;
#[cfg(feature = "window")]
pub use self::window::{WindowError, WindowOutput, command_for};
