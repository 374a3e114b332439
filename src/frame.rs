// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/frame.rs - RGB 帧定义
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

use chrono::{DateTime, Local};
use image::RgbImage;
use thiserror::Error;

const RGB_CHANNELS: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 一次采集得到的 NHWC 排布 RGB 帧
#[derive(Debug, Clone)]
pub struct Frame {
  pub index: u64,
  pub captured_at: DateTime<Local>,
  pub image: RgbImage,
}

impl Frame {
  pub fn new(index: u64, image: RgbImage) -> Self {
    Self {
      index,
      captured_at: Local::now(),
      image,
    }
  }

  pub fn from_rgb_bytes(
    index: u64,
    width: u32,
    height: u32,
    data: Vec<u8>,
  ) -> Result<Self, FrameError> {
    let expected = RGB_CHANNELS * width as usize * height as usize;
    let actual = data.len();
    let image = RgbImage::from_raw(width, height, data)
      .filter(|_| actual == expected)
      .ok_or(FrameError::LengthMismatch { expected, actual })?;
    Ok(Self::new(index, image))
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builds_from_exact_buffer() {
    let frame = Frame::from_rgb_bytes(7, 4, 2, vec![9u8; 4 * 2 * 3]).unwrap();
    assert_eq!(frame.index, 7);
    assert_eq!((frame.width(), frame.height()), (4, 2));
    assert_eq!(frame.image.as_raw().len(), 24);
  }

  #[test]
  fn rejects_short_and_long_buffers() {
    assert_eq!(
      Frame::from_rgb_bytes(0, 4, 2, vec![0u8; 10]).unwrap_err(),
      FrameError::LengthMismatch {
        expected: 24,
        actual: 10
      }
    );
    assert!(Frame::from_rgb_bytes(0, 4, 2, vec![0u8; 30]).is_err());
  }
}
