// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/output/save_image_file.rs - 截图保存
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

use std::path::PathBuf;

use chrono::{DateTime, Local};
use image::RgbImage;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
}

/// 按时间戳命名，把图像写到输出目录
#[derive(Debug, Clone)]
pub struct ScreenshotWriter {
  dir: PathBuf,
  prefix: &'static str,
  time_format: &'static str,
}

impl ScreenshotWriter {
  /// 交互模式：`detection_HHMMSS.jpg`
  pub fn cli(dir: impl Into<PathBuf>) -> Self {
    Self {
      dir: dir.into(),
      prefix: "detection",
      time_format: "%H%M%S",
    }
  }

  /// 网页模式：`screenshot_YYYYmmdd_HHMMSS.jpg`
  pub fn web(dir: impl Into<PathBuf>) -> Self {
    Self {
      dir: dir.into(),
      prefix: "screenshot",
      time_format: "%Y%m%d_%H%M%S",
    }
  }

  pub fn file_name(&self, time: &DateTime<Local>) -> String {
    format!("{}_{}.jpg", self.prefix, time.format(self.time_format))
  }

  pub fn save(&self, image: &RgbImage) -> Result<PathBuf, SaveImageFileError> {
    self.save_at(image, &Local::now())
  }

  pub fn save_at(
    &self,
    image: &RgbImage,
    time: &DateTime<Local>,
  ) -> Result<PathBuf, SaveImageFileError> {
    if !self.dir.as_os_str().is_empty() {
      std::fs::create_dir_all(&self.dir)?;
    }
    let path = self.dir.join(self.file_name(time));
    image.save(&path)?;
    info!("保存截图: {}", path.display());
    Ok(path)
  }
}
