// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme, frame::Frame, input::CaptureSource, url_file_path,
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配")]
  SchemaMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
  #[error("图像已读取完毕")]
  Exhausted,
}

/// 把一张静态图片当作摄像头使用
///
/// 默认每次读取都返回同一张图；URL 带 `?once` 时只产出一帧。
pub struct ImageFileInput {
  image: RgbImage,
  once: bool,
  next_index: u64,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url_file_path(url);
    let once = url.query_pairs().any(|(k, _)| k == "once");
    let image = ImageReader::open(&path)?.decode()?.to_rgb8();
    info!(
      "读取图像文件: {} ({}x{})",
      path,
      image.width(),
      image.height()
    );

    Ok(Self::from_image(image, once))
  }
}

impl ImageFileInput {
  pub fn from_image(image: RgbImage, once: bool) -> Self {
    Self {
      image,
      once,
      next_index: 0,
    }
  }
}

impl CaptureSource for ImageFileInput {
  type Error = ImageFileInputError;

  fn read(&mut self) -> Result<Frame, Self::Error> {
    if self.once && self.next_index > 0 {
      return Err(ImageFileInputError::Exhausted);
    }
    let frame = Frame::new(self.next_index, self.image.clone());
    self.next_index += 1;
    Ok(frame)
  }

  fn width(&self) -> u32 {
    self.image.width()
  }

  fn height(&self) -> u32 {
    self.image.height()
  }
}
