// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/input.rs - 视频/图像输入
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

use thiserror::Error;
use tracing::error;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

/// 按需产出 RGB 帧的采集源，释放资源由 `Drop` 完成
pub trait CaptureSource {
  type Error;

  fn read(&mut self) -> Result<Frame, Self::Error>;
  fn width(&self) -> u32;
  fn height(&self) -> u32;
}

mod read_image_file;
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(feature = "v4l_input")]
mod v4l_input;
#[cfg(feature = "v4l_input")]
pub use self::v4l_input::{V4lInput, V4lInputError, yuyv_to_rgb};

#[derive(Error, Debug)]
pub enum InputError {
  #[error("图像文件输入错误: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "v4l_input")]
  #[error("V4L 输入错误: {0}")]
  V4lInputError(#[from] V4lInputError),
  #[error("不支持的输入方案: {0}")]
  SchemeMismatch(String),
}

pub enum InputWrapper {
  #[cfg(feature = "v4l_input")]
  V4l(V4lInput),
  ImageFile(ImageFileInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "v4l_input")]
    {
      if url.scheme() == V4lInput::SCHEME {
        return Ok(InputWrapper::V4l(V4lInput::from_url(url)?));
      }
    }
    if url.scheme() == ImageFileInput::SCHEME {
      return Ok(InputWrapper::ImageFile(ImageFileInput::from_url(url)?));
    }
    error!("不支持的输入方案: {}", url.scheme());
    Err(InputError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl CaptureSource for InputWrapper {
  type Error = InputError;

  fn read(&mut self) -> Result<Frame, Self::Error> {
    match self {
      #[cfg(feature = "v4l_input")]
      InputWrapper::V4l(input) => Ok(input.read()?),
      InputWrapper::ImageFile(input) => Ok(input.read()?),
    }
  }

  fn width(&self) -> u32 {
    match self {
      #[cfg(feature = "v4l_input")]
      InputWrapper::V4l(input) => input.width(),
      InputWrapper::ImageFile(input) => input.width(),
    }
  }

  fn height(&self) -> u32 {
    match self {
      #[cfg(feature = "v4l_input")]
      InputWrapper::V4l(input) => input.height(),
      InputWrapper::ImageFile(input) => input.height(),
    }
  }
}
