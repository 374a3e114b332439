// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/input/v4l_input.rs - V4L 摄像头输入
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

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;
use v4l::{
  Device, FourCC,
  buffer::Type,
  io::{mmap::Stream, traits::CaptureStream},
  video::{Capture, capture::Parameters},
};

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Frame, FrameError},
  input::CaptureSource,
  url_file_path,
};

const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const BUFFER_COUNT: u32 = 4;

#[derive(Error, Debug)]
pub enum V4lInputError {
  #[error("URI 方案不匹配")]
  SchemaMismatch,
  #[error("URI 参数无效: {0}")]
  InvalidQuery(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("不支持的像素格式: {0}")]
  UnsupportedPixelFormat(FourCC),
  #[error("MJPG 解码错误: {0}")]
  DecodeError(#[from] image::ImageError),
  #[error("帧数据错误: {0}")]
  FrameError(#[from] FrameError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelFormat {
  Mjpg,
  Yuyv,
  Rgb3,
}

impl PixelFormat {
  fn from_fourcc(fourcc: FourCC) -> Option<Self> {
    match &fourcc.repr {
      b"MJPG" => Some(PixelFormat::Mjpg),
      b"YUYV" => Some(PixelFormat::Yuyv),
      b"RGB3" => Some(PixelFormat::Rgb3),
      _ => None,
    }
  }
}

/// V4L2 摄像头
///
/// `stream` 需先于 `device` 释放，字段顺序即释放顺序。
pub struct V4lInput {
  stream: Stream<'static>,
  device: Device,
  device_path: String,
  format: PixelFormat,
  width: u32,
  height: u32,
  next_index: u64,
}

impl FromUrlWithScheme for V4lInput {
  const SCHEME: &'static str = "v4l";
}

impl FromUrl for V4lInput {
  type Error = V4lInputError;

  /// `v4l:///dev/video0?width=640&height=480&fps=30`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(V4lInputError::SchemaMismatch);
    }

    let mut device_path = url_file_path(url);
    if device_path.is_empty() || device_path == "/" {
      device_path = DEFAULT_DEVICE.to_string();
    }

    let mut width = DEFAULT_WIDTH;
    let mut height = DEFAULT_HEIGHT;
    let mut fps = None;
    for (k, v) in url.query_pairs() {
      let parse = |v: &str| {
        v.parse::<u32>()
          .map_err(|_| V4lInputError::InvalidQuery(format!("{}={}", k, v)))
      };
      match k.as_ref() {
        "width" => width = parse(v.as_ref())?,
        "height" => height = parse(v.as_ref())?,
        "fps" => fps = Some(parse(v.as_ref())?),
        _ => warn!("忽略未知参数: {}", k),
      }
    }

    Self::open(&device_path, width, height, fps)
  }
}

impl V4lInput {
  pub fn open(
    device_path: &str,
    width: u32,
    height: u32,
    fps: Option<u32>,
  ) -> Result<Self, V4lInputError> {
    info!("打开摄像头: {}", device_path);
    let device = Device::with_path(device_path)?;

    // 优先 MJPG，驱动不支持时沿用协商后的格式
    let mut format = device.format()?;
    format.width = width;
    format.height = height;
    format.fourcc = FourCC::new(b"MJPG");
    let format = device.set_format(&format).or_else(|e| {
      warn!("设置 MJPG 格式失败: {}, 使用设备当前格式", e);
      device.format()
    })?;

    let pixel_format =
      PixelFormat::from_fourcc(format.fourcc).ok_or(V4lInputError::UnsupportedPixelFormat(format.fourcc))?;

    if let Some(fps) = fps {
      if let Err(e) = device.set_params(&Parameters::with_fps(fps)) {
        warn!("设置帧率 {} 失败: {}", fps, e);
      }
    }

    let stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)?;
    info!(
      "摄像头就绪: {}x{} {}",
      format.width, format.height, format.fourcc
    );

    Ok(Self {
      stream,
      device,
      device_path: device_path.to_string(),
      format: pixel_format,
      width: format.width,
      height: format.height,
      next_index: 0,
    })
  }

  pub fn device_path(&self) -> &str {
    &self.device_path
  }

  pub fn device(&self) -> &Device {
    &self.device
  }

  fn decode(&self, data: &[u8]) -> Result<RgbImage, V4lInputError> {
    match self.format {
      PixelFormat::Mjpg => {
        Ok(image::load_from_memory_with_format(data, ImageFormat::Jpeg)?.to_rgb8())
      }
      PixelFormat::Yuyv => {
        let rgb = yuyv_to_rgb(data, self.width, self.height);
        Ok(Frame::from_rgb_bytes(0, self.width, self.height, rgb)?.image)
      }
      PixelFormat::Rgb3 => {
        let size = (self.width * self.height * 3) as usize;
        let rgb = data.get(..size).unwrap_or(data).to_vec();
        Ok(Frame::from_rgb_bytes(0, self.width, self.height, rgb)?.image)
      }
    }
  }
}

impl CaptureSource for V4lInput {
  type Error = V4lInputError;

  fn read(&mut self) -> Result<Frame, Self::Error> {
    let data = {
      let (buf, meta) = self.stream.next()?;
      let used = (meta.bytesused as usize).min(buf.len());
      let used = if used == 0 { buf.len() } else { used };
      buf[..used].to_vec()
    };

    let image = self.decode(&data)?;
    let frame = Frame::new(self.next_index, image);
    self.next_index += 1;
    debug!("采集帧 {}", frame.index);
    Ok(frame)
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }
}

/// YUYV (YUV 4:2:2) 转 RGB24，两个像素共用一组色度
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
  let pixels = (width * height) as usize;
  let mut rgb = Vec::with_capacity(pixels * 3);

  for chunk in yuyv.chunks_exact(4).take(pixels / 2) {
    let u = chunk[1] as f32 - 128.0;
    let v = chunk[3] as f32 - 128.0;
    for y in [chunk[0] as f32, chunk[2] as f32] {
      let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);
    }
  }

  rgb
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn yuyv_grey_stays_grey() {
    let rgb = yuyv_to_rgb(&[100, 128, 200, 128], 2, 1);
    assert_eq!(rgb, vec![100, 100, 100, 200, 200, 200]);
  }

  #[test]
  fn yuyv_output_matches_frame_size() {
    let yuyv = vec![16u8; 4 * 3 * 2];
    let rgb = yuyv_to_rgb(&yuyv, 4, 3);
    assert_eq!(rgb.len(), 4 * 3 * 3);
    assert!(Frame::from_rgb_bytes(0, 4, 3, rgb).is_ok());
  }

  #[test]
  fn short_yuyv_buffer_yields_short_output() {
    let rgb = yuyv_to_rgb(&[0u8; 6], 4, 1);
    assert_eq!(rgb.len(), 6);
  }

  #[test]
  fn recognizes_supported_fourcc() {
    assert_eq!(
      PixelFormat::from_fourcc(FourCC::new(b"YUYV")),
      Some(PixelFormat::Yuyv)
    );
    assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"NV12")), None);
  }

  #[test]
  fn rejects_other_schemes() {
    let url = Url::parse("image:///tmp/a.png").unwrap();
    assert!(matches!(
      V4lInput::from_url(&url),
      Err(V4lInputError::SchemaMismatch)
    ));
  }
}
