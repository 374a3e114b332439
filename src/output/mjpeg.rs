// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/output/mjpeg.rs - JPEG 编码与 multipart 分帧
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

use image::{ExtendedColorType, ImageEncoder, RgbImage, codecs::jpeg::JpegEncoder};

pub const BOUNDARY: &str = "frame";
pub const CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";
pub const DEFAULT_QUALITY: u8 = 80;

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
  let mut buffer = Vec::new();
  JpegEncoder::new_with_quality(&mut buffer, quality).write_image(
    image.as_raw(),
    image.width(),
    image.height(),
    ExtendedColorType::Rgb8,
  )?;
  Ok(buffer)
}

/// `--frame\r\nContent-Type: image/jpeg\r\n\r\n<jpeg>\r\n`
pub fn multipart_part(jpeg: &[u8]) -> Vec<u8> {
  let header = format!("--{}\r\nContent-Type: image/jpeg\r\n\r\n", BOUNDARY);
  let mut part = Vec::with_capacity(header.len() + jpeg.len() + 2);
  part.extend_from_slice(header.as_bytes());
  part.extend_from_slice(jpeg);
  part.extend_from_slice(b"\r\n");
  part
}
