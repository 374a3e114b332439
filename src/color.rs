// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/color.rs - 颜色模型转换
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

use image::Rgb;
use thiserror::Error;

pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ColorError {
  #[error("颜色格式无效: {0:?}，应为 #RRGGBB")]
  InvalidFormat(String),
  #[error("十六进制数值无效: {0}")]
  InvalidHex(#[from] std::num::ParseIntError),
}

/// 将 `#RRGGBB`（`#` 可省略）解析为 RGB 颜色
pub fn hex_to_rgb(hex: &str) -> Result<Rgb<u8>, ColorError> {
  let digits = hex.strip_prefix('#').unwrap_or(hex);
  if digits.len() != 6 || !digits.is_ascii() {
    return Err(ColorError::InvalidFormat(hex.to_string()));
  }

  let r = u8::from_str_radix(&digits[0..2], 16)?;
  let g = u8::from_str_radix(&digits[2..4], 16)?;
  let b = u8::from_str_radix(&digits[4..6], 16)?;
  Ok(Rgb([r, g, b]))
}

/// 打包为 0RGB 的 u32，窗口帧缓冲使用这种像素布局
pub fn pack_0rgb(color: Rgb<u8>) -> u32 {
  let Rgb([r, g, b]) = color;
  ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_hex_with_and_without_hash() {
    assert_eq!(hex_to_rgb("#4CAF50"), Ok(Rgb([0x4C, 0xAF, 0x50])));
    assert_eq!(hex_to_rgb("2196f3"), Ok(Rgb([0x21, 0x96, 0xF3])));
  }

  #[test]
  fn rejects_malformed_hex() {
    assert!(matches!(
      hex_to_rgb("#FFF"),
      Err(ColorError::InvalidFormat(_))
    ));
    assert!(matches!(hex_to_rgb("#GG0000"), Err(ColorError::InvalidHex(_))));
    assert!(matches!(
      hex_to_rgb("#ÄÄ0000"),
      Err(ColorError::InvalidFormat(_))
    ));
  }

  #[test]
  fn packs_pixels_for_framebuffer() {
    assert_eq!(pack_0rgb(Rgb([0x12, 0x34, 0x56])), 0x0012_3456);
    assert_eq!(pack_0rgb(WHITE), 0x00FF_FFFF);
  }
}
