// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/model/postprocess.rs - YOLOv8 输出解码
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

use tracing::{debug, error};

use crate::model::{DetectItem, DetectResult, non_max_suppression};

/// 模型输入空间到原图的映射
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGeometry {
  pub input_size: f32,
  pub frame_width: f32,
  pub frame_height: f32,
}

impl FrameGeometry {
  pub fn new(input_size: u32, frame_width: u32, frame_height: u32) -> Self {
    Self {
      input_size: input_size as f32,
      frame_width: frame_width as f32,
      frame_height: frame_height as f32,
    }
  }

  fn scale_x(&self) -> f32 {
    self.frame_width / self.input_size
  }

  fn scale_y(&self) -> f32 {
    self.frame_height / self.input_size
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodeParams {
  pub num_classes: usize,
  pub score_threshold: f32,
  pub nms_threshold: f32,
}

/// 解码 `[1, 4 + C, N]` 排布的 YOLOv8 输出
///
/// 每个候选框按列存放：`cx, cy, w, h, score_0 .. score_{C-1}`。
pub fn decode_yolov8(
  output: &[f32],
  geometry: FrameGeometry,
  params: DecodeParams,
) -> DetectResult {
  let rows = 4 + params.num_classes;
  if output.is_empty() || output.len() % rows != 0 {
    error!(
      "模型输出大小不匹配: 长度 {}, 每个候选框 {} 个数值",
      output.len(),
      rows
    );
    return DetectResult::default();
  }

  let proposals = output.len() / rows;
  debug!("候选框数量: {}", proposals);

  let mut candidates = Vec::new();
  for i in 0..proposals {
    let (class_id, score) = (0..params.num_classes)
      .map(|c| (c, output[(4 + c) * proposals + i]))
      .fold((0usize, f32::MIN), |best, cur| {
        if cur.1 > best.1 { cur } else { best }
      });

    if score <= params.score_threshold {
      continue;
    }

    let cx = output[i];
    let cy = output[proposals + i];
    let w = output[2 * proposals + i];
    let h = output[3 * proposals + i];

    let x_min = ((cx - w / 2.0) * geometry.scale_x()).clamp(0.0, geometry.frame_width);
    let y_min = ((cy - h / 2.0) * geometry.scale_y()).clamp(0.0, geometry.frame_height);
    let x_max = ((cx + w / 2.0) * geometry.scale_x()).clamp(0.0, geometry.frame_width);
    let y_max = ((cy + h / 2.0) * geometry.scale_y()).clamp(0.0, geometry.frame_height);

    if x_min >= x_max || y_min >= y_max {
      continue;
    }

    candidates.push(DetectItem {
      class_id: class_id as u32,
      score,
      bbox: [x_min, y_min, x_max, y_max],
    });
  }

  let items = non_max_suppression(candidates, params.nms_threshold);
  debug!("检测到 {} 个物体", items.len());
  DetectResult::from(items)
}
