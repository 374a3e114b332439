// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/model.rs - 模型
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

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

impl<M: Model + ?Sized> Model for &M {
  type Input = M::Input;
  type Output = M::Output;
  type Error = M::Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    (**self).infer(input)
  }
}

/// 模型原始输出的一个目标
#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // 原图像素坐标 [x_min, y_min, x_max, y_max]
}

impl DetectItem {
  pub fn area(&self) -> f32 {
    (self.bbox[2] - self.bbox[0]).max(0.0) * (self.bbox[3] - self.bbox[1]).max(0.0)
  }

  pub fn iou(&self, other: &DetectItem) -> f32 {
    let ix1 = self.bbox[0].max(other.bbox[0]);
    let iy1 = self.bbox[1].max(other.bbox[1]);
    let ix2 = self.bbox[2].min(other.bbox[2]);
    let iy2 = self.bbox[3].min(other.bbox[3]);
    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    if inter == 0.0 {
      return 0.0;
    }
    inter / (self.area() + other.area() - inter)
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
}

impl DetectResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, DetectItem> {
    self.items.iter()
  }
}

impl From<Vec<DetectItem>> for DetectResult {
  fn from(items: Vec<DetectItem>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

/// 贪心 NMS：按置信度降序保留，抑制同类别中重叠超过阈值的框
pub fn non_max_suppression(mut items: Vec<DetectItem>, iou_threshold: f32) -> Vec<DetectItem> {
  items.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));

  let mut kept: Vec<DetectItem> = Vec::with_capacity(items.len());
  for item in items {
    let suppressed = kept
      .iter()
      .any(|k| k.class_id == item.class_id && k.iou(&item) > iou_threshold);
    if !suppressed {
      kept.push(item);
    }
  }
  kept
}

/// COCO 数据集类别名称
pub const COCO_LABELS: [&str; 80] = [
  "person",
  "bicycle",
  "car",
  "motorcycle",
  "airplane",
  "bus",
  "train",
  "truck",
  "boat",
  "traffic light",
  "fire hydrant",
  "stop sign",
  "parking meter",
  "bench",
  "bird",
  "cat",
  "dog",
  "horse",
  "sheep",
  "cow",
  "elephant",
  "bear",
  "zebra",
  "giraffe",
  "backpack",
  "umbrella",
  "handbag",
  "tie",
  "suitcase",
  "frisbee",
  "skis",
  "snowboard",
  "sports ball",
  "kite",
  "baseball bat",
  "baseball glove",
  "skateboard",
  "surfboard",
  "tennis racket",
  "bottle",
  "wine glass",
  "cup",
  "fork",
  "knife",
  "spoon",
  "bowl",
  "banana",
  "apple",
  "sandwich",
  "orange",
  "broccoli",
  "carrot",
  "hot dog",
  "pizza",
  "donut",
  "cake",
  "chair",
  "couch",
  "potted plant",
  "bed",
  "dining table",
  "toilet",
  "tv",
  "laptop",
  "mouse",
  "remote",
  "keyboard",
  "cell phone",
  "microwave",
  "oven",
  "toaster",
  "sink",
  "refrigerator",
  "book",
  "clock",
  "vase",
  "scissors",
  "teddy bear",
  "hair drier",
  "toothbrush",
];

#[cfg(feature = "model_yolov8")]
mod yolov8;
#[cfg(feature = "model_yolov8")]
pub use self::yolov8::{Yolov8, Yolov8Builder, Yolov8Error};

pub mod postprocess;

#[cfg(test)]
mod tests {
  use super::*;
  use crate::category;

  fn item(class_id: u32, score: f32, bbox: [f32; 4]) -> DetectItem {
    DetectItem {
      class_id,
      score,
      bbox,
    }
  }

  #[test]
  fn iou_of_identical_and_disjoint_boxes() {
    let a = item(0, 0.9, [0.0, 0.0, 10.0, 10.0]);
    let b = item(0, 0.8, [20.0, 20.0, 30.0, 30.0]);
    assert!((a.iou(&a) - 1.0).abs() < 1e-6);
    assert_eq!(a.iou(&b), 0.0);
  }

  #[test]
  fn nms_keeps_best_of_overlapping_boxes_per_class() {
    let items = vec![
      item(56, 0.6, [0.0, 0.0, 10.0, 10.0]),
      item(56, 0.9, [1.0, 1.0, 11.0, 11.0]),
      item(63, 0.5, [1.0, 1.0, 11.0, 11.0]),
      item(56, 0.7, [50.0, 50.0, 60.0, 60.0]),
    ];
    let kept = non_max_suppression(items, 0.45);
    let scores: Vec<f32> = kept.iter().map(|i| i.score).collect();
    assert_eq!(scores, vec![0.9, 0.7, 0.5]);
  }

  #[test]
  fn coco_labels_agree_with_category_table() {
    for (id, label) in COCO_LABELS.iter().enumerate() {
      if let Some(demo_label) = category::label_of(id as u32) {
        // 62 号在演示里显示为 tv/monitor
        assert!(demo_label.starts_with(label), "{} vs {}", demo_label, label);
      }
    }
  }
}
