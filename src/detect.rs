// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/detect.rs - 检测结果、检测器与类别过滤
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

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer, ser::SerializeStruct};
use tracing::{debug, error};

use crate::{
  category::{self, Category, UnknownCategory},
  frame::Frame,
  model::{DetectItem, DetectResult, Model},
};

/// 默认置信度阈值，严格大于才保留
pub const DEFAULT_CONFIDENCE: f32 = 0.4;

/// 像素坐标框，保证 `x1 < x2` 且 `y1 < y2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "[i32; 4]")]
pub struct BoundingBox {
  x1: i32,
  y1: i32,
  x2: i32,
  y2: i32,
}

impl BoundingBox {
  pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Option<Self> {
    (x1 < x2 && y1 < y2).then_some(Self { x1, y1, x2, y2 })
  }

  /// 截断为整数像素，与常见绘制库的取整方式一致
  pub fn from_pixels(bbox: &[f32; 4]) -> Option<Self> {
    if bbox.iter().any(|v| !v.is_finite()) {
      return None;
    }
    Self::new(
      bbox[0] as i32,
      bbox[1] as i32,
      bbox[2] as i32,
      bbox[3] as i32,
    )
  }

  pub fn x1(&self) -> i32 {
    self.x1
  }

  pub fn y1(&self) -> i32 {
    self.y1
  }

  pub fn x2(&self) -> i32 {
    self.x2
  }

  pub fn y2(&self) -> i32 {
    self.y2
  }

  pub fn width(&self) -> u32 {
    (self.x2 - self.x1) as u32
  }

  pub fn height(&self) -> u32 {
    (self.y2 - self.y1) as u32
  }
}

impl From<BoundingBox> for [i32; 4] {
  fn from(b: BoundingBox) -> Self {
    [b.x1, b.y1, b.x2, b.y2]
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub label: String,
  pub category: Category,
  pub confidence: f32,
  pub bounding_box: BoundingBox,
}

impl Detection {
  /// 白名单外、置信度越界或框退化的结果返回 `None`
  pub fn from_item(item: &DetectItem) -> Option<Self> {
    let label = category::label_of(item.class_id)?;
    if !(0.0..=1.0).contains(&item.score) {
      return None;
    }
    Some(Self {
      label: label.to_string(),
      category: category::category_of(item.class_id),
      confidence: item.score,
      bounding_box: BoundingBox::from_pixels(&item.bbox)?,
    })
  }

  pub fn caption(&self) -> String {
    format!("{}: {:.2}", self.label, self.confidence)
  }
}

impl Serialize for Detection {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut s = serializer.serialize_struct("Detection", 5)?;
    s.serialize_field("name", &self.label)?;
    s.serialize_field("category", &self.category)?;
    s.serialize_field("confidence", &round2(self.confidence))?;
    s.serialize_field("bbox", &self.bounding_box)?;
    s.serialize_field("color", self.category.color_hex())?;
    s.end()
  }
}

fn round2(value: f32) -> f64 {
  (value as f64 * 100.0).round() / 100.0
}

/// 类别过滤状态：`None` 表示关闭
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Filter(Option<Category>);

impl Filter {
  pub const OFF: Filter = Filter(None);

  pub fn only(category: Category) -> Self {
    Filter(Some(category))
  }

  pub fn category(&self) -> Option<Category> {
    self.0
  }

  pub fn is_off(&self) -> bool {
    self.0.is_none()
  }

  /// 关闭 → 各类别依次 → 关闭
  pub fn cycle(self) -> Self {
    let order = &Category::FILTERABLE;
    match self.0 {
      None => Filter(Some(order[0])),
      Some(current) => {
        let next = order
          .iter()
          .position(|c| *c == current)
          .and_then(|i| order.get(i + 1));
        Filter(next.copied())
      }
    }
  }

  /// 接受可过滤的类别名或 `all`，兜底的 `Other` 不可选
  pub fn parse(name: &str) -> Result<Self, UnknownCategory> {
    if name.eq_ignore_ascii_case("all") {
      return Ok(Filter::OFF);
    }
    match name.parse::<Category>() {
      Ok(category) if Category::FILTERABLE.contains(&category) => Ok(Filter::only(category)),
      _ => Err(UnknownCategory(name.to_string())),
    }
  }

  pub fn matches(&self, detection: &Detection) -> bool {
    self.0.is_none_or(|c| c == detection.category)
  }

  pub fn apply(&self, detections: Vec<Detection>) -> Vec<Detection> {
    detections.into_iter().filter(|d| self.matches(d)).collect()
  }
}

impl fmt::Display for Filter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.0 {
      Some(category) => write!(f, "{}", category),
      None => f.write_str("OFF"),
    }
  }
}

impl Serialize for Filter {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self.0 {
      Some(category) => category.serialize(serializer),
      None => serializer.serialize_none(),
    }
  }
}

pub fn category_counts(detections: &[Detection]) -> BTreeMap<Category, usize> {
  let mut counts = BTreeMap::new();
  for d in detections {
    *counts.entry(d.category).or_insert(0) += 1;
  }
  counts
}

pub fn group_by_category(detections: &[Detection]) -> BTreeMap<Category, Vec<&Detection>> {
  let mut groups: BTreeMap<Category, Vec<&Detection>> = BTreeMap::new();
  for d in detections {
    groups.entry(d.category).or_default().push(d);
  }
  groups
}

/// 包装模型：置信度阈值 + 类别白名单
pub struct Detector<M> {
  model: M,
  confidence: f32,
}

impl<M> Detector<M>
where
  M: Model<Input = Frame, Output = DetectResult>,
  M::Error: fmt::Display,
{
  pub fn new(model: M) -> Self {
    Self {
      model,
      confidence: DEFAULT_CONFIDENCE,
    }
  }

  pub fn with_confidence(mut self, confidence: f32) -> Self {
    self.confidence = confidence;
    self
  }

  pub fn confidence(&self) -> f32 {
    self.confidence
  }

  pub fn detect(&self, frame: &Frame) -> Result<Vec<Detection>, M::Error> {
    let result = self.model.infer(frame)?;
    let detections: Vec<Detection> = result
      .iter()
      .filter(|item| item.score > self.confidence)
      .filter_map(Detection::from_item)
      .collect();
    debug!(
      "帧 {}: 模型输出 {} 个目标, 保留 {} 个",
      frame.index,
      result.len(),
      detections.len()
    );
    Ok(detections)
  }

  /// 推理失败只记录日志，本帧视为没有检测结果
  pub fn detect_or_empty(&self, frame: &Frame) -> Vec<Detection> {
    self.detect(frame).unwrap_or_else(|e| {
      error!("帧 {} 推理失败: {}", frame.index, e);
      Vec::new()
    })
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use std::cell::Cell;

  use image::RgbImage;
  use thiserror::Error;

  use super::*;

  #[derive(Error, Debug)]
  #[error("模拟推理错误")]
  pub struct StubError;

  /// 每次都返回同一组结果的模型，`fail` 为真时推理失败
  pub struct StubModel {
    pub items: Vec<DetectItem>,
    pub fail: bool,
    pub calls: Cell<usize>,
  }

  impl StubModel {
    pub fn returning(items: Vec<DetectItem>) -> Self {
      Self {
        items,
        fail: false,
        calls: Cell::new(0),
      }
    }

    pub fn failing() -> Self {
      Self {
        items: Vec::new(),
        fail: true,
        calls: Cell::new(0),
      }
    }
  }

  impl Model for StubModel {
    type Input = Frame;
    type Output = DetectResult;
    type Error = StubError;

    fn infer(&self, _input: &Frame) -> Result<DetectResult, StubError> {
      self.calls.set(self.calls.get() + 1);
      if self.fail {
        return Err(StubError);
      }
      Ok(DetectResult::from(self.items.clone()))
    }
  }

  pub fn item(class_id: u32, score: f32, bbox: [f32; 4]) -> DetectItem {
    DetectItem {
      class_id,
      score,
      bbox,
    }
  }

  pub fn detection(label: &str, category: Category) -> Detection {
    Detection {
      label: label.to_string(),
      category,
      confidence: 0.8,
      bounding_box: BoundingBox::new(10, 10, 50, 50).unwrap(),
    }
  }

  fn frame() -> Frame {
    Frame::new(1, RgbImage::new(64, 64))
  }

  #[test]
  fn chair_becomes_furniture_detection() {
    let detector = Detector::new(StubModel::returning(vec![item(
      56,
      0.8,
      [10.0, 10.0, 50.0, 50.0],
    )]));
    let detections = detector.detect(&frame()).unwrap();
    assert_eq!(
      detections,
      vec![Detection {
        label: "chair".to_string(),
        category: Category::Furniture,
        confidence: 0.8,
        bounding_box: BoundingBox::new(10, 10, 50, 50).unwrap(),
      }]
    );
  }

  #[test]
  fn drops_uninteresting_and_weak_items() {
    let detector = Detector::new(StubModel::returning(vec![
      item(2, 0.95, [0.0, 0.0, 10.0, 10.0]),
      item(56, 0.4, [0.0, 0.0, 10.0, 10.0]),
      item(63, 0.41, [0.0, 0.0, 10.0, 10.0]),
      item(79, 0.9, [0.0, 0.0, 10.0, 10.0]),
    ]));
    let detections = detector.detect(&frame()).unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].label, "laptop");
    for d in &detections {
      assert!(d.confidence > DEFAULT_CONFIDENCE);
      assert!(d.bounding_box.x1() < d.bounding_box.x2());
      assert!(d.bounding_box.y1() < d.bounding_box.y2());
    }
  }

  #[test]
  fn drops_degenerate_and_invalid_boxes() {
    let detector = Detector::new(StubModel::returning(vec![
      item(56, 0.9, [10.0, 10.0, 10.5, 50.0]),
      item(56, 0.9, [f32::NAN, 10.0, 20.0, 50.0]),
      item(56, 1.5, [10.0, 10.0, 20.0, 50.0]),
    ]));
    assert!(detector.detect(&frame()).unwrap().is_empty());
  }

  #[test]
  fn inference_error_becomes_empty_set() {
    let detector = Detector::new(StubModel::failing());
    assert!(detector.detect(&frame()).is_err());
    assert!(detector.detect_or_empty(&frame()).is_empty());
  }

  #[test]
  fn filter_cycle_wraps_after_all_categories() {
    let start = Filter::OFF;
    let mut filter = start;
    let mut seen = Vec::new();
    for _ in 0..Category::FILTERABLE.len() + 1 {
      filter = filter.cycle();
      seen.push(filter);
    }
    assert_eq!(filter, start);
    assert_eq!(seen[0], Filter::only(Category::Furniture));
    assert_eq!(seen[4], Filter::only(Category::Living));

    let from_kitchen = Filter::only(Category::Kitchen);
    let mut f = from_kitchen;
    for _ in 0..Category::FILTERABLE.len() + 1 {
      f = f.cycle();
    }
    assert_eq!(f, from_kitchen);
  }

  #[test]
  fn filter_excludes_other_categories() {
    let detections = vec![
      detection("chair", Category::Furniture),
      detection("bed", Category::Furniture),
    ];
    assert!(
      Filter::only(Category::Electronics)
        .apply(detections.clone())
        .is_empty()
    );
    assert_eq!(Filter::OFF.apply(detections.clone()).len(), 2);
    assert_eq!(Filter::only(Category::Furniture).apply(detections).len(), 2);
  }

  #[test]
  fn filter_parses_names_and_all() {
    assert_eq!(Filter::parse("all"), Ok(Filter::OFF));
    assert_eq!(
      Filter::parse("Office/Decor"),
      Ok(Filter::only(Category::OfficeDecor))
    );
    assert!(Filter::parse("Garage").is_err());
    assert_eq!(
      Filter::parse("Other"),
      Err(UnknownCategory("Other".to_string()))
    );
  }

  #[test]
  fn counts_sum_to_total() {
    let detections = vec![
      detection("chair", Category::Furniture),
      detection("laptop", Category::Electronics),
      detection("cup", Category::Kitchen),
      detection("bed", Category::Furniture),
    ];
    let counts = category_counts(&detections);
    assert_eq!(counts.values().sum::<usize>(), detections.len());
    assert_eq!(counts[&Category::Furniture], 2);
    assert_eq!(group_by_category(&detections)[&Category::Electronics].len(), 1);
  }

  #[test]
  fn serializes_like_the_web_api() {
    let mut d = detection("chair", Category::Furniture);
    d.confidence = 0.8347;
    let value = serde_json::to_value(&d).unwrap();
    assert_eq!(
      value,
      serde_json::json!({
        "name": "chair",
        "category": "Furniture",
        "confidence": 0.83,
        "bbox": [10, 10, 50, 50],
        "color": "#4CAF50",
      })
    );
    assert_eq!(serde_json::to_value(Filter::OFF).unwrap(), serde_json::Value::Null);
  }
}
