// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/category.rs - 物品类别表
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

//! 检测类别 ID 到展示类别、类别到展示颜色的静态映射。

use std::{cmp::Ordering, fmt, str::FromStr};

use image::Rgb;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::info;

use crate::color::{WHITE, hex_to_rgb};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
  Furniture,
  Electronics,
  Kitchen,
  OfficeDecor,
  Living,
  /// 兜底类别，不在检测白名单内
  Other,
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("未知类别: {0}")]
pub struct UnknownCategory(pub String);

impl Category {
  /// 可用于过滤的类别，按切换顺序排列
  pub const FILTERABLE: [Category; 5] = [
    Category::Furniture,
    Category::Electronics,
    Category::Kitchen,
    Category::OfficeDecor,
    Category::Living,
  ];

  pub fn name(&self) -> &'static str {
    match self {
      Category::Furniture => "Furniture",
      Category::Electronics => "Electronics",
      Category::Kitchen => "Kitchen",
      Category::OfficeDecor => "Office/Decor",
      Category::Living => "Living",
      Category::Other => "Other",
    }
  }

  pub fn color_hex(&self) -> &'static str {
    match self {
      Category::Furniture => "#4CAF50",
      Category::Electronics => "#2196F3",
      Category::Kitchen => "#FFEB3B",
      Category::OfficeDecor => "#9C27B0",
      Category::Living => "#FF9800",
      Category::Other => "#FFFFFF",
    }
  }

  pub fn color(&self) -> Rgb<u8> {
    hex_to_rgb(self.color_hex()).unwrap_or(WHITE)
  }
}

impl fmt::Display for Category {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for Category {
  type Err = UnknownCategory;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Category::FILTERABLE
      .into_iter()
      .chain([Category::Other])
      .find(|category| category.name().eq_ignore_ascii_case(s))
      .ok_or_else(|| UnknownCategory(s.to_string()))
  }
}

// 汇总与 JSON 输出都按类别名称排序
impl Ord for Category {
  fn cmp(&self, other: &Self) -> Ordering {
    self.name().cmp(other.name())
  }
}

impl PartialOrd for Category {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Serialize for Category {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(self.name())
  }
}

/// 关注的检测类别：(COCO 类别 ID, 显示名称, 所属类别)
const ITEMS_OF_INTEREST: [(u32, &str, Category); 31] = [
  (56, "chair", Category::Furniture),
  (57, "couch", Category::Furniture),
  (59, "bed", Category::Furniture),
  (60, "dining table", Category::Furniture),
  (62, "tv/monitor", Category::Electronics),
  (63, "laptop", Category::Electronics),
  (64, "mouse", Category::Electronics),
  (65, "remote", Category::Electronics),
  (66, "keyboard", Category::Electronics),
  (67, "cell phone", Category::Electronics),
  (39, "bottle", Category::Kitchen),
  (40, "wine glass", Category::Kitchen),
  (41, "cup", Category::Kitchen),
  (42, "fork", Category::Kitchen),
  (43, "knife", Category::Kitchen),
  (44, "spoon", Category::Kitchen),
  (45, "bowl", Category::Kitchen),
  (46, "banana", Category::Kitchen),
  (47, "apple", Category::Kitchen),
  (49, "orange", Category::Kitchen),
  (58, "potted plant", Category::OfficeDecor),
  (73, "book", Category::OfficeDecor),
  (74, "clock", Category::OfficeDecor),
  (75, "vase", Category::OfficeDecor),
  (76, "scissors", Category::OfficeDecor),
  (0, "person", Category::Living),
  (15, "cat", Category::Living),
  (16, "dog", Category::Living),
  (24, "backpack", Category::Living),
  (26, "handbag", Category::Living),
  (28, "suitcase", Category::Living),
];

fn lookup(class_id: u32) -> Option<&'static (u32, &'static str, Category)> {
  ITEMS_OF_INTEREST.iter().find(|(id, _, _)| *id == class_id)
}

/// 类别查询对任何 ID 都有结果，白名单外的 ID 归入 `Other`
pub fn category_of(class_id: u32) -> Category {
  lookup(class_id)
    .map(|(_, _, category)| *category)
    .unwrap_or(Category::Other)
}

pub fn label_of(class_id: u32) -> Option<&'static str> {
  lookup(class_id).map(|(_, label, _)| *label)
}

pub fn items_in(category: Category) -> impl Iterator<Item = (u32, &'static str)> {
  ITEMS_OF_INTEREST
    .iter()
    .filter(move |(_, _, c)| *c == category)
    .map(|(id, label, _)| (*id, *label))
}

pub fn item_count() -> usize {
  ITEMS_OF_INTEREST.len()
}

/// 启动时打印可检测的物品清单
pub fn log_catalog() {
  info!("可检测 {} 种物品:", item_count());
  for category in Category::FILTERABLE {
    let labels = items_in(category)
      .map(|(_, label)| label)
      .collect::<Vec<_>>()
      .join(", ");
    info!("  {}: {}", category, labels);
  }
}
