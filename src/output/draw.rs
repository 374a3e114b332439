// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use ab_glyph::{FontRef, InvalidFont, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use thiserror::Error;

use crate::detect::{Detection, Filter, category_counts};

const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 16.0;
const LABEL_HEIGHT: i32 = 20;
const LABEL_TEXT_PADDING: i32 = 2;
const SUMMARY_FONT_SIZE: f32 = 16.0;
const SUMMARY_LINE_HEIGHT: i32 = 20;
const SUMMARY_BOTTOM_MARGIN: i32 = 10;
const STATUS_FONT_SIZE: f32 = 18.0;
const STATUS_LINE_HEIGHT: i32 = 25;
const STATUS_MARGIN: i32 = 10;
const HINT_FONT_SIZE: f32 = 13.0;
const HINT_BOTTOM_OFFSET: i32 = 120;

const TEXT_WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const STATUS_GREEN: Rgb<u8> = Rgb([0, 255, 0]);
const STATUS_CYAN: Rgb<u8> = Rgb([0, 255, 255]);
const STATUS_MAGENTA: Rgb<u8> = Rgb([255, 0, 255]);
const HINT_GREY: Rgb<u8> = Rgb([200, 200, 200]);

const CONTROLS_HINT: &str = "space:detect c:continuous f:filter s:save q:quit";

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("字体加载错误: {0}")]
  InvalidFont(#[from] InvalidFont),
}

/// 交互模式下叠加在左上角的状态信息
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusOverlay {
  pub fps: f32,
  pub continuous: bool,
  pub filter: Filter,
  pub show_controls: bool,
}

/// 一次绘制需要的全部内容
#[derive(Debug, Clone, Copy, Default)]
pub struct Annotation<'d> {
  pub detections: &'d [Detection],
  pub summary: bool,
  pub status: Option<StatusOverlay>,
}

impl<'d> Annotation<'d> {
  pub fn boxes(detections: &'d [Detection]) -> Self {
    Self {
      detections,
      ..Default::default()
    }
  }
}

pub struct Draw<'a> {
  font: FontRef<'a>,
  label_scale: PxScale,
  summary_scale: PxScale,
  status_scale: PxScale,
  hint_scale: PxScale,
}

impl Draw<'static> {
  pub fn new() -> Result<Self, DrawError> {
    Ok(Self::with_font(FontRef::try_from_slice(FONT_DATA)?))
  }
}

impl<'a> Draw<'a> {
  pub fn with_font(font: FontRef<'a>) -> Self {
    Self {
      font,
      label_scale: PxScale::from(LABEL_FONT_SIZE),
      summary_scale: PxScale::from(SUMMARY_FONT_SIZE),
      status_scale: PxScale::from(STATUS_FONT_SIZE),
      hint_scale: PxScale::from(HINT_FONT_SIZE),
    }
  }

  /// 在帧的副本上绘制，输入图像保持不变
  pub fn annotate(&self, image: &RgbImage, annotation: &Annotation) -> RgbImage {
    let mut canvas = image.clone();
    for detection in annotation.detections {
      self.draw_detection(&mut canvas, detection);
    }
    if annotation.summary {
      self.draw_summary(&mut canvas, annotation.detections);
    }
    if let Some(status) = &annotation.status {
      self.draw_status(&mut canvas, status);
    }
    canvas
  }

  fn draw_detection(&self, canvas: &mut RgbImage, detection: &Detection) {
    let color = detection.category.color();
    let bbox = &detection.bounding_box;

    // 边框加粗为 2 像素
    let outer = Rect::at(bbox.x1(), bbox.y1()).of_size(bbox.width(), bbox.height());
    draw_hollow_rect_mut(canvas, outer, color);
    if bbox.width() > 2 && bbox.height() > 2 {
      let inner =
        Rect::at(bbox.x1() + 1, bbox.y1() + 1).of_size(bbox.width() - 2, bbox.height() - 2);
      draw_hollow_rect_mut(canvas, inner, color);
    }

    let caption = detection.caption();
    let (text_width, _) = text_size(self.label_scale, &self.font, &caption);
    let label_y = (bbox.y1() - LABEL_HEIGHT).max(0);
    let label = Rect::at(bbox.x1(), label_y).of_size(text_width.max(1), LABEL_HEIGHT as u32);
    draw_filled_rect_mut(canvas, label, color);
    draw_text_mut(
      canvas,
      TEXT_WHITE,
      bbox.x1(),
      label_y + LABEL_TEXT_PADDING,
      self.label_scale,
      &self.font,
      &caption,
    );
  }

  /// 底部按类别名称排序的数量汇总，自下而上排列
  fn draw_summary(&self, canvas: &mut RgbImage, detections: &[Detection]) {
    let mut baseline = canvas.height() as i32 - SUMMARY_BOTTOM_MARGIN;
    for (category, count) in category_counts(detections) {
      let text = format!("{}: {}", category, count);
      draw_text_mut(
        canvas,
        category.color(),
        STATUS_MARGIN,
        baseline - SUMMARY_LINE_HEIGHT + 4,
        self.summary_scale,
        &self.font,
        &text,
      );
      baseline -= SUMMARY_LINE_HEIGHT;
    }
  }

  fn draw_status(&self, canvas: &mut RgbImage, status: &StatusOverlay) {
    let mut y = STATUS_MARGIN;
    let mut line = |canvas: &mut RgbImage, color: Rgb<u8>, text: &str| {
      draw_text_mut(
        canvas,
        color,
        STATUS_MARGIN,
        y,
        self.status_scale,
        &self.font,
        text,
      );
      y += STATUS_LINE_HEIGHT;
    };

    line(canvas, STATUS_GREEN, &format!("FPS: {:.1}", status.fps));
    if status.continuous {
      line(canvas, STATUS_GREEN, "Mode: CONTINUOUS");
    } else {
      line(canvas, STATUS_CYAN, "Mode: Press SPACE");
    }
    if !status.filter.is_off() {
      line(canvas, STATUS_MAGENTA, &format!("Filter: {}", status.filter));
    }

    if status.show_controls {
      draw_text_mut(
        canvas,
        HINT_GREY,
        STATUS_MARGIN,
        canvas.height() as i32 - HINT_BOTTOM_OFFSET,
        self.hint_scale,
        &self.font,
        CONTROLS_HINT,
      );
    }
  }
}
