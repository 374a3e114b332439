// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/model/yolov8.rs - YOLOv8 ONNX 模型
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

use image::imageops::{self, FilterType};
use thiserror::Error;
use tract_onnx::prelude::*;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  model::{
    COCO_LABELS, DetectResult, Model,
    postprocess::{DecodeParams, FrameGeometry, decode_yolov8},
  },
  url_file_path,
};

const YOLOV8_INPUT_SIZE: u32 = 640;
const YOLOV8_SCORE_THRESH: f32 = 0.25;
const YOLOV8_NMS_THRESH: f32 = 0.45;

type Plan = TypedRunnableModel<TypedModel>;

pub struct Yolov8 {
  plan: Plan,
  input_size: u32,
  params: DecodeParams,
}

#[derive(Error, Debug)]
pub enum Yolov8Error {
  #[error("模型加载错误: {0}")]
  ModelLoadError(std::io::Error),
  #[error("模型无效: {0}, 错误: {1}")]
  ModelInvalid(String, TractError),
  #[error("推理错误: {0}")]
  InferenceError(TractError),
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
}

impl Yolov8Error {
  pub fn invalid(msg: &str, e: TractError) -> Self {
    Yolov8Error::ModelInvalid(msg.to_string(), e)
  }
}

pub struct Yolov8Builder {
  model_path: String,
  input_size: u32,
  nms_threshold: f32,
}

impl FromUrlWithScheme for Yolov8Builder {
  const SCHEME: &'static str = "onnx";
}

impl FromUrl for Yolov8Builder {
  type Error = Yolov8Error;

  /// `onnx:///path/to/yolov8m.onnx?size=640`
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(Yolov8Error::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let model_path = url_file_path(url);
    if model_path.is_empty() {
      return Err(Yolov8Error::ModelPathError("模型路径为空".to_string()));
    }

    let mut input_size = YOLOV8_INPUT_SIZE;
    for (k, v) in url.query_pairs() {
      if k == "size" {
        input_size = v
          .parse()
          .ok()
          .filter(|size| *size > 0)
          .ok_or_else(|| Yolov8Error::ModelPathError(format!("输入尺寸无效: {}", v)))?;
      }
    }

    Ok(Yolov8Builder {
      model_path,
      input_size,
      nms_threshold: YOLOV8_NMS_THRESH,
    })
  }
}

impl Yolov8Builder {
  pub fn nms_threshold(mut self, threshold: f32) -> Self {
    self.nms_threshold = threshold;
    self
  }

  pub fn build(self) -> Result<Yolov8, Yolov8Error> {
    info!("加载模型文件: {}", self.model_path);
    let model_data = std::fs::read(&self.model_path).map_err(Yolov8Error::ModelLoadError)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    let size = self.input_size as usize;
    let plan = tract_onnx::onnx()
      .model_for_read(&mut model_data.as_slice())
      .map_err(|e| Yolov8Error::invalid("无法解析 ONNX 模型", e))?
      .with_input_fact(0, f32::fact([1, 3, size, size]).into())
      .map_err(|e| Yolov8Error::invalid("无法设置模型输入形状", e))?
      .into_optimized()
      .map_err(|e| Yolov8Error::invalid("无法优化模型", e))?
      .into_runnable()
      .map_err(|e| Yolov8Error::invalid("无法构建推理计划", e))?;
    info!("模型加载完成");

    Ok(Yolov8 {
      plan,
      input_size: self.input_size,
      params: DecodeParams {
        num_classes: COCO_LABELS.len(),
        score_threshold: YOLOV8_SCORE_THRESH,
        nms_threshold: self.nms_threshold,
      },
    })
  }
}

impl Yolov8 {
  fn build_input(&self, frame: &Frame) -> Tensor {
    let size = self.input_size;
    let resized = imageops::resize(&frame.image, size, size, FilterType::Triangle);
    let raw = resized.as_raw();
    let size = size as usize;

    tract_ndarray::Array4::from_shape_fn((1, 3, size, size), |(_, c, y, x)| {
      raw[(y * size + x) * 3 + c] as f32 / 255.0
    })
    .into_tensor()
  }
}

impl Model for Yolov8 {
  type Input = Frame;
  type Output = DetectResult;
  type Error = Yolov8Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    debug!("设置模型输入");
    let tensor = self.build_input(input);

    debug!("执行模型推理");
    let outputs = self
      .plan
      .run(tvec!(tensor.into()))
      .map_err(Yolov8Error::InferenceError)?;

    debug!("获取模型输出");
    let output = outputs
      .first()
      .ok_or_else(|| Yolov8Error::InferenceError(anyhow::anyhow!("模型没有输出")))?;
    let view = output
      .to_array_view::<f32>()
      .map_err(Yolov8Error::InferenceError)?;
    let data: Vec<f32> = view.iter().copied().collect();

    let geometry = FrameGeometry::new(self.input_size, input.width(), input.height());
    Ok(decode_yolov8(&data, geometry, self.params))
  }
}
