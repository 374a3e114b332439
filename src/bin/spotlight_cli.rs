// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/bin/spotlight_cli.rs - 交互式摄像头检测
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use url::Url;

use spotlight::{
  FromUrl,
  category::log_catalog,
  input::{CaptureSource, InputWrapper},
  model::Yolov8Builder,
  output::{ScreenshotWriter, WindowOutput, draw::Draw},
  task::{InteractiveTask, Task, interrupt_channel},
};

/// SpotLight 交互式检测参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型，如 onnx:///models/yolov8m.onnx
  #[arg(long, env = "SPOTLIGHT_MODEL", value_name = "MODEL")]
  pub model: Url,

  /// 输入来源，如 v4l:///dev/video0?width=640&height=480&fps=30 或 image:///path.jpg
  #[arg(
    long,
    env = "SPOTLIGHT_INPUT",
    value_name = "SOURCE",
    default_value = "v4l:///dev/video0?width=640&height=480&fps=30"
  )]
  pub input: Url,

  /// 置信度阈值 (0.0 - 1.0)，严格大于才保留
  #[arg(long, env = "SPOTLIGHT_CONFIDENCE", default_value_t = 0.4, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, env = "SPOTLIGHT_NMS_THRESHOLD", default_value_t = 0.45, value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 截图保存目录
  #[arg(long, env = "SPOTLIGHT_OUTPUT_DIR", default_value = ".", value_name = "DIR")]
  pub output_dir: PathBuf,

  /// 处理指定帧数后退出，默认不限
  #[arg(long, value_name = "FRAME_NUMBER")]
  pub frame_number: Option<u64>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("spotlight=info,spotlight_cli=info")),
    )
    .init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("置信度阈值: {}", args.confidence);
  log_catalog();

  let model = Yolov8Builder::from_url(&args.model)?
    .nms_threshold(args.nms_threshold)
    .build()
    .context("无法加载模型")?;
  let input = InputWrapper::from_url(&args.input).context("无法打开输入源")?;
  let window = WindowOutput::new("SpotLight", input.width(), input.height())
    .context("无法创建预览窗口")?;

  info!("按键: SPACE 检测一次, C 连续检测, F 切换过滤, S 截图, Q/ESC 退出");

  InteractiveTask::new(Draw::new()?, ScreenshotWriter::cli(args.output_dir))
    .with_confidence(args.confidence)
    .with_frame_number(args.frame_number)
    .with_interrupt(interrupt_channel()?)
    .run_task(input, model, window)
}
