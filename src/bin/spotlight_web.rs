// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/bin/spotlight_web.rs - 网页推流服务
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::{
  net::{IpAddr, SocketAddr},
  path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use spotlight::{
  FromUrl,
  category::log_catalog,
  input::InputWrapper,
  model::Yolov8Builder,
  output::{ScreenshotWriter, draw::Draw, mjpeg::DEFAULT_QUALITY},
  server::{AppState, WorkerSettings, create_router, spawn_worker},
};

/// SpotLight 网页服务参数
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// ONNX 模型，如 onnx:///models/yolov8m.onnx
  #[arg(long, env = "SPOTLIGHT_MODEL", value_name = "MODEL")]
  pub model: Url,

  /// 输入来源，如 v4l:///dev/video0?width=640&height=480&fps=30
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

  /// 监听地址
  #[arg(long, env = "SPOTLIGHT_HOST", default_value = "0.0.0.0")]
  pub host: IpAddr,

  /// 监听端口
  #[arg(long, env = "SPOTLIGHT_PORT", default_value_t = 8080)]
  pub port: u16,

  /// JPEG 质量 (1 - 100)
  #[arg(long, env = "SPOTLIGHT_JPEG_QUALITY", default_value_t = DEFAULT_QUALITY)]
  pub jpeg_quality: u8,

  /// 截图保存目录
  #[arg(long, env = "SPOTLIGHT_OUTPUT_DIR", default_value = ".", value_name = "DIR")]
  pub output_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("spotlight=info,spotlight_web=info,tower_http=info")),
    )
    .init();

  let args = Args::parse();

  info!("模型文件路径: {}", args.model);
  info!("输入来源: {}", args.input);
  log_catalog();

  let (state, sink) = AppState::new(ScreenshotWriter::web(&args.output_dir));

  let model_url = args.model.clone();
  let input_url = args.input.clone();
  let nms_threshold = args.nms_threshold;
  let worker = spawn_worker(
    move || {
      let model = Yolov8Builder::from_url(&model_url)?
        .nms_threshold(nms_threshold)
        .build()
        .context("无法加载模型")?;
      let input = InputWrapper::from_url(&input_url).context("无法打开输入源")?;
      Ok((input, model))
    },
    Draw::new()?,
    sink,
    WorkerSettings {
      confidence: args.confidence,
      jpeg_quality: args.jpeg_quality,
    },
  )?;

  let addr = SocketAddr::new(args.host, args.port);
  let listener = tokio::net::TcpListener::bind(addr)
    .await
    .with_context(|| format!("无法监听 {}", addr))?;
  info!("服务已启动: http://{}", addr);

  let app = create_router(state.clone());
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal(state))
    .await
    .context("服务运行错误")?;

  info!("等待采集线程退出...");
  if worker.join().is_err() {
    warn!("采集线程异常退出");
  }
  info!("服务已停止");
  Ok(())
}

async fn shutdown_signal(state: AppState) {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!("无法监听中断信号: {}", e);
    std::future::pending::<()>().await;
  }
  info!("收到中断信号，准备退出...");
  state.request_stop();
}
