// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/server/handlers.rs - HTTP 处理器
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

use std::convert::Infallible;

use axum::{
  Json,
  body::{Body, Bytes},
  extract::{Path, State},
  http::header,
  response::{Html, IntoResponse, Response},
};
use chrono::Local;
use futures_util::stream;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::{
  detect::Filter,
  output::mjpeg::{CONTENT_TYPE, multipart_part},
  server::{
    error::{ApiError, ApiResult},
    page,
    state::{AppState, DetectionsSnapshot},
  },
};

pub async fn index() -> Html<String> {
  Html(page::render())
}

/// 每个客户端只拿到最新一帧，慢客户端会跳帧
pub async fn video_feed(State(state): State<AppState>) -> Response {
  debug!("新的视频流客户端");
  let frames = stream::unfold(state.frames.clone(), |mut rx| async move {
    loop {
      rx.changed().await.ok()?;
      let jpeg = rx.borrow_and_update().clone();
      if let Some(jpeg) = jpeg {
        let part = Bytes::from(multipart_part(&jpeg));
        return Some((Ok::<_, Infallible>(part), rx));
      }
    }
  });

  (
    [
      (header::CONTENT_TYPE, CONTENT_TYPE),
      (header::CACHE_CONTROL, "no-cache"),
    ],
    Body::from_stream(frames),
  )
    .into_response()
}

pub async fn detect(State(state): State<AppState>) -> Json<Value> {
  state.session().arm();
  Json(json!({ "status": "detection_triggered" }))
}

pub async fn toggle_continuous(State(state): State<AppState>) -> Json<Value> {
  let continuous = state.session().toggle_continuous();
  info!("连续检测: {}", if continuous { "开" } else { "关" });
  Json(json!({ "continuous": continuous }))
}

pub async fn set_filter(
  State(state): State<AppState>,
  Path(category): Path<String>,
) -> ApiResult<Json<Value>> {
  let filter = Filter::parse(category.trim_start_matches('/'))?;
  state.session().set_filter(filter);
  info!("过滤器: {}", filter);
  Ok(Json(json!({ "filter": filter })))
}

pub async fn get_detections(State(state): State<AppState>) -> Json<DetectionsSnapshot> {
  Json(state.session().snapshot(&Local::now()))
}

pub async fn save_screenshot(State(state): State<AppState>) -> ApiResult<Json<Value>> {
  let frame = state
    .latest_frame()
    .ok_or_else(|| ApiError::bad_request("尚未采集到画面"))?;
  let writer = state.screenshots.clone();

  let path = tokio::task::spawn_blocking(move || writer.save(&frame))
    .await
    .map_err(|e| ApiError::internal(format!("保存任务失败: {}", e)))??;

  let filename = path
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| path.display().to_string());
  Ok(Json(json!({ "filename": filename })))
}
