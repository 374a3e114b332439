// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/server/routes.rs - 路由
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

use axum::{
  Router,
  routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::server::{
  handlers::{
    detect, get_detections, index, save_screenshot, set_filter, toggle_continuous, video_feed,
  },
  state::AppState,
};

pub fn create_router(state: AppState) -> Router {
  Router::new()
    .route("/", get(index))
    .route("/video_feed", get(video_feed))
    .route("/detect", post(detect))
    .route("/toggle_continuous", post(toggle_continuous))
    // 类别名可能含 `/`，如 Office/Decor
    .route("/set_filter/*category", post(set_filter))
    .route("/get_detections", get(get_detections))
    .route("/save_screenshot", post(save_screenshot))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
