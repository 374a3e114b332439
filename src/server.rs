// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/server.rs - 网页推流服务
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

//! MJPEG 推流与控制接口。
//!
//! 一个采集线程独占摄像头与模型，通过 `watch` 通道发布最新的 JPEG 帧；
//! HTTP 处理器共享同一个 [`AppState`]。

pub mod error;
pub mod handlers;
mod page;
pub mod routes;
pub mod state;
pub mod worker;

pub use self::error::{ApiError, ApiResult};
pub use self::routes::create_router;
pub use self::state::{AppState, DetectionsSnapshot, FrameSink, Session};
pub use self::worker::{CaptureWorker, WorkerSettings, spawn_worker};
