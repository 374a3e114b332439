// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/server/error.rs - HTTP 错误
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
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::{category::UnknownCategory, output::SaveImageFileError};

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  BadRequest(String),
  #[error("{0}")]
  Internal(String),
  #[error("{0}")]
  UnknownCategory(#[from] UnknownCategory),
  #[error("保存截图失败: {0}")]
  Screenshot(#[from] SaveImageFileError),
}

impl ApiError {
  pub fn bad_request(msg: impl Into<String>) -> Self {
    Self::BadRequest(msg.into())
  }

  pub fn internal(msg: impl Into<String>) -> Self {
    Self::Internal(msg.into())
  }

  fn status_code(&self) -> StatusCode {
    match self {
      ApiError::BadRequest(_) | ApiError::UnknownCategory(_) => StatusCode::BAD_REQUEST,
      ApiError::Internal(_) | ApiError::Screenshot(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

#[derive(Serialize)]
struct ErrorResponse {
  error: String,
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status_code();
    let body = ErrorResponse {
      error: self.to_string(),
    };
    (status, Json(body)).into_response()
  }
}
