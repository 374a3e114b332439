//! 网页接口集成测试
#![cfg(feature = "web")]

use axum::{
  Router,
  body::{Body, to_bytes},
  http::{Request, StatusCode, header},
};
use image::{Rgb, RgbImage};
use serde_json::Value;
use tower::ServiceExt;

use spotlight::{
  input::ImageFileInput,
  model::{DetectItem, DetectResult, Model},
  frame::Frame,
  output::{ScreenshotWriter, draw::Draw},
  server::{AppState, CaptureWorker, FrameSink, WorkerSettings, create_router},
};

/// 固定返回一台笔记本电脑
struct LaptopModel;

impl Model for LaptopModel {
  type Input = Frame;
  type Output = DetectResult;
  type Error = std::convert::Infallible;

  fn infer(&self, _input: &Frame) -> Result<DetectResult, Self::Error> {
    Ok(DetectResult::from(vec![DetectItem {
      class_id: 63,
      score: 0.91,
      bbox: [4.0, 6.0, 40.0, 30.0],
    }]))
  }
}

fn setup(dir: &std::path::Path) -> (AppState, FrameSink, Router) {
  let (state, sink) = AppState::new(ScreenshotWriter::web(dir));
  let app = create_router(state.clone());
  (state, sink, app)
}

fn still() -> RgbImage {
  RgbImage::from_pixel(64, 48, Rgb([40, 80, 120]))
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Vec<u8>) {
  let response = app
    .clone()
    .oneshot(
      Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap(),
    )
    .await
    .unwrap();
  let status = response.status();
  let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  (status, body.to_vec())
}

async fn send_json(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
  let (status, body) = send(app, method, uri).await;
  (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn index_serves_the_page() {
  let dir = tempfile::tempdir().unwrap();
  let (_state, _sink, app) = setup(dir.path());

  let (status, body) = send(&app, "GET", "/").await;
  assert_eq!(status, StatusCode::OK);
  let html = String::from_utf8(body).unwrap();
  assert!(html.contains("/video_feed"));
}

#[tokio::test]
async fn detect_and_toggle_report_their_state() {
  let dir = tempfile::tempdir().unwrap();
  let (state, _sink, app) = setup(dir.path());

  let (status, body) = send_json(&app, "POST", "/detect").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "detection_triggered");
  assert!(state.session().wants_detection());

  let (_, body) = send_json(&app, "POST", "/toggle_continuous").await;
  assert_eq!(body["continuous"], true);
  let (_, body) = send_json(&app, "POST", "/toggle_continuous").await;
  assert_eq!(body["continuous"], false);
  assert!(!state.session().wants_detection());
}

#[tokio::test]
async fn set_filter_accepts_categories_and_all() {
  let dir = tempfile::tempdir().unwrap();
  let (_state, _sink, app) = setup(dir.path());

  let (status, body) = send_json(&app, "POST", "/set_filter/Kitchen").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["filter"], "Kitchen");

  let (status, body) = send_json(&app, "POST", "/set_filter/Office/Decor").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["filter"], "Office/Decor");

  let (status, body) = send_json(&app, "POST", "/set_filter/all").await;
  assert_eq!(status, StatusCode::OK);
  assert!(body["filter"].is_null());
}

#[tokio::test]
async fn set_filter_rejects_unknown_category() {
  let dir = tempfile::tempdir().unwrap();
  let (state, _sink, app) = setup(dir.path());
  send_json(&app, "POST", "/set_filter/Living").await;

  let (status, body) = send_json(&app, "POST", "/set_filter/Garage").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("Garage"));
  // 原过滤器不变
  assert_eq!(state.session().filter().to_string(), "Living");
}

#[tokio::test]
async fn set_filter_rejects_the_fallback_category() {
  let dir = tempfile::tempdir().unwrap();
  let (state, _sink, app) = setup(dir.path());

  let (status, body) = send_json(&app, "POST", "/set_filter/Other").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("Other"));
  assert!(state.session().filter().is_off());
}

#[tokio::test]
async fn detections_start_empty() {
  let dir = tempfile::tempdir().unwrap();
  let (_state, _sink, app) = setup(dir.path());

  let (status, body) = send_json(&app, "GET", "/get_detections").await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["detections"], serde_json::json!([]));
  assert_eq!(body["category_counts"], serde_json::json!({}));
  assert_eq!(body["stats"]["total_detections"], 0);
  assert_eq!(body["timestamp"].as_str().unwrap().len(), 8);
}

#[tokio::test]
async fn triggered_pass_shows_up_in_detections() {
  let dir = tempfile::tempdir().unwrap();
  let (_state, sink, app) = setup(dir.path());
  send_json(&app, "POST", "/detect").await;

  // 单帧输入，读完即退出
  CaptureWorker::new(
    ImageFileInput::from_image(still(), true),
    LaptopModel,
    Draw::new().unwrap(),
    sink,
    WorkerSettings::default(),
  )
  .run();

  let (_, body) = send_json(&app, "GET", "/get_detections").await;
  let detections = body["detections"].as_array().unwrap();
  assert_eq!(detections.len(), 1);
  assert_eq!(detections[0]["name"], "laptop");
  assert_eq!(detections[0]["category"], "Electronics");
  assert_eq!(detections[0]["confidence"], 0.91);
  assert_eq!(detections[0]["bbox"], serde_json::json!([4, 6, 40, 30]));
  assert_eq!(body["category_counts"]["Electronics"], 1);
  assert_eq!(body["stats"]["total_detections"], 1);
}

#[tokio::test]
async fn screenshot_needs_a_frame() {
  let dir = tempfile::tempdir().unwrap();
  let (_state, _sink, app) = setup(dir.path());

  let (status, body) = send_json(&app, "POST", "/save_screenshot").await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].is_string());
}

#[tokio::test]
async fn screenshot_writes_latest_frame() {
  let dir = tempfile::tempdir().unwrap();
  let (_state, sink, app) = setup(dir.path());
  sink.publish(still(), vec![0xFF, 0xD8]);

  let (status, body) = send_json(&app, "POST", "/save_screenshot").await;
  assert_eq!(status, StatusCode::OK);
  let filename = body["filename"].as_str().unwrap();
  assert!(filename.starts_with("screenshot_"));
  assert!(filename.ends_with(".jpg"));

  let saved = image::open(dir.path().join(filename)).unwrap();
  assert_eq!((saved.width(), saved.height()), (64, 48));
}

#[tokio::test]
async fn video_feed_streams_multipart_frames() {
  let dir = tempfile::tempdir().unwrap();
  let (_state, sink, app) = setup(dir.path());
  sink.publish(still(), b"JPEG".to_vec());
  // 发布端释放后视频流在最后一帧之后结束
  drop(sink);

  let response = app
    .oneshot(
      Request::builder()
        .uri("/video_feed")
        .body(Body::empty())
        .unwrap(),
    )
    .await
    .unwrap();
  assert_eq!(response.status(), StatusCode::OK);
  assert_eq!(
    response.headers()[header::CONTENT_TYPE],
    "multipart/x-mixed-replace; boundary=frame"
  );

  let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
  assert_eq!(
    &body[..],
    b"--frame\r\nContent-Type: image/jpeg\r\n\r\nJPEG\r\n"
  );
}
