// 该文件是 SpotLight （聚光灯） 项目的一部分。
// src/server/page.rs - 网页界面
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

use crate::category::Category;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>SpotLight</title>
<style>
  body { font-family: sans-serif; background: #1e1e1e; color: #eee; margin: 0; padding: 16px; }
  main { display: flex; gap: 16px; flex-wrap: wrap; }
  #stream { border: 2px solid #444; max-width: 100%; }
  button { margin: 2px; padding: 6px 12px; border: 0; border-radius: 4px; cursor: pointer; }
  .panel { background: #2a2a2a; padding: 12px; border-radius: 6px; min-width: 280px; }
  .item { padding: 2px 0; }
  .swatch { display: inline-block; width: 10px; height: 10px; margin-right: 6px; }
</style>
</head>
<body>
<h1>SpotLight</h1>
<main>
  <div><img id="stream" src="/video_feed" alt="video stream"></div>
  <div class="panel">
    <div>
      <button onclick="post('/detect')">Detect</button>
      <button id="continuous" onclick="toggleContinuous()">Continuous: OFF</button>
      <button onclick="screenshot()">Screenshot</button>
    </div>
    <h3>Filter</h3>
    <div>
      <button onclick="setFilter('all')">All</button>
"#;

const PAGE_TAIL: &str = r#"    </div>
    <p id="filter">Filter: none</p>
    <h3>Detections</h3>
    <div id="detections"></div>
    <h3>Stats</h3>
    <div id="stats"></div>
    <p id="message"></p>
  </div>
</main>
<script>
async function post(path) {
  const response = await fetch(path, { method: 'POST' });
  return response.json();
}
async function toggleContinuous() {
  const data = await post('/toggle_continuous');
  document.getElementById('continuous').textContent = 'Continuous: ' + (data.continuous ? 'ON' : 'OFF');
}
async function setFilter(name) {
  const data = await post('/set_filter/' + name);
  document.getElementById('filter').textContent = 'Filter: ' + (data.filter || data.error || 'none');
}
async function screenshot() {
  const data = await post('/save_screenshot');
  document.getElementById('message').textContent = data.filename ? 'Saved ' + data.filename : data.error;
}
async function refresh() {
  try {
    const data = await (await fetch('/get_detections')).json();
    document.getElementById('detections').innerHTML = data.detections.map(d =>
      '<div class="item"><span class="swatch" style="background:' + d.color + '"></span>' +
      d.name + ' (' + d.category + ') ' + d.confidence.toFixed(2) + '</div>').join('');
    const history = data.stats.detection_history.map(h =>
      '<div class="item">' + h.timestamp + ': ' + h.count + ' [' + h.items.join(', ') + ']</div>').join('');
    document.getElementById('stats').innerHTML =
      '<div>FPS: ' + data.stats.fps.toFixed(1) + '</div>' +
      '<div>Total: ' + data.stats.total_detections + '</div>' + history;
  } catch (e) {
    console.error(e);
  }
}
setInterval(refresh, 1000);
</script>
</body>
</html>
"#;

/// 首页：视频流与控制按钮，过滤按钮由类别表生成
pub fn render() -> String {
  let mut page = String::from(PAGE_HEAD);
  for category in Category::FILTERABLE {
    page.push_str(&format!(
      "      <button style=\"background:{}\" onclick=\"setFilter('{}')\">{}</button>\n",
      category.color_hex(),
      urlencoding::encode(category.name()),
      category.name()
    ));
  }
  page.push_str(PAGE_TAIL);
  page
}
