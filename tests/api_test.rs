//! API integration tests.
//!
//! Tests the HTTP control surface against a [`TestHarness`] server running on
//! a random port with an in-memory segment store and fake media backends.

mod common;

use common::{RecordingAssembler, TestHarness, MB, T0};

// ---------------------------------------------------------------------------
// Health and docs
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_200() {
    let (_harness, addr) = TestHarness::with_server().await;
    let url = format!("http://{addr}/health");

    let resp = reqwest::get(&url).await.expect("request failed");
    assert_eq!(resp.status(), 200);

    let body = resp.text().await.unwrap();
    assert_eq!(body, "ok");
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (_harness, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{addr}/openapi.json"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert!(json["paths"]["/frames"]["get"].is_object());
    assert!(json["components"]["schemas"]["StatusResponse"].is_object());
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[tokio::test]
async fn status_of_empty_stopped_buffer() {
    let (_harness, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{addr}/status")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["state"], "stopped");
    assert_eq!(json["running"], false);
    assert_eq!(json["segment_count"], 0);
    assert!(json["oldest_segment"].is_null());
    assert!(json["newest_segment"].is_null());
    assert_eq!(json["max_age_secs"], 1800);
}

#[tokio::test]
async fn status_while_running_reports_segments() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.seed(T0 - 30, 6, 2 * MB).await;
    harness.buffer.start().await.unwrap();

    let json: serde_json::Value = reqwest::get(format!("http://{addr}/status"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(json["state"], "running");
    assert_eq!(json["running"], true);
    assert_eq!(json["segment_count"], 6);
    assert_eq!(json["total_size_bytes"], 12 * MB);
    assert_eq!(json["buffer_seconds"], 25.0);
    assert_eq!(json["covered_seconds"], 30.0);
    assert_eq!(json["oldest_segment"], "2023-11-14T22:12:50Z");
    assert_eq!(json["newest_segment"], "2023-11-14T22:13:15Z");

    harness.buffer.stop().await.unwrap();
}

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

#[tokio::test]
async fn save_defaults_to_thirty_seconds() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.seed(T0 - 60, 12, MB).await;

    let resp = reqwest::get(format!("http://{addr}/save")).await.unwrap();
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["segment_count"], 6);
    assert_eq!(json["size_bytes"], 6 * MB);
    assert_eq!(json["duration_secs"], 30.0);
    let saved = json["saved_path"].as_str().unwrap();
    assert!(saved.contains("saved/recording_"), "saved_path: {saved}");

    assert_eq!(harness.assembler.calls.lock().len(), 1);
}

#[tokio::test]
async fn save_post_with_budget_and_output() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.seed(T0 - 60, 12, MB).await;
    let output = harness.tmp.path().join("clips/incident.mp4");

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/save"))
        .query(&[
            ("seconds", "60"),
            ("size_mb", "4"),
            ("output", output.to_str().unwrap()),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["saved_path"], output.to_str().unwrap());
    assert_eq!(json["segment_count"], 4);

    let calls = harness.assembler.calls.lock();
    let (inputs, out) = &calls[0];
    assert_eq!(out, &output);
    assert_eq!(inputs.len(), 4);
    assert!(inputs[0].ends_with(format!("segment_{}.mp4", T0 - 20)));
}

#[tokio::test]
async fn save_on_empty_buffer_is_404() {
    let (_harness, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{addr}/save?seconds=10"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "no_segments");
    assert_eq!(json["error"], "no segments available");
}

#[tokio::test]
async fn save_with_unsatisfiable_budget_is_404() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.seed(T0 - 60, 12, 2 * MB).await;

    let resp = reqwest::get(format!("http://{addr}/save?size_mb=1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "no_match");
}

#[tokio::test]
async fn save_with_bad_number_is_400() {
    let (_harness, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{addr}/save?seconds=ten"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "validation_error");
}

#[tokio::test]
async fn save_tool_failure_is_502_with_tool_output() {
    let harness = TestHarness::with_assembler(RecordingAssembler {
        fail: true,
        ..RecordingAssembler::default()
    });
    harness.seed(T0 - 60, 12, MB).await;
    let (_harness, addr) = TestHarness::serve(harness).await;

    let resp = reqwest::get(format!("http://{addr}/save?seconds=10"))
        .await
        .unwrap();
    assert_eq!(resp.status(), 502);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "tool_error");
    assert!(json["error"]
        .as_str()
        .unwrap()
        .contains("Invalid data found"));
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

#[tokio::test]
async fn frames_default_offsets() {
    let (harness, addr) = TestHarness::with_server().await;
    // Covers [T0 - 20, T0); "now" is T0 and falls just past the newest segment.
    harness.seed(T0 - 20, 4, MB).await;
    let out_dir = harness.tmp.path().join("stills");

    let resp = reqwest::get(format!(
        "http://{addr}/frames?output_dir={}",
        out_dir.to_str().unwrap()
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    let frames: Vec<String> = serde_json::from_value(json["frames"].clone()).unwrap();
    assert_eq!(
        frames,
        [
            out_dir.join("frame_1_5.0s_ago.jpg").to_string_lossy(),
            out_dir.join("frame_2_10.0s_ago.jpg").to_string_lossy(),
        ]
    );
    assert_eq!(json["missed"], serde_json::json!([0.0]));

    let calls = harness.extractor.calls.lock();
    assert!(calls[0].0.ends_with(format!("segment_{}.mp4", T0 - 5)));
    assert!(calls[1].0.ends_with(format!("segment_{}.mp4", T0 - 10)));
}

#[tokio::test]
async fn frames_with_explicit_offsets_skip_garbage() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.seed(T0 - 20, 4, MB).await;
    harness.clock.advance(std::time::Duration::from_secs(1));
    let out_dir = harness.tmp.path().join("stills");

    let resp = reqwest::get(format!(
        "http://{addr}/frames?seconds_ago=2,abc,3.5,500&output_dir={}",
        out_dir.to_str().unwrap()
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["frames"].as_array().unwrap().len(), 2);
    assert_eq!(json["missed"], serde_json::json!([500.0]));

    // 3.5 s before T0 + 1 lands 2.5 s into the newest segment.
    let calls = harness.extractor.calls.lock();
    assert!((calls[1].1 - 2.5).abs() < 1e-9);
    assert!(calls[1].2.ends_with("frame_1_3.5s_ago.jpg"));
}

#[tokio::test]
async fn frames_with_huge_offset_still_answers() {
    let (harness, addr) = TestHarness::with_server().await;
    harness.seed(T0 - 20, 4, MB).await;
    let out_dir = harness.tmp.path().join("stills");

    let resp = reqwest::get(format!(
        "http://{addr}/frames?seconds_ago=1e13,5&output_dir={}",
        out_dir.to_str().unwrap()
    ))
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["frames"].as_array().unwrap().len(), 1);
    assert_eq!(json["missed"], serde_json::json!([1e13]));
}

#[tokio::test]
async fn frames_on_empty_buffer_is_404() {
    let (_harness, addr) = TestHarness::with_server().await;
    let resp = reqwest::get(format!("http://{addr}/frames")).await.unwrap();
    assert_eq!(resp.status(), 404);
    let json: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(json["code"], "no_segments");
}

// ---------------------------------------------------------------------------
// Tools
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tools_endpoint_lists_ffmpeg() {
    let (_harness, addr) = TestHarness::with_server().await;
    let json: serde_json::Value = reqwest::get(format!("http://{addr}/tools"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, ["ffmpeg", "ffprobe"]);
}
