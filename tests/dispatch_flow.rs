use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

use plotlink::error::{PlotlinkError, Result};
use plotlink::{
    AssetStore, CellValue, DataTable, DispatcherState, Figure, HandleRegistry, HealthStatus,
    RenderSettings, RendererHandle, RendererTransport,
};

/// Renderer transport with a scripted version and probe outcome.
struct ScriptedTransport {
    version: String,
    probe_ok: bool,
}

#[async_trait]
impl RendererTransport for ScriptedTransport {
    fn version(&self) -> Option<&str> {
        Some(&self.version)
    }

    async fn probe(&self) -> Result<()> {
        if self.probe_ok {
            Ok(())
        } else {
            Err(PlotlinkError::unavailable("scripted probe failure"))
        }
    }

    fn shutdown(&self) {}
}

fn transport(version: &str, probe_ok: bool) -> Box<dyn RendererTransport> {
    Box::new(ScriptedTransport {
        version: version.to_string(),
        probe_ok,
    })
}

fn asset_dir() -> (TempDir, AssetStore) {
    let dir = tempfile::tempdir().expect("create asset dir");
    std::fs::write(dir.path().join("plotly.html"), "<html></html>").expect("write plotly.html");
    std::fs::write(dir.path().join("table.html"), "<html></html>").expect("write table.html");
    let store = AssetStore::new(dir.path());
    (dir, store)
}

fn spawn_handle(version: &str, probe_ok: bool) -> (TempDir, HandleRegistry, Arc<RendererHandle>) {
    let (dir, store) = asset_dir();
    let registry = HandleRegistry::new();
    let handle = registry.ensure_with(
        RenderSettings::default(),
        store,
        transport(version, probe_ok),
        true,
    );
    (dir, registry, handle)
}

#[tokio::test]
async fn figure_flow_produces_a_complete_wire_mapping() {
    let (_dir, _registry, handle) = spawn_handle("0.6.0", true);
    assert_eq!(handle.check_health().await, HealthStatus::Active);

    let mut figure = Figure::from_json(
        r#"{"data": [{"type": "scatter"}], "layout": {"height": 500, "title": {"text": "<b>PE ratio</b>"}}}"#,
    )
    .expect("parse figure");

    handle
        .dispatch_figure(&mut figure, None, Some("/equity/ratios"))
        .await
        .expect("dispatch figure");

    let pending = handle.pending();
    assert_eq!(pending.len(), 1);
    let wire = pending[0].wire_payload();

    for key in [
        "html",
        "json_data",
        "export_image",
        "width",
        "height",
        "title",
        "icon",
        "download_path",
    ] {
        assert!(wire.get(key).is_some(), "wire mapping is missing {key}");
    }
    assert_eq!(
        wire["json_data"]["layout"]["title"]["text"],
        json!("PE ratio")
    );
    assert_eq!(wire["json_data"]["layout"]["height"], json!(569));
    assert_eq!(
        wire["json_data"]["command_location"],
        json!("/equity/ratios")
    );
    assert_eq!(wire["title"], json!("Plotlink - /equity/ratios"));
}

#[tokio::test]
async fn handle_is_a_process_wide_singleton() {
    let (_dir, registry, handle) = spawn_handle("0.6.0", true);

    let mut other_settings = RenderSettings::default();
    other_settings.width = 320;
    let again = registry.ensure_with(
        other_settings,
        AssetStore::new("/nonexistent"),
        transport("0.0.0", false),
        false,
    );

    assert!(Arc::ptr_eq(&handle, &again));
    assert_eq!(again.settings().width, 1400);
}

#[tokio::test]
async fn figure_export_returns_once_the_image_exists() {
    let (_dir, _registry, handle) = spawn_handle("0.6.0", true);

    let export_dir = tempfile::tempdir().expect("create export dir");
    let export_path = export_dir.path().join("chart.png");
    std::fs::write(&export_path, b"png").expect("write export");

    let mut figure = Figure::new();
    handle
        .dispatch_figure(&mut figure, Some(&export_path), None)
        .await
        .expect("dispatch with export");

    let pending = handle.pending();
    let wire = pending[0].wire_payload();
    assert_eq!(
        wire["export_image"],
        json!(export_path.display().to_string())
    );
}

#[tokio::test]
async fn outdated_renderer_recovers_through_reset_close() {
    let (_dir, registry, handle) = spawn_handle("0.5.0", true);

    assert_eq!(handle.check_health().await, HealthStatus::Degraded);
    assert_eq!(handle.state(), DispatcherState::Degraded);

    // Dispatches succeed but are dropped while degraded.
    let mut figure = Figure::new();
    handle
        .dispatch_figure(&mut figure, None, None)
        .await
        .expect("degraded dispatch");
    assert_eq!(handle.queued(), 0);

    registry.close(true);
    assert_eq!(handle.state(), DispatcherState::Closed);

    let (_dir2, store) = asset_dir();
    let fresh = registry.ensure_with(RenderSettings::default(), store, transport("0.6.0", true), true);
    assert!(!Arc::ptr_eq(&handle, &fresh));
    assert_eq!(fresh.state(), DispatcherState::Active);
    assert_eq!(fresh.check_health().await, HealthStatus::Active);

    let mut figure = Figure::new();
    fresh
        .dispatch_figure(&mut figure, None, None)
        .await
        .expect("dispatch after recovery");
    assert_eq!(fresh.queued(), 1);
}

#[tokio::test]
async fn table_flow_respects_the_width_floor() {
    let (_dir, _registry, handle) = spawn_handle("0.6.0", true);

    let mut table = DataTable::new(vec!["x".to_string(), "y".to_string()]);
    table
        .push_row(vec![CellValue::Int(1), CellValue::Int(2)])
        .expect("push row");

    handle
        .dispatch_table(&table, Some("Small"), Some("tests"), None, None)
        .expect("dispatch table");

    let pending = handle.pending();
    let wire = pending[0].wire_payload();
    assert_eq!(wire["width"], json!(800));

    let body: serde_json::Value =
        serde_json::from_str(wire["json_data"].as_str().expect("body string"))
            .expect("body parses");
    assert_eq!(body["source"], json!("tests"));
    assert_eq!(body["data"], json!([[1, 2]]));
}
