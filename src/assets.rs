//! Resolution of the bundled renderer pages and window icon.
//!
//! The external renderer receives an `html` path for every chart or table
//! message; those pages (plus the plotly.js bundle they load) live in a local
//! asset directory. Missing templates raise [`PlotlinkError::AssetNotFound`],
//! and callers are expected to also zero the dispatch retry budget so the
//! handle stops trying to reach the renderer.
//!
//! Downloading plotly.js is an explicit initialization step invoked by the
//! host application, not a side effect of loading this crate.

use crate::error::{PlotlinkError, Result};
use log::{debug, warn};
use std::path::{Path, PathBuf};

/// Pinned plotly.js bundle the renderer pages load.
pub const PLOTLY_JS_NAME: &str = "plotly-2.32.0.min.js";

const PLOTLY_CDN_BASE: &str = "https://cdn.plot.ly";
const PLOTLY_HTML_NAME: &str = "plotly.html";
const TABLE_HTML_NAME: &str = "table.html";
const ICON_NAME: &str = "icon.png";

/// Read-only view of the asset directory used by the render dispatcher.
#[derive(Debug, Clone)]
pub struct AssetStore {
    base: PathBuf,
}

impl AssetStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Asset directory in the platform data dir (`<data_dir>/plotlink`).
    pub fn default_location() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("plotlink");
        Self::new(base)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Path to the chart page, verified to exist.
    pub fn plotly_html(&self) -> Result<PathBuf> {
        self.existing(PLOTLY_HTML_NAME)
    }

    /// Path to the table page, verified to exist.
    pub fn table_html(&self) -> Result<PathBuf> {
        self.existing(TABLE_HTML_NAME)
    }

    /// Window icon, if one is bundled. Missing icons are not an error.
    pub fn window_icon(&self) -> Option<PathBuf> {
        let path = self.base.join(ICON_NAME);
        path.exists().then_some(path)
    }

    /// Where the plotly.js bundle is (or will be) stored.
    pub fn plotly_js_path(&self) -> PathBuf {
        self.base.join(PLOTLY_JS_NAME)
    }

    fn existing(&self, name: &str) -> Result<PathBuf> {
        let path = self.base.join(name);
        if path.exists() {
            Ok(path)
        } else {
            warn!("renderer page missing, check the asset path: {}", path.display());
            Err(PlotlinkError::asset_not_found(path))
        }
    }
}

/// Download or update plotly.js into the asset directory.
///
/// Call once during application startup (or via `plotlink --init-assets`).
/// Stale `plotly*.js` bundles from previous pins are removed on success.
pub async fn fetch_plotly_js(store: &AssetStore) -> Result<()> {
    tokio::fs::create_dir_all(store.base())
        .await
        .map_err(|e| PlotlinkError::file_error("Failed to create asset directory", e))?;

    let url = format!("{PLOTLY_CDN_BASE}/{PLOTLY_JS_NAME}");
    let response = reqwest::get(&url)
        .await
        .map_err(|e| PlotlinkError::download(format!("request to {url} failed: {e}")))?
        .error_for_status()
        .map_err(|e| PlotlinkError::download(format!("CDN rejected {url}: {e}")))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| PlotlinkError::download(format!("reading {url} failed: {e}")))?;

    let target = store.plotly_js_path();
    tokio::fs::write(&target, &bytes)
        .await
        .map_err(|e| PlotlinkError::file_error("Failed to write plotly.js", e))?;
    debug!("downloaded {} ({} bytes)", target.display(), bytes.len());

    remove_stale_bundles(store, &target).await;
    Ok(())
}

async fn remove_stale_bundles(store: &AssetStore, current: &Path) {
    let mut entries = match tokio::fs::read_dir(store.base()).await {
        Ok(entries) => entries,
        Err(_) => return,
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path == current {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with("plotly") && name.ends_with(".js") {
            if let Err(e) = tokio::fs::remove_file(&path).await {
                warn!("failed to remove stale bundle {}: {e}", path.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn resolves_existing_templates() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(PLOTLY_HTML_NAME), "<html></html>").unwrap();
        let store = AssetStore::new(dir.path());

        assert!(store.plotly_html().is_ok());
        assert!(store.window_icon().is_none());
    }

    #[test]
    fn missing_template_is_an_error_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path());

        match store.table_html() {
            Err(PlotlinkError::AssetNotFound { path }) => {
                assert!(path.ends_with(TABLE_HTML_NAME));
            }
            other => panic!("expected AssetNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stale_bundles_are_swept() {
        let dir = tempfile::tempdir().unwrap();
        let store = AssetStore::new(dir.path());
        let current = store.plotly_js_path();
        fs::write(&current, "current").unwrap();
        let stale = dir.path().join("plotly-2.18.0.min.js");
        fs::write(&stale, "stale").unwrap();
        let unrelated = dir.path().join("table.html");
        fs::write(&unrelated, "keep").unwrap();

        remove_stale_bundles(&store, &current).await;

        assert!(current.exists());
        assert!(!stale.exists());
        assert!(unrelated.exists());
    }
}
