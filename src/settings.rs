//! Display configuration supplied by the host application.
//!
//! The settings provider is an external collaborator: plotlink consumes these
//! values read-only and never writes them back. Every field has a sensible
//! default so a bare `RenderSettings::default()` is usable out of the box.

use crate::error::{PlotlinkError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Color theme applied to dispatched windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    /// Paper background injected into figure layouts for this theme.
    pub fn paper_bgcolor(&self) -> &'static str {
        match self {
            Theme::Dark => "rgba(0,0,0,0)",
            Theme::Light => "rgba(255,255,255,0)",
        }
    }
}

/// Display configuration for the render dispatcher.
///
/// Immutable per dispatch call. Later `ensure` calls on an existing handle
/// ignore the settings they carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Window color theme
    pub theme: Theme,
    /// Window width in pixels
    pub width: u32,
    /// Window height in pixels
    pub height: u32,
    /// Whether telemetry collection is enabled
    pub collect_telemetry: bool,
    /// Opaque user identifier, forwarded with the first dispatch only
    pub user_uuid: Option<String>,
    /// User email, forwarded alongside the identifier
    pub user_email: Option<String>,
    /// Open exported images with the platform opener once they appear
    pub open_exports: bool,
    /// Directory the renderer offers as the default download target
    pub export_directory: PathBuf,
    /// Host platform version string, forwarded as metadata
    pub platform_version: String,
    /// Host runtime version string, forwarded as metadata
    pub runtime_version: String,
    /// Application identifier used as the telemetry log id
    pub app_id: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Dark,
            width: 1400,
            height: 762,
            collect_telemetry: false,
            user_uuid: None,
            user_email: None,
            open_exports: false,
            export_directory: default_export_directory(),
            platform_version: String::new(),
            runtime_version: String::new(),
            app_id: String::new(),
        }
    }
}

impl RenderSettings {
    /// Load settings from a JSON file, filling missing fields with defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|e| PlotlinkError::file_error("Failed to read settings file", e))?;
        serde_json::from_str(&contents)
            .map_err(|e| PlotlinkError::config(format!("settings file is not valid JSON: {e}")))
    }
}

fn default_export_directory() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_standard_window() {
        let settings = RenderSettings::default();
        assert_eq!(settings.width, 1400);
        assert_eq!(settings.height, 762);
        assert_eq!(settings.theme, Theme::Dark);
        assert!(!settings.collect_telemetry);
        assert!(!settings.open_exports);
    }

    #[test]
    fn partial_json_fills_missing_fields() {
        let settings: RenderSettings =
            serde_json::from_str(r#"{"theme": "light", "width": 1000}"#).unwrap();
        assert_eq!(settings.theme, Theme::Light);
        assert_eq!(settings.width, 1000);
        assert_eq!(settings.height, 762);
    }

    #[test]
    fn theme_paper_background() {
        assert_eq!(Theme::Dark.paper_bgcolor(), "rgba(0,0,0,0)");
        assert_eq!(Theme::Light.paper_bgcolor(), "rgba(255,255,255,0)");
    }
}
