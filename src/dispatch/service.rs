//! Dispatch operations: payload assembly, health checks, window sizing.
//!
//! Turns domain objects (figures, tables, URLs) into [`OutgoingMessage`]
//! values and queues them on the renderer handle. All operations here are
//! synchronous payload work except figure dispatch with an export path, which
//! hands off to the export watcher after enqueueing.

use crate::dispatch::handle::RendererHandle;
use crate::dispatch::protocol::{OutgoingMessage, WindowSpec};
use crate::dispatch::watcher::ExportWatch;
use crate::error::Result;
use crate::figure::Figure;
use crate::renderer::{ProbeMode, MIN_RENDERER_VERSION};
use crate::settings::Theme;
use crate::table::DataTable;
use log::{debug, info, warn};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// Fixed visual offset added to every dispatched figure's layout height.
pub const FIGURE_HEIGHT_OFFSET: i64 = 69;

/// Title used when a figure does not set one.
pub const DEFAULT_FIGURE_TITLE: &str = "Interactive Chart";

/// Empirical character-to-pixel factor for table window sizing.
const CHAR_PIXEL_FACTOR: f64 = 9.7;

/// Smallest window width a table is ever given.
const MIN_TABLE_WIDTH: u32 = 800;

/// Vertical margin subtracted from the configured height for table windows.
const TABLE_HEIGHT_MARGIN: u32 = 100;

const WINDOW_TITLE_PREFIX: &str = "Plotlink";

/// Result of a renderer health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Renderer reachable and dispatch enabled.
    Active,
    /// Not running interactively (or already closed); healthy but nothing
    /// will be painted.
    Inactive,
    /// Renderer missing or too old; dispatch disabled.
    Degraded,
}

impl RendererHandle {
    /// Queue a chart figure for display.
    ///
    /// The figure is adjusted in place before serialization: markup is
    /// stripped from its title (falling back to [`DEFAULT_FIGURE_TITLE`]) and
    /// the layout height grows by [`FIGURE_HEIGHT_OFFSET`]. With an export
    /// path the export watcher runs after enqueueing; its timeout is silent.
    pub async fn dispatch_figure(
        &self,
        figure: &mut Figure,
        export_image: Option<&Path>,
        location: Option<&str>,
    ) -> Result<()> {
        if !self.dispatch_allowed() {
            debug!("figure dispatch dropped; handle state is {:?}", self.state());
            return Ok(());
        }

        let title = figure
            .title_text()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_FIGURE_TITLE)
            .to_string();
        figure.set_title_text(&strip_markup(&title));
        figure.bump_height(FIGURE_HEIGHT_OFFSET);
        figure.set_paper_bgcolor(self.settings().theme.paper_bgcolor());

        let mut json_data = figure.to_value();
        self.merge_metadata(&mut json_data, location, None);

        let html = self.require_asset(self.assets().plotly_html())?;
        let export_image = export_image.map(Path::to_path_buf);
        self.enqueue(OutgoingMessage::Figure {
            html,
            json_data,
            export_image: export_image.clone(),
            window: self.window_spec(location, self.settings().width, self.settings().height),
        });

        if let Some(path) = export_image {
            let watch = ExportWatch {
                open_on_found: self.settings().open_exports,
                ..ExportWatch::default()
            };
            watch.watch(&path).await;
        }
        Ok(())
    }

    /// Queue tabular data for display.
    ///
    /// The window width is derived from column content: each column width is
    /// inflated by 20% of the spread between the widest and narrowest column,
    /// the inflated sum is scaled to pixels, then clamped between
    /// [`MIN_TABLE_WIDTH`] and the configured width plus 100.
    pub fn dispatch_table(
        &self,
        table: &DataTable,
        title: Option<&str>,
        source: Option<&str>,
        theme: Option<Theme>,
        location: Option<&str>,
    ) -> Result<()> {
        if !self.dispatch_allowed() {
            debug!("table dispatch dropped; handle state is {:?}", self.state());
            return Ok(());
        }

        let title = title
            .map(|t| strip_bracket_tags(&strip_markup(t)))
            .unwrap_or_default();
        let width = table_window_width(&table.column_widths(), self.settings().width);

        let mut body = table.to_split_json();
        if let Some(obj) = body.as_object_mut() {
            obj.insert("title".to_string(), json!(title));
            obj.insert("source".to_string(), json!(source.unwrap_or_default()));
        }
        self.merge_metadata(&mut body, location, Some(theme.unwrap_or(Theme::Dark)));

        let html = self.require_asset(self.assets().table_html())?;
        self.enqueue(OutgoingMessage::Table {
            html,
            json_data: serde_json::to_string(&body)?,
            window: self.window_spec(
                location,
                width,
                self.settings().height.saturating_sub(TABLE_HEIGHT_MARGIN),
            ),
        });
        Ok(())
    }

    /// Queue a URL to be opened in a renderer window.
    pub fn dispatch_url(
        &self,
        url: &str,
        title: Option<&str>,
        width: Option<u32>,
        height: Option<u32>,
    ) -> Result<()> {
        if !self.dispatch_allowed() {
            debug!("url dispatch dropped; handle state is {:?}", self.state());
            return Ok(());
        }

        let html = format!(
            "\n<script>\n    window.location.replace(\"{url}\");\n</script>\n"
        );
        self.enqueue(OutgoingMessage::Url {
            html,
            window: self.window_spec(
                title,
                width.unwrap_or(self.settings().width),
                height.unwrap_or(self.settings().height),
            ),
        });
        Ok(())
    }

    /// Check whether the renderer can be used for dispatch.
    ///
    /// Outside an interactive terminal this always reports [`HealthStatus::Inactive`]
    /// without touching the renderer, and a degraded handle stays degraded
    /// without re-probing. Otherwise the capability record decides: versions
    /// below [`MIN_RENDERER_VERSION`] permanently degrade the handle, newer
    /// versions delegate to the renderer's own probe, and the exact minimum
    /// version suppresses probe failures.
    pub async fn check_health(&self) -> HealthStatus {
        if !self.interactive() || self.state() == super::handle::DispatcherState::Closed {
            return HealthStatus::Inactive;
        }
        if self.state() == super::handle::DispatcherState::Degraded {
            return HealthStatus::Degraded;
        }

        match self.capabilities().probe_mode {
            ProbeMode::Unsupported => {
                warn!(
                    "renderer version {} is below the required minimum {MIN_RENDERER_VERSION}; disabling dispatch",
                    self.capabilities()
                        .version
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                );
                self.zero_retry_budget();
                self.mark_degraded();
                HealthStatus::Degraded
            }
            ProbeMode::Strict => match self.transport().probe().await {
                Ok(()) => HealthStatus::Active,
                Err(err) => {
                    warn!("renderer health probe failed: {err}");
                    self.mark_degraded();
                    HealthStatus::Degraded
                }
            },
            ProbeMode::Lenient => match self.transport().probe().await {
                Ok(()) => HealthStatus::Active,
                Err(err) => {
                    // Probe failures at exactly the minimum version are known
                    // to be spurious; logged apart from a genuine success.
                    info!("probe failed at minimum renderer version, treating as healthy: {err}");
                    HealthStatus::Active
                }
            },
        }
    }

    /// Merge version and telemetry metadata into a payload body.
    ///
    /// The user identity rides along with the first dispatch only.
    fn merge_metadata(&self, body: &mut Value, location: Option<&str>, theme: Option<Theme>) {
        let settings = self.settings();

        let mut telemetry = Map::new();
        telemetry.insert("collect_logs".to_string(), json!(settings.collect_telemetry));
        if settings.collect_telemetry {
            if let Some(uuid) = settings.user_uuid.as_deref() {
                if self.first_identity_use() {
                    telemetry.insert("user_id".to_string(), json!(uuid));
                    telemetry.insert(
                        "email".to_string(),
                        json!(settings.user_email.as_deref().unwrap_or_default()),
                    );
                }
            }
        }

        let theme = theme.unwrap_or(settings.theme);
        let renderer_version = self
            .capabilities()
            .version
            .map(|v| json!(v.to_string()))
            .unwrap_or(Value::Null);

        if let Some(obj) = body.as_object_mut() {
            obj.insert("theme".to_string(), json!(theme.as_str()));
            obj.insert("log_id".to_string(), json!(settings.app_id));
            obj.insert("renderer_version".to_string(), renderer_version);
            obj.insert(
                "platform_version".to_string(),
                json!(settings.platform_version),
            );
            obj.insert(
                "runtime_version".to_string(),
                json!(settings.runtime_version),
            );
            obj.insert("telemetry".to_string(), Value::Object(telemetry));
            obj.insert(
                "command_location".to_string(),
                location.map(|l| json!(l)).unwrap_or(Value::Null),
            );
        }
    }

    fn window_spec(&self, location: Option<&str>, width: u32, height: u32) -> WindowSpec {
        let title = match location {
            Some(loc) if !loc.is_empty() => format!("{WINDOW_TITLE_PREFIX} - {loc}"),
            _ => WINDOW_TITLE_PREFIX.to_string(),
        };
        WindowSpec {
            title,
            icon: self.assets().window_icon(),
            width,
            height,
            download_path: self.settings().export_directory.clone(),
        }
    }

    /// Missing assets disable further dispatch attempts on top of the error.
    fn require_asset(&self, resolved: Result<PathBuf>) -> Result<PathBuf> {
        match resolved {
            Ok(path) => Ok(path),
            Err(err) => {
                self.zero_retry_budget();
                Err(err)
            }
        }
    }
}

/// Remove `<...>` markup tags. An unclosed `<` is kept verbatim.
pub(crate) fn strip_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        match rest[start + 1..].find('>') {
            Some(end) => rest = &rest[start + 1 + end + 1..],
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Remove `[tag]` / `[/tag]` style markers (lowercase ascii tags only).
pub(crate) fn strip_bracket_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('[') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let after_slash = after.strip_prefix('/').unwrap_or(after);
        let tag_len = after_slash
            .chars()
            .take_while(char::is_ascii_lowercase)
            .count();
        if tag_len > 0 && after_slash[tag_len..].starts_with(']') {
            let consumed = 1 + (after.len() - after_slash.len()) + tag_len + 1;
            rest = &rest[start + consumed..];
        } else {
            out.push('[');
            rest = &rest[start + 1..];
        }
    }
    out.push_str(rest);
    out
}

/// Window width for a table with the given per-column content widths.
pub(crate) fn table_window_width(widths: &[usize], configured_width: u32) -> u32 {
    let Some(widest) = widths.iter().copied().max() else {
        return MIN_TABLE_WIDTH;
    };
    let narrowest = widths.iter().copied().min().unwrap_or(0);
    let inflation = (widest - narrowest) as f64 * 0.2;
    let inflated_sum: u64 = widths.iter().map(|w| (*w as f64 + inflation) as u64).sum();
    let scaled = (inflated_sum as f64 * CHAR_PIXEL_FACTOR).min(f64::from(configured_width + 100));
    (scaled as u32).max(MIN_TABLE_WIDTH)
}
