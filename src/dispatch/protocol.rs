//! Wire protocol between the dispatcher and the external renderer.
//!
//! Every queued item reaches the renderer as a mapping with the keys `html`,
//! `json_data` (charts and tables only), `width`, `height`, `title`, `icon`,
//! and `download_path`; figures additionally carry `export_image`. That shape
//! is the contract with the external process and is preserved field-for-field
//! by [`OutgoingMessage::wire_payload`].
//!
//! Messages are immutable once enqueued; the queue owner only drains them.

use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// Window metadata attached to every outgoing message.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub title: String,
    pub icon: Option<PathBuf>,
    pub width: u32,
    pub height: u32,
    pub download_path: PathBuf,
}

/// A render request on its way to the external renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingMessage {
    /// Interactive chart: the renderer loads the chart page and feeds it the
    /// figure JSON.
    Figure {
        html: PathBuf,
        json_data: Value,
        export_image: Option<PathBuf>,
        window: WindowSpec,
    },
    /// Tabular data: the body is pre-serialized to a JSON string, which is
    /// what the table page expects.
    Table {
        html: PathBuf,
        json_data: String,
        window: WindowSpec,
    },
    /// Redirect window: the `html` field carries an inline script instead of
    /// a page path.
    Url { html: String, window: WindowSpec },
}

impl OutgoingMessage {
    pub fn window(&self) -> &WindowSpec {
        match self {
            OutgoingMessage::Figure { window, .. }
            | OutgoingMessage::Table { window, .. }
            | OutgoingMessage::Url { window, .. } => window,
        }
    }

    /// Build the renderer-queue mapping for this message.
    pub fn wire_payload(&self) -> Value {
        let mut map = Map::new();
        match self {
            OutgoingMessage::Figure {
                html,
                json_data,
                export_image,
                window,
            } => {
                map.insert("html".to_string(), path_value(html));
                map.insert("json_data".to_string(), json_data.clone());
                map.insert(
                    "export_image".to_string(),
                    match export_image {
                        Some(path) => path_value(path),
                        None => Value::Null,
                    },
                );
                insert_window(&mut map, window);
            }
            OutgoingMessage::Table {
                html,
                json_data,
                window,
            } => {
                map.insert("html".to_string(), path_value(html));
                map.insert("json_data".to_string(), json!(json_data));
                insert_window(&mut map, window);
            }
            OutgoingMessage::Url { html, window } => {
                map.insert("html".to_string(), json!(html));
                insert_window(&mut map, window);
            }
        }
        Value::Object(map)
    }
}

fn insert_window(map: &mut Map<String, Value>, window: &WindowSpec) {
    map.insert("width".to_string(), json!(window.width));
    map.insert("height".to_string(), json!(window.height));
    map.insert("title".to_string(), json!(window.title));
    map.insert(
        "icon".to_string(),
        match &window.icon {
            Some(path) => path_value(path),
            None => Value::Null,
        },
    );
    map.insert("download_path".to_string(), path_value(&window.download_path));
}

fn path_value(path: &Path) -> Value {
    json!(path.display().to_string())
}
