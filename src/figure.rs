//! Thin chart figure model.
//!
//! plotlink does not reimplement the Plotly figure schema; a figure is an
//! opaque JSON object with typed accessors for the handful of layout fields
//! the dispatcher touches (title text, height, paper background). Everything
//! else passes through to the renderer untouched.

use crate::error::{PlotlinkError, Result};
use serde_json::{json, Map, Value};

/// Height the renderer assumes when a figure does not set one.
pub const DEFAULT_LAYOUT_HEIGHT: i64 = 450;

/// A chart figure as an opaque JSON object.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    root: Map<String, Value>,
}

impl Default for Figure {
    fn default() -> Self {
        Self::new()
    }
}

impl Figure {
    /// Empty figure with no traces and an empty layout.
    pub fn new() -> Self {
        let mut root = Map::new();
        root.insert("data".to_string(), Value::Array(Vec::new()));
        root.insert("layout".to_string(), Value::Object(Map::new()));
        Self { root }
    }

    /// Wrap an already-parsed figure object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(PlotlinkError::figure(format!(
                "payload must be a JSON object, got {other}"
            ))),
        }
    }

    /// Parse a figure from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    /// Layout title text, if one is set.
    pub fn title_text(&self) -> Option<&str> {
        self.root
            .get("layout")?
            .get("title")?
            .get("text")?
            .as_str()
    }

    /// Overwrite the layout title text, creating the layout objects as needed.
    pub fn set_title_text(&mut self, text: &str) {
        let title = object_entry(self.layout_mut(), "title");
        title.insert("text".to_string(), json!(text));
    }

    /// Layout height, falling back to the renderer default when unset.
    pub fn layout_height(&self) -> i64 {
        self.root
            .get("layout")
            .and_then(|layout| layout.get("height"))
            .and_then(number_as_i64)
            .unwrap_or(DEFAULT_LAYOUT_HEIGHT)
    }

    /// Add a fixed offset to the layout height.
    pub fn bump_height(&mut self, delta: i64) {
        let height = self.layout_height() + delta;
        self.layout_mut().insert("height".to_string(), json!(height));
    }

    /// Set the paper background color on the layout.
    pub fn set_paper_bgcolor(&mut self, color: &str) {
        self.layout_mut()
            .insert("paper_bgcolor".to_string(), json!(color));
    }

    /// Serialize the figure back to a JSON object value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    fn layout_mut(&mut self) -> &mut Map<String, Value> {
        object_entry(&mut self.root, "layout")
    }
}

/// Get `key` from `map` as a mutable object, replacing any non-object value.
fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> &'a mut Map<String, Value> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(obj) => obj,
        _ => unreachable!(),
    }
}

fn number_as_i64(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_round_trip() {
        let mut fig = Figure::new();
        assert_eq!(fig.title_text(), None);

        fig.set_title_text("Revenue by Quarter");
        assert_eq!(fig.title_text(), Some("Revenue by Quarter"));
    }

    #[test]
    fn height_defaults_then_bumps() {
        let mut fig = Figure::new();
        assert_eq!(fig.layout_height(), DEFAULT_LAYOUT_HEIGHT);

        fig.bump_height(69);
        assert_eq!(fig.layout_height(), DEFAULT_LAYOUT_HEIGHT + 69);
    }

    #[test]
    fn parses_existing_layout_fields() {
        let fig = Figure::from_json(
            r#"{"data": [], "layout": {"height": 520.0, "title": {"text": "<b>Spread</b>"}}}"#,
        )
        .unwrap();
        assert_eq!(fig.layout_height(), 520);
        assert_eq!(fig.title_text(), Some("<b>Spread</b>"));
    }

    #[test]
    fn rejects_non_object_payloads() {
        assert!(Figure::from_json("[1, 2, 3]").is_err());
        assert!(Figure::from_json("\"chart\"").is_err());
    }

    #[test]
    fn paper_bgcolor_lands_in_layout() {
        let mut fig = Figure::new();
        fig.set_paper_bgcolor("rgba(0,0,0,0)");
        let value = fig.to_value();
        assert_eq!(
            value["layout"]["paper_bgcolor"],
            json!("rgba(0,0,0,0)")
        );
    }
}
