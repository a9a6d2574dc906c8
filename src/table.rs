//! Tabular payload model.
//!
//! Tables are dispatched to the renderer in a split row/column orientation
//! (`columns` / `index` / `data`) with dates rendered as ISO-8601 strings.
//! Column content widths feed the dispatcher's window sizing.

use crate::error::{PlotlinkError, Result};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::{json, Value};

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
}

impl CellValue {
    /// Display form of the cell, used for column width measurement.
    pub fn render(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => f.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            CellValue::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Best-effort conversion from loose JSON: integral numbers stay
    /// integers, ISO date strings become dates, everything else is text.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Int(i),
                None => CellValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => match s.parse::<NaiveDate>() {
                Ok(date) => CellValue::Date(date),
                Err(_) => CellValue::Text(s.clone()),
            },
            other => CellValue::Text(other.to_string()),
        }
    }

    /// JSON form of the cell. Dates become ISO-8601 strings.
    pub fn to_json(&self) -> Value {
        match self {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => json!(b),
            CellValue::Int(i) => json!(i),
            CellValue::Float(f) => json!(f),
            CellValue::Text(s) => json!(s),
            CellValue::Date(_) | CellValue::Timestamp(_) => json!(self.render()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Float(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

/// Column-ordered table of cells with a fixed arity per row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataTable {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl DataTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Parse a table from its split-orient JSON form (`columns` plus `data`
    /// rows; an `index` field is ignored and regenerated on serialization).
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let columns = value
            .get("columns")
            .and_then(Value::as_array)
            .ok_or_else(|| PlotlinkError::table("table JSON is missing a \"columns\" array"))?
            .iter()
            .map(|name| match name {
                Value::String(s) => Ok(s.clone()),
                other => Err(PlotlinkError::table(format!(
                    "column name is not a string: {other}"
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut table = DataTable::new(columns);
        let rows = value
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| PlotlinkError::table("table JSON is missing a \"data\" array"))?;
        for row in rows {
            let cells = row
                .as_array()
                .ok_or_else(|| PlotlinkError::table("table row is not an array"))?
                .iter()
                .map(CellValue::from_value)
                .collect();
            table.push_row(cells)?;
        }
        Ok(table)
    }

    /// Append a row; its arity must match the column count.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PlotlinkError::table(format!(
                "row has {} cells, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Content width per column: max of the column name length and the widest
    /// rendered cell in that column.
    pub fn column_widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let widest_cell = self
                    .rows
                    .iter()
                    .map(|row| row[idx].render().chars().count())
                    .max()
                    .unwrap_or(0);
                name.chars().count().max(widest_cell)
            })
            .collect()
    }

    /// Serialize in split orientation: `{"columns": [...], "index": [...], "data": [[...]]}`.
    pub fn to_split_json(&self) -> Value {
        let data: Vec<Value> = self
            .rows
            .iter()
            .map(|row| Value::Array(row.iter().map(CellValue::to_json).collect()))
            .collect();
        let index: Vec<Value> = (0..self.rows.len()).map(|i| json!(i)).collect();
        json!({
            "columns": self.columns,
            "index": index,
            "data": data,
        })
    }
}
