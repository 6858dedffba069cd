//! Preview rendering.
//!
//! A preview is a single document keyed by root collection name, each value
//! the list of materialized rows with children embedded. Output is pretty
//! JSON; value types without a JSON shape fall back to their textual
//! representation.

use crate::error::BackendError;
use crate::value::{Row, Value};

/// Render a materialized preview to text.
pub fn render_preview(preview: &Row) -> Result<String, BackendError> {
    let json = Value::Document(preview.clone()).to_json();
    Ok(serde_json::to_string_pretty(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_keyed_by_collection() {
        let mut row = Row::new();
        row.insert("id".into(), Value::Int(1));
        row.insert("name".into(), Value::Text("Aruba".into()));

        let mut preview = Row::new();
        preview.insert("country".into(), Value::Array(vec![Value::Document(row)]));

        let text = render_preview(&preview).unwrap();
        assert!(text.contains("\"country\""));
        assert!(text.contains("\"Aruba\""));
        // column order survives rendering
        let id_at = text.find("\"id\"").unwrap();
        let name_at = text.find("\"name\"").unwrap();
        assert!(id_at < name_at);
    }
}
