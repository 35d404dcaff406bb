//! Multi-document YAML streams separated by `---`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Marker that starts every document written by this crate.
pub const SEPARATOR: &str = "---\n";

/// Parses every non-empty document in `bytes`.
///
/// # Errors
///
/// Returns an error naming `context` and the document index if a document
/// is malformed.
pub fn parse_stream<T: DeserializeOwned>(bytes: &[u8], context: &str) -> Result<Vec<T>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for (index, document) in serde_yaml::Deserializer::from_slice(bytes).enumerate() {
        let value = serde_yaml::Value::deserialize(document)
            .map_err(|e| Error::yaml(format!("{context} document {index}"), e))?;
        if value.is_null() {
            continue;
        }
        out.push(
            serde_yaml::from_value(value)
                .map_err(|e| Error::yaml(format!("{context} document {index}"), e))?,
        );
    }
    Ok(out)
}

/// Renders one document, separator included, ready to append.
///
/// # Errors
///
/// Returns an error if the value cannot be represented as YAML.
pub fn render_document<T: Serialize>(value: &T, context: &str) -> Result<String> {
    let body = serde_yaml::to_string(value).map_err(|e| Error::yaml(context.to_string(), e))?;
    Ok(format!("{SEPARATOR}{body}"))
}

/// Renders a whole stream.
///
/// # Errors
///
/// See [`render_document`].
pub fn render_stream<T: Serialize>(values: &[T], context: &str) -> Result<String> {
    values.iter().map(|v| render_document(v, context)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    #[test]
    fn empty_input_has_no_documents() {
        assert!(parse_stream::<Value>(b"", "mocks").unwrap().is_empty());
        assert!(parse_stream::<Value>(b"  \n", "mocks").unwrap().is_empty());
    }

    #[test]
    fn rendered_stream_parses_back() {
        let docs: Vec<Value> = vec![
            serde_yaml::from_str("name: mock-0\n").unwrap(),
            serde_yaml::from_str("name: mock-1\n").unwrap(),
        ];
        let text = render_stream(&docs, "mocks").unwrap();
        assert!(text.starts_with("---\nname: mock-0\n---\n"));
        assert_eq!(parse_stream::<Value>(text.as_bytes(), "mocks").unwrap(), docs);
    }

    #[test]
    fn malformed_document_names_its_index() {
        let err = parse_stream::<Value>(b"---\na: 1\n---\na: [\n", "mocks").unwrap_err();
        assert!(err.to_string().contains("mocks document"));
    }
}
