//! Input decoding into lazy record batches.

use crate::domain::ports::RecordBatches;
use crate::utils::error::{EtlError, Result};
use serde_json::de::IoRead;
use serde_json::{StreamDeserializer, Value};
use std::io::Cursor;
use std::path::Path;

const JSON_LINES_EXTENSIONS: [&str; 2] = ["jsonl", "ndjson"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    JsonDocument,
    JsonLines,
}

impl InputFormat {
    pub fn from_path(path: &str) -> Self {
        let is_lines = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| JSON_LINES_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
            .unwrap_or(false);
        if is_lines {
            InputFormat::JsonLines
        } else {
            InputFormat::JsonDocument
        }
    }
}

fn check_batch_size(batch_size: usize) -> Result<()> {
    if batch_size == 0 {
        return Err(EtlError::InvalidConfigValueError {
            field: "extract.batch_size".to_string(),
            value: "0".to_string(),
            reason: "batch size must be greater than 0".to_string(),
        });
    }
    Ok(())
}

/// A whole JSON document: an array is batched, a single object is one record.
pub struct JsonArrayReader {
    items: std::vec::IntoIter<Value>,
    batch_size: usize,
}

impl JsonArrayReader {
    pub fn from_slice(source_name: &str, bytes: &[u8], batch_size: usize) -> Result<Self> {
        check_batch_size(batch_size)?;
        let document: Value = serde_json::from_slice(bytes).map_err(|e| EtlError::ReadError {
            source_name: source_name.to_string(),
            message: format!("invalid JSON: {}", e),
        })?;

        let items = match document {
            Value::Array(items) => items,
            object @ Value::Object(_) => vec![object],
            other => {
                return Err(EtlError::ReadError {
                    source_name: source_name.to_string(),
                    message: format!("expected an array or object, got {}", other),
                })
            }
        };

        Ok(Self {
            items: items.into_iter(),
            batch_size,
        })
    }
}

impl Iterator for JsonArrayReader {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch: Vec<Value> = self.items.by_ref().take(self.batch_size).collect();
        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}

/// Whitespace-separated JSON values, decoded one at a time.
///
/// A malformed value ends the sequence: the records decoded before it are
/// yielded as a final short batch, then the error.
pub struct JsonLinesReader {
    source_name: String,
    stream: StreamDeserializer<'static, IoRead<Cursor<Vec<u8>>>, Value>,
    batch_size: usize,
    pending_error: Option<EtlError>,
    finished: bool,
}

impl JsonLinesReader {
    pub fn new(source_name: &str, bytes: Vec<u8>, batch_size: usize) -> Result<Self> {
        check_batch_size(batch_size)?;
        Ok(Self {
            source_name: source_name.to_string(),
            stream: serde_json::Deserializer::from_reader(Cursor::new(bytes)).into_iter::<Value>(),
            batch_size,
            pending_error: None,
            finished: false,
        })
    }
}

impl Iterator for JsonLinesReader {
    type Item = Result<Vec<Value>>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(error) = self.pending_error.take() {
            self.finished = true;
            return Some(Err(error));
        }
        if self.finished {
            return None;
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.stream.next() {
                Some(Ok(value)) => batch.push(value),
                Some(Err(e)) => {
                    let error = EtlError::ReadError {
                        source_name: self.source_name.clone(),
                        message: format!("malformed record at line {}: {}", e.line(), e),
                    };
                    if batch.is_empty() {
                        self.finished = true;
                        return Some(Err(error));
                    }
                    self.pending_error = Some(error);
                    return Some(Ok(batch));
                }
                None => {
                    self.finished = true;
                    break;
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}

/// Picks the reader by extension and returns its batches.
pub fn batches_for(source_name: &str, bytes: Vec<u8>, batch_size: usize) -> Result<RecordBatches> {
    match InputFormat::from_path(source_name) {
        InputFormat::JsonLines => Ok(Box::new(JsonLinesReader::new(source_name, bytes, batch_size)?)),
        InputFormat::JsonDocument => Ok(Box::new(JsonArrayReader::from_slice(
            source_name,
            &bytes,
            batch_size,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sizes(batches: RecordBatches) -> Vec<usize> {
        batches.map(|b| b.unwrap().len()).collect()
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(InputFormat::from_path("feed.jsonl"), InputFormat::JsonLines);
        assert_eq!(InputFormat::from_path("data/feed.NDJSON"), InputFormat::JsonLines);
        assert_eq!(InputFormat::from_path("feed.json"), InputFormat::JsonDocument);
        assert_eq!(InputFormat::from_path("feed"), InputFormat::JsonDocument);
    }

    #[test]
    fn test_array_batched() {
        let bytes = serde_json::to_vec(&json!([{"id": 1}, {"id": 2}, {"id": 3}, {"id": 4}, {"id": 5}])).unwrap();
        assert_eq!(sizes(batches_for("feed.json", bytes, 2).unwrap()), vec![2, 2, 1]);
    }

    #[test]
    fn test_single_object_wrapped() {
        let bytes = br#"{"id": "only"}"#.to_vec();
        let mut reader = JsonArrayReader::from_slice("one.json", &bytes, 10).unwrap();
        assert_eq!(reader.next().unwrap().unwrap(), vec![json!({"id": "only"})]);
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_empty_array_yields_nothing() {
        assert!(sizes(batches_for("empty.json", b"[]".to_vec(), 3).unwrap()).is_empty());
    }

    #[test]
    fn test_invalid_document_is_read_error() {
        let err = batches_for("broken.json", b"[{\"id\": 1},".to_vec(), 3).err().unwrap();
        assert!(matches!(err, EtlError::ReadError { .. }));
        let err = batches_for("scalar.json", b"42".to_vec(), 3).err().unwrap();
        assert!(matches!(err, EtlError::ReadError { .. }));
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(batches_for("feed.json", b"[]".to_vec(), 0).is_err());
    }

    #[test]
    fn test_json_lines_batched() {
        let bytes = b"{\"id\": 1}\n{\"id\": 2}\n\n{\"id\": 3}\n".to_vec();
        assert_eq!(sizes(batches_for("feed.jsonl", bytes, 2).unwrap()), vec![2, 1]);
    }

    #[test]
    fn test_json_lines_malformed_mid_stream() {
        let bytes = b"{\"id\": 1}\n{\"id\": 2}\n{\"id\": 3}\n{\"id\": oops}\n{\"id\": 5}\n".to_vec();
        let mut reader = JsonLinesReader::new("feed.jsonl", bytes, 2).unwrap();

        assert_eq!(reader.next().unwrap().unwrap().len(), 2);
        assert_eq!(reader.next().unwrap().unwrap().len(), 1);
        let err = reader.next().unwrap().unwrap_err();
        assert!(err.to_string().contains("line 4"));
        assert!(reader.next().is_none());
    }
}
