use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use valid8_logging::{valid8_info, valid8_warn};

use crate::persist::{AtomicFileWriter, PersistError};

pub const CSV_DELIMITER: char = ',';

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("row {row} is not a flat record")]
    NotAnObject { row: usize },
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Serializes one value as an indented JSON document.
pub fn export_structured<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, ExportError> {
    Ok(serde_json::to_vec_pretty(value)?)
}

/// Encodes flat records as CSV.
///
/// Column headers come from the first row's keys, in field order. Returns
/// `Ok(None)` for an empty row list.
pub fn export_tabular<T: Serialize>(rows: &[T]) -> Result<Option<Vec<u8>>, ExportError> {
    if rows.is_empty() {
        valid8_warn!("No data to export");
        return Ok(None);
    }

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        match serde_json::to_value(row)? {
            Value::Object(map) => records.push(map),
            _ => return Err(ExportError::NotAnObject { row: index }),
        }
    }

    let headers: Vec<String> = records[0].keys().cloned().collect();
    let delimiter = CSV_DELIMITER.to_string();
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        headers
            .iter()
            .map(|h| escape_field(h))
            .collect::<Vec<_>>()
            .join(&delimiter),
    );
    for record in &records {
        let line = headers
            .iter()
            .map(|header| escape_field(&stringify(record.get(header))))
            .collect::<Vec<_>>()
            .join(&delimiter);
        lines.push(line);
    }
    Ok(Some(lines.join("\n").into_bytes()))
}

fn stringify(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested @ (Value::Array(_) | Value::Object(_))) => nested.to_string(),
    }
}

/// Doubles embedded quotes; quotes the field when it holds the delimiter,
/// a quote or a line break.
fn escape_field(raw: &str) -> String {
    let escaped = raw.replace('"', "\"\"");
    if raw.contains(CSV_DELIMITER) || raw.contains('"') || raw.contains('\n') || raw.contains('\r')
    {
        format!("\"{escaped}\"")
    } else {
        escaped
    }
}

/// Delivers export bytes as files in a target directory.
#[derive(Debug, Clone)]
pub struct ExportWriter {
    writer: AtomicFileWriter,
}

impl ExportWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }

    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ExportError> {
        let path = self.writer.write(filename, bytes)?;
        valid8_info!("Exported {} bytes to {:?}", bytes.len(), path);
        Ok(path)
    }
}
