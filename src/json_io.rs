//! JSON at the input/output boundary.
//!
//! Inputs may hold an array of objects or a single object; a `.csv` input is
//! read as one object per row, keyed by the header. Outputs are
//! pretty-printed UTF-8 with a trailing newline and always fully overwritten.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{InputError, InputResult};

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Load a file holding either `[T, ...]` or a single `T`, or a CSV table.
pub fn load_records<T: DeserializeOwned>(path: &Path) -> InputResult<Vec<T>> {
    let text = fs::read_to_string(path).map_err(|source| InputError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    if is_csv(path) {
        return parse_csv(path, &text);
    }
    let json_error = |source: serde_json::Error| InputError::Json {
        path: path.to_path_buf(),
        source,
    };

    let value: Value = serde_json::from_str(&text).map_err(json_error)?;
    let records = match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(json_error)?,
        other => vec![serde_json::from_value(other).map_err(json_error)?],
    };
    debug!(path = %path.display(), count = records.len(), "Loaded JSON");
    Ok(records)
}

/// Every cell arrives as a string, so fields decode the same way as
/// string-valued JSON.
fn parse_csv<T: DeserializeOwned>(path: &Path, text: &str) -> InputResult<Vec<T>> {
    let csv_error = |source: csv::Error| InputError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());
    let headers = reader.headers().map_err(csv_error)?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(csv_error)?;
        let object: Map<String, Value> = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| (name.trim().to_string(), Value::String(cell.to_string())))
            .collect();
        let record = serde_json::from_value(Value::Object(object)).map_err(|source| {
            InputError::Json {
                path: path.to_path_buf(),
                source,
            }
        })?;
        records.push(record);
    }
    debug!(path = %path.display(), count = records.len(), "Loaded CSV");
    Ok(records)
}

/// Serialize `data` to `path`, replacing the file.
pub fn save_json<T: Serialize + ?Sized>(data: &T, path: &Path) -> InputResult<()> {
    let write_error = |source: std::io::Error| InputError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut text = serde_json::to_string_pretty(data)
        .map_err(|e| write_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    text.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_error)?;
    }
    fs::write(path, text).map_err(write_error)?;
    info!("Saved results to {}", path.display());
    Ok(())
}
