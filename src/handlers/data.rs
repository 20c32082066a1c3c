//! Data capability: typed resource locators and pull/push conversions
//!
//! A `Locator` is a closed union over the four resource kinds the platform
//! stores (documents, series, sheets, blobs), parsed from `scheme:path`
//! strings. Every pull/push matches exhaustively on the scheme and maps to
//! an explicit conversion; unsupported scheme/shape combinations fail fast
//! rather than silently coercing.
//!
//! The blob special case is deliberate and narrow: only CSV content is
//! split into a list-of-lists on pull, every other content type passes
//! through opaque.

use crate::errors::RuntimeError;
use crate::value::{from_native, to_native, ByteStream, Value};
use std::collections::HashMap;
use std::path::PathBuf;

/* ===================== Locator ===================== */

/// Resource kind addressed by a locator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Document,
    Series,
    Sheet,
    Blob,
}

/// Typed resource address, e.g. `document:orders/today`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub scheme: Scheme,
    pub path: String,
}

impl Locator {
    pub fn parse(raw: &str) -> Result<Self, RuntimeError> {
        let (scheme_str, path) = raw.split_once(':').ok_or_else(|| {
            RuntimeError::unsupported(format!("malformed resource locator '{}'", raw), 0)
        })?;

        let scheme = match scheme_str {
            "document" => Scheme::Document,
            "series" => Scheme::Series,
            "sheet" => Scheme::Sheet,
            "blob" => Scheme::Blob,
            other => {
                return Err(RuntimeError::unsupported(
                    format!("unknown resource scheme '{}'", other),
                    0,
                ))
            }
        };

        if path.is_empty() {
            return Err(RuntimeError::unsupported(
                format!("empty path in resource locator '{}'", raw),
                0,
            ));
        }

        Ok(Locator {
            scheme,
            path: path.to_string(),
        })
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let scheme = match self.scheme {
            Scheme::Document => "document",
            Scheme::Series => "series",
            Scheme::Sheet => "sheet",
            Scheme::Blob => "blob",
        };
        write!(f, "{}:{}", scheme, self.path)
    }
}

/* ===================== Trait ===================== */

pub trait DataApi {
    fn is_available(&self) -> bool;

    /// Resolve a locator to a Value.
    fn pull(&self, locator: &Locator) -> Result<Value, RuntimeError>;

    /// Convert a Value to the native shape the resource kind expects and
    /// store it. `content_type` hints the blob encoding.
    fn push(
        &self,
        locator: &Locator,
        value: &Value,
        content_type: Option<&str>,
    ) -> Result<(), RuntimeError>;
}

/* ===================== Conversions ===================== */

/// Tabular list-of-lists → nested document map keyed by first-column value.
///
/// Two columns make `{key: value}`; more columns make `{key: [rest...]}`.
pub fn document_from_tabular(rows: &[Value]) -> Result<Value, RuntimeError> {
    let mut doc: HashMap<String, Value> = HashMap::new();
    for row in rows {
        let Value::List(cells) = row else {
            return Err(RuntimeError::unsupported(
                "tabular document push requires a list of rows",
                0,
            ));
        };
        if cells.len() < 2 {
            return Err(RuntimeError::unsupported(
                "tabular document push requires at least two columns",
                0,
            ));
        }
        let key = match &cells[0] {
            Value::Str(s) => s.clone(),
            Value::Num(n) => n.to_string(),
            other => {
                return Err(RuntimeError::unsupported(
                    format!("document key column must be scalar, got {}", other.type_name()),
                    0,
                ))
            }
        };
        let entry = if cells.len() == 2 {
            cells[1].clone()
        } else {
            Value::List(cells[1..].to_vec())
        };
        doc.insert(key, entry);
    }
    Ok(Value::Map(doc))
}

/// Split CSV text into a list of row lists. Cells that parse as numbers
/// become numbers, everything else stays a string.
pub fn rows_from_csv(text: &str) -> Result<Value, RuntimeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record
            .map_err(|e| RuntimeError::unsupported(format!("malformed CSV content: {}", e), 0))?;
        let cells = record
            .iter()
            .map(|cell| match cell.parse::<f64>() {
                Ok(n) => Value::Num(n),
                Err(_) => Value::Str(cell.to_string()),
            })
            .collect();
        rows.push(Value::List(cells));
    }
    Ok(Value::List(rows))
}

/// Encode a list of row lists as CSV text.
pub fn csv_from_rows(rows: &[Value]) -> Result<String, RuntimeError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_writer(Vec::new());

    for row in rows {
        let Value::List(cells) = row else {
            return Err(RuntimeError::unsupported(
                "grid push requires a list of row lists",
                0,
            ));
        };
        let rendered: Vec<String> = cells
            .iter()
            .map(|c| match c {
                Value::Str(s) => s.clone(),
                Value::Num(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null | Value::Void => String::new(),
                other => format!("{:?}", other),
            })
            .collect();
        writer
            .write_record(&rendered)
            .map_err(|e| RuntimeError::unsupported(format!("CSV encode failed: {}", e), 0))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| RuntimeError::unsupported(format!("CSV encode failed: {}", e), 0))?;
    String::from_utf8(bytes)
        .map_err(|e| RuntimeError::unsupported(format!("CSV encode produced bad UTF-8: {}", e), 0))
}

fn io_err(action: &str, locator: &Locator, err: std::io::Error) -> RuntimeError {
    RuntimeError::unsupported(format!("{} {} failed: {}", action, locator, err), 0)
}

/* ===================== Default (filesystem) ===================== */

/// Filesystem-backed store under a root directory: documents and series as
/// JSON, sheets as CSV grids, blobs as raw bytes.
pub struct DefaultDataApi {
    root: PathBuf,
}

impl DefaultDataApi {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_path(&self, locator: &Locator) -> PathBuf {
        let mut path = self.root.join(&locator.path);
        let ext = match locator.scheme {
            Scheme::Document | Scheme::Series => "json",
            Scheme::Sheet => "csv",
            Scheme::Blob => return path,
        };
        path.set_extension(ext);
        path
    }
}

impl DataApi for DefaultDataApi {
    fn is_available(&self) -> bool {
        true
    }

    fn pull(&self, locator: &Locator) -> Result<Value, RuntimeError> {
        let path = self.file_path(locator);
        match locator.scheme {
            Scheme::Document => {
                let text =
                    std::fs::read_to_string(&path).map_err(|e| io_err("pull", locator, e))?;
                let native: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
                    RuntimeError::unsupported(format!("document {} is not JSON: {}", locator, e), 0)
                })?;
                Ok(from_native(&native))
            }
            Scheme::Series => {
                let text =
                    std::fs::read_to_string(&path).map_err(|e| io_err("pull", locator, e))?;
                let native: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
                    RuntimeError::unsupported(format!("series {} is not JSON: {}", locator, e), 0)
                })?;
                match from_native(&native) {
                    v @ Value::List(_) => Ok(v),
                    other => Err(RuntimeError::unsupported(
                        format!("series {} is not a point sequence, got {}", locator, other.type_name()),
                        0,
                    )),
                }
            }
            Scheme::Sheet => {
                let text =
                    std::fs::read_to_string(&path).map_err(|e| io_err("pull", locator, e))?;
                rows_from_csv(&text)
            }
            Scheme::Blob => {
                let bytes = std::fs::read(&path).map_err(|e| io_err("pull", locator, e))?;
                // CSV is the one content type a blob pull interprets
                if locator.path.ends_with(".csv") {
                    let text = String::from_utf8_lossy(&bytes);
                    return rows_from_csv(&text);
                }
                match String::from_utf8(bytes) {
                    Ok(text) => Ok(Value::Str(text)),
                    Err(e) => Ok(Value::Stream(Box::new(ByteStream {
                        content_type: "application/octet-stream".to_string(),
                        bytes: e.into_bytes(),
                    }))),
                }
            }
        }
    }

    fn push(
        &self,
        locator: &Locator,
        value: &Value,
        content_type: Option<&str>,
    ) -> Result<(), RuntimeError> {
        let path = self.file_path(locator);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err("push", locator, e))?;
        }

        match locator.scheme {
            Scheme::Document => {
                let native = match value {
                    Value::Map(_) | Value::Object(_) => to_native(value),
                    Value::List(rows) => to_native(&document_from_tabular(rows)?),
                    other => {
                        return Err(RuntimeError::unsupported(
                            format!("cannot push {} to {}", other.type_name(), locator),
                            0,
                        ))
                    }
                };
                let text = serde_json::to_string_pretty(&native).map_err(|e| {
                    RuntimeError::unsupported(format!("document encode failed: {}", e), 0)
                })?;
                std::fs::write(&path, text).map_err(|e| io_err("push", locator, e))
            }
            Scheme::Series => {
                let Value::List(_) = value else {
                    return Err(RuntimeError::unsupported(
                        format!("cannot push {} to {}", value.type_name(), locator),
                        0,
                    ));
                };
                let text = serde_json::to_string(&to_native(value)).map_err(|e| {
                    RuntimeError::unsupported(format!("series encode failed: {}", e), 0)
                })?;
                std::fs::write(&path, text).map_err(|e| io_err("push", locator, e))
            }
            Scheme::Sheet => {
                let Value::List(rows) = value else {
                    return Err(RuntimeError::unsupported(
                        format!("cannot push {} to {}", value.type_name(), locator),
                        0,
                    ));
                };
                let text = csv_from_rows(rows)?;
                std::fs::write(&path, text).map_err(|e| io_err("push", locator, e))
            }
            Scheme::Blob => {
                let bytes: Vec<u8> = match value {
                    Value::Str(s) => s.clone().into_bytes(),
                    Value::Stream(s) => s.bytes.clone(),
                    Value::List(rows) if content_type == Some("text/csv") => {
                        csv_from_rows(rows)?.into_bytes()
                    }
                    other => {
                        return Err(RuntimeError::unsupported(
                            format!("cannot push {} to {}", other.type_name(), locator),
                            0,
                        ))
                    }
                };
                std::fs::write(&path, bytes).map_err(|e| io_err("push", locator, e))
            }
        }
    }
}

/* ===================== Deny ===================== */

pub struct DenyDataApi;

impl DataApi for DenyDataApi {
    fn is_available(&self) -> bool {
        false
    }
    fn pull(&self, _locator: &Locator) -> Result<Value, RuntimeError> {
        Err(RuntimeError::NotAllowed { line: 0 })
    }
    fn push(&self, _l: &Locator, _v: &Value, _ct: Option<&str>) -> Result<(), RuntimeError> {
        Err(RuntimeError::NotAllowed { line: 0 })
    }
}

/* ===================== Null / Test ===================== */

/// Canned values: empty document/map, empty series/sheet lists, empty blob
/// text; every push succeeds without storing.
pub struct NullDataApi;

impl DataApi for NullDataApi {
    fn is_available(&self) -> bool {
        true
    }
    fn pull(&self, locator: &Locator) -> Result<Value, RuntimeError> {
        Ok(match locator.scheme {
            Scheme::Document => Value::Map(HashMap::new()),
            Scheme::Series | Scheme::Sheet => Value::List(vec![]),
            Scheme::Blob => Value::Str(String::new()),
        })
    }
    fn push(&self, _l: &Locator, _v: &Value, _ct: Option<&str>) -> Result<(), RuntimeError> {
        Ok(())
    }
}
