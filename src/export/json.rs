//! Pretty-printed, depth-bounded JSON export.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::error::ExportError;

/// Nesting depth kept in settings exports.
pub const DEFAULT_JSON_DEPTH: usize = 6;

/// Replace arrays/objects nested deeper than `max_depth` with their compact JSON text.
///
/// The top-level value is depth 0.
pub fn bound_depth(value: Value, max_depth: usize) -> Value {
    bound_at(value, 0, max_depth)
}

fn bound_at(value: Value, depth: usize, max_depth: usize) -> Value {
    match value {
        Value::Object(_) | Value::Array(_) if depth > max_depth => {
            Value::String(value.to_string())
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, bound_at(v, depth + 1, max_depth)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| bound_at(v, depth + 1, max_depth))
                .collect(),
        ),
        scalar => scalar,
    }
}

/// Serialize `value` to `path` as pretty JSON, bounded to `max_depth`.
pub fn write_json<T: Serialize>(
    path: &Path,
    value: &T,
    max_depth: usize,
) -> Result<(), ExportError> {
    let bounded = bound_depth(serde_json::to_value(value)?, max_depth);
    let content = serde_json::to_string_pretty(&bounded)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    std::fs::write(path, content).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!("Exported JSON to {}", path.display());
    Ok(())
}
