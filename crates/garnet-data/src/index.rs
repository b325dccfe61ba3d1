// Index file — (identifier, target) rows
//
// Comma-delimited, two columns, no header. The parser is deliberately
// hand-rolled; the format is too small to justify a CSV crate.

use std::fs;
use std::path::Path;

use crate::error::DataError;

/// Conventional index-file name inside a dataset root directory.
pub const INDEX_FILE: &str = "id_prop.csv";

/// One index row: a structure identifier and its target property.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: String,
    pub target: f64,
}

/// Load an index file.
///
/// Blank lines are ignored; any malformed row is a fatal construction
/// error, as is a missing or empty file.
pub fn load_index(path: &Path) -> Result<Vec<IndexEntry>, DataError> {
    if !path.exists() {
        return Err(DataError::Config(format!(
            "index file {} does not exist",
            path.display()
        )));
    }
    let contents = fs::read_to_string(path)?;

    let mut entries = Vec::new();
    for (idx, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.split(',').collect();
        if cols.len() != 2 {
            return Err(DataError::Index {
                path: path.to_path_buf(),
                line: idx + 1,
                msg: format!("expected 2 columns, got {}", cols.len()),
            });
        }
        let id = cols[0].trim();
        if id.is_empty() {
            return Err(DataError::Index {
                path: path.to_path_buf(),
                line: idx + 1,
                msg: "empty identifier".to_string(),
            });
        }
        let target: f64 = cols[1].trim().parse().map_err(|e| DataError::Index {
            path: path.to_path_buf(),
            line: idx + 1,
            msg: format!("invalid target '{}': {e}", cols[1].trim()),
        })?;
        entries.push(IndexEntry {
            id: id.to_string(),
            target,
        });
    }

    if entries.is_empty() {
        return Err(DataError::Config(format!(
            "index file {} contains no entries",
            path.display()
        )));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_index(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn parses_rows_in_order() {
        let path = write_index("garnet_index_ok.csv", "c-1,0.5\nc-2,-1.25\n\nc-3,3\n");
        let entries = load_index(&path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, "c-1");
        assert_eq!(entries[1].target, -1.25);
        assert_eq!(entries[2].id, "c-3");
        let _ = fs::remove_file(path);
    }

    #[test]
    fn wrong_column_count_fatal() {
        let path = write_index("garnet_index_cols.csv", "c-1,0.5,extra\n");
        let err = load_index(&path).unwrap_err();
        assert!(matches!(err, DataError::Index { line: 1, .. }));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn bad_target_fatal() {
        let path = write_index("garnet_index_target.csv", "c-1,0.5\nc-2,abc\n");
        let err = load_index(&path).unwrap_err();
        assert!(matches!(err, DataError::Index { line: 2, .. }));
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_config_error() {
        let err = load_index(Path::new("/nonexistent/id_prop.csv")).unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
    }

    #[test]
    fn empty_file_is_config_error() {
        let path = write_index("garnet_index_empty.csv", "\n\n");
        let err = load_index(&path).unwrap_err();
        assert!(matches!(err, DataError::Config(_)));
        let _ = fs::remove_file(path);
    }
}
