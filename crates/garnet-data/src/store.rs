// FeatureStore — one file of named arrays per structure identifier
//
// Files use the safetensors container layout:
//
//   ┌──────────────┬──────────────────────┬───────────────────────┐
//   │ 8 bytes      │ N bytes              │ raw data bytes        │
//   │ header size  │ JSON header (UTF-8)  │ (contiguous, LE)      │
//   │ (u64 LE)     │                      │                       │
//   └──────────────┴──────────────────────┴───────────────────────┘
//
// Each file carries three F64 arrays: `atom_onehot` [n, 104],
// `descriptor` [n, D], and `target` [1]. The header is built by hand on
// the write path and parsed with serde_json on the read path.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use garnet_core::{AtomFeatures, ONE_HOT_WIDTH};

use crate::dataset::Sample;
use crate::error::DataError;

/// File extension for cached feature files.
pub const STORE_EXT: &str = "safetensors";

const ATOM_ONEHOT: &str = "atom_onehot";
const DESCRIPTOR: &str = "descriptor";
const TARGET: &str = "target";

/// A cached feature entry read back from disk.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub atom_features: AtomFeatures,
    pub descriptor: AtomFeatures,
    /// Absent in files written before targets were stored.
    pub target: Option<f64>,
}

/// Directory of per-identifier feature files.
///
/// One file per identifier at `<root>/<id>.safetensors`. Entries are
/// written once and never invalidated; concurrent writers touch distinct
/// files, so no locking is needed.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    root: PathBuf,
}

impl FeatureStore {
    /// A store rooted at `root`. The directory is created lazily on the
    /// first `save`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the feature file for `id`.
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.{STORE_EXT}"))
    }

    /// Whether an entry exists for `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.path_for(id).exists()
    }

    /// Persist a sample's feature arrays.
    ///
    /// Creates the store root if absent; creating an existing directory
    /// is not an error.
    pub fn save(&self, sample: &Sample) -> Result<(), DataError> {
        fs::create_dir_all(&self.root)?;
        let file = File::create(self.path_for(&sample.id))?;
        let mut writer = BufWriter::new(file);
        let arrays: [(&str, Vec<usize>, &[f64]); 3] = [
            (
                ATOM_ONEHOT,
                vec![sample.atom_features.rows(), sample.atom_features.width()],
                sample.atom_features.as_slice(),
            ),
            (
                DESCRIPTOR,
                vec![sample.descriptor.rows(), sample.descriptor.width()],
                sample.descriptor.as_slice(),
            ),
            (TARGET, vec![1], std::slice::from_ref(&sample.target)),
        ];
        write_arrays(&mut writer, &arrays)?;
        writer.flush()?;
        Ok(())
    }

    /// Read the entry for `id`.
    ///
    /// # Errors
    /// `MissingCache` when no file exists for the identifier; `Store`
    /// when the file is malformed or its arrays are inconsistent.
    pub fn load(&self, id: &str) -> Result<StoredEntry, DataError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(DataError::MissingCache {
                id: id.to_string(),
                path,
            });
        }
        let file = File::open(&path)?;
        let mut reader = BufReader::new(file);
        let arrays = read_arrays(&mut reader).map_err(|msg| DataError::Store {
            id: id.to_string(),
            msg,
        })?;

        let mut atom_features = None;
        let mut descriptor = None;
        let mut target = None;
        for (name, shape, values) in arrays {
            match name.as_str() {
                ATOM_ONEHOT => atom_features = Some(feature_block(&shape, values, id, ATOM_ONEHOT)?),
                DESCRIPTOR => descriptor = Some(feature_block(&shape, values, id, DESCRIPTOR)?),
                TARGET => target = values.first().copied(),
                _ => {}
            }
        }

        let atom_features = atom_features
            .ok_or_else(|| store_error(id, format!("missing array '{ATOM_ONEHOT}'")))?;
        let descriptor =
            descriptor.ok_or_else(|| store_error(id, format!("missing array '{DESCRIPTOR}'")))?;
        if atom_features.width() != ONE_HOT_WIDTH {
            return Err(store_error(
                id,
                format!(
                    "'{ATOM_ONEHOT}' width {} does not match the encoding width {ONE_HOT_WIDTH}",
                    atom_features.width()
                ),
            ));
        }
        if atom_features.rows() != descriptor.rows() {
            return Err(store_error(id, "feature blocks disagree on atom count"));
        }

        Ok(StoredEntry {
            atom_features,
            descriptor,
            target,
        })
    }
}

fn store_error(id: &str, msg: impl Into<String>) -> DataError {
    DataError::Store {
        id: id.to_string(),
        msg: msg.into(),
    }
}

fn feature_block(
    shape: &[usize],
    values: Vec<f64>,
    id: &str,
    name: &str,
) -> Result<AtomFeatures, DataError> {
    if shape.len() != 2 {
        return Err(store_error(
            id,
            format!("'{name}' must be 2-dimensional, got shape {shape:?}"),
        ));
    }
    AtomFeatures::from_flat(values, shape[1])
        .filter(|b| b.rows() == shape[0])
        .ok_or_else(|| store_error(id, format!("'{name}' data does not match its shape")))
}

// Container format

/// Write named F64 arrays in safetensors layout.
fn write_arrays(
    writer: &mut impl Write,
    arrays: &[(&str, Vec<usize>, &[f64])],
) -> Result<(), std::io::Error> {
    let mut header = String::from("{\"__metadata__\":{\"format\":\"garnet\"}");
    let mut offset = 0usize;
    for (name, shape, data) in arrays {
        let start = offset;
        let end = start + data.len() * 8;
        offset = end;
        let dims: Vec<String> = shape.iter().map(ToString::to_string).collect();
        header.push_str(&format!(
            ",\"{name}\":{{\"dtype\":\"F64\",\"shape\":[{}],\"data_offsets\":[{start},{end}]}}",
            dims.join(",")
        ));
    }
    header.push('}');

    writer.write_all(&(header.len() as u64).to_le_bytes())?;
    writer.write_all(header.as_bytes())?;
    for (_, _, data) in arrays {
        for v in *data {
            writer.write_all(&v.to_le_bytes())?;
        }
    }
    Ok(())
}

/// Read named F64 arrays from safetensors layout.
fn read_arrays(reader: &mut impl Read) -> Result<Vec<(String, Vec<usize>, Vec<f64>)>, String> {
    let mut size_buf = [0u8; 8];
    reader
        .read_exact(&mut size_buf)
        .map_err(|e| format!("truncated header: {e}"))?;
    let header_size = u64::from_le_bytes(size_buf) as usize;
    if header_size > 10_000_000 {
        return Err(format!("header size {header_size} is unreasonably large"));
    }

    let mut header_bytes = vec![0u8; header_size];
    reader
        .read_exact(&mut header_bytes)
        .map_err(|e| format!("truncated header: {e}"))?;
    let header_str =
        std::str::from_utf8(&header_bytes).map_err(|e| format!("header is not UTF-8: {e}"))?;

    let value: serde_json::Value =
        serde_json::from_str(header_str).map_err(|e| format!("invalid JSON header: {e}"))?;
    let obj = value
        .as_object()
        .ok_or_else(|| "header is not a JSON object".to_string())?;

    struct Entry {
        name: String,
        shape: Vec<usize>,
        start: usize,
        end: usize,
    }

    let mut entries = Vec::new();
    for (key, val) in obj {
        if key == "__metadata__" {
            continue;
        }
        let arr = val
            .as_object()
            .ok_or_else(|| format!("entry '{key}' is not an object"))?;
        let dtype = arr
            .get("dtype")
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("'{key}' missing dtype"))?;
        if dtype != "F64" {
            return Err(format!("'{key}' has unsupported dtype {dtype}"));
        }
        let shape: Vec<usize> = arr
            .get("shape")
            .and_then(|v| v.as_array())
            .ok_or_else(|| format!("'{key}' missing shape"))?
            .iter()
            .map(|v| v.as_u64().unwrap_or(0) as usize)
            .collect();
        let offsets = arr
            .get("data_offsets")
            .and_then(|v| v.as_array())
            .ok_or_else(|| format!("'{key}' missing data_offsets"))?;
        if offsets.len() != 2 {
            return Err(format!("'{key}' data_offsets must have exactly 2 elements"));
        }
        entries.push(Entry {
            name: key.clone(),
            shape,
            start: offsets[0].as_u64().unwrap_or(0) as usize,
            end: offsets[1].as_u64().unwrap_or(0) as usize,
        });
    }

    let data_len = entries.iter().map(|e| e.end).max().unwrap_or(0);
    let mut raw = vec![0u8; data_len];
    if data_len > 0 {
        reader
            .read_exact(&mut raw)
            .map_err(|e| format!("truncated data: {e}"))?;
    }

    let mut arrays = Vec::with_capacity(entries.len());
    for e in entries {
        if e.start > e.end || e.end > raw.len() || (e.end - e.start) % 8 != 0 {
            return Err(format!("'{}' has invalid data offsets", e.name));
        }
        let expected = e.shape.iter().product::<usize>() * 8;
        if e.end - e.start != expected {
            return Err(format!("'{}' data length does not match its shape", e.name));
        }
        let values: Vec<f64> = raw[e.start..e.end]
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect();
        arrays.push((e.name, e.shape, values));
    }
    Ok(arrays)
}
