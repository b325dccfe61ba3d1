// Structure — crystal structures and a minimal CIF reader
//
// The reader supports the subset of CIF that crystal-property datasets
// use in practice: the six `_cell_*` items and one `loop_` of atom sites
// with fractional coordinates. Multi-line values, symmetry operations,
// and gzip-compressed files are out of scope.

use std::fs;
use std::path::Path;

use crate::element;
use crate::error::{Error, Result};
use crate::lattice::Lattice;

/// A periodic crystal structure.
///
/// `positions` are cartesian (Å) and `species[i]` is the atomic number of
/// atom `i`; the two vectors always have equal length.
#[derive(Debug, Clone)]
pub struct Structure {
    pub lattice: Lattice,
    pub positions: Vec<[f64; 3]>,
    pub species: Vec<u8>,
}

impl Structure {
    /// Number of atoms.
    pub fn len(&self) -> usize {
        self.species.len()
    }

    /// Whether the structure has no atoms.
    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Load a structure from a CIF file.
    pub fn from_cif_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = fs::read_to_string(path)?;
        Self::from_cif_str(&contents)
    }

    /// Parse a structure from CIF contents.
    ///
    /// Reads `_cell_length_{a,b,c}` and `_cell_angle_{alpha,beta,gamma}`
    /// (numeric values may carry a `(…)` uncertainty suffix) plus the
    /// `loop_` containing `_atom_site_fract_{x,y,z}` and
    /// `_atom_site_type_symbol` (falling back to `_atom_site_label`).
    /// Everything else is ignored.
    pub fn from_cif_str(contents: &str) -> Result<Self> {
        let mut cell: [Option<f64>; 6] = [None; 6];
        let mut site_headers: Vec<String> = Vec::new();
        let mut site_rows: Vec<(usize, Vec<String>)> = Vec::new();

        let mut lines = contents.lines().enumerate().peekable();
        while let Some((idx, raw)) = lines.next() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with('_') {
                // Single data item: `_tag value`
                let mut parts = line.split_whitespace();
                let tag = parts.next().unwrap_or("");
                if let (Some(slot), Some(value)) = (cell_slot(tag), parts.next()) {
                    cell[slot] = Some(parse_cif_number(value).ok_or_else(|| Error::Parse {
                        line: idx + 1,
                        msg: format!("invalid numeric value '{value}' for {tag}"),
                    })?);
                }
                continue;
            }

            if line.eq_ignore_ascii_case("loop_") {
                let mut headers: Vec<String> = Vec::new();
                while let Some(&(_, peeked)) = lines.peek() {
                    let tag = peeked.trim();
                    if !tag.starts_with('_') {
                        break;
                    }
                    headers.push(tag.split_whitespace().next().unwrap_or(tag).to_string());
                    lines.next();
                }
                let is_site_loop = headers.iter().any(|h| h == "_atom_site_fract_x");
                while let Some(&(ridx, peeked)) = lines.peek() {
                    let row = peeked.trim();
                    if row.is_empty()
                        || row.starts_with('_')
                        || row.starts_with('#')
                        || row.starts_with("data_")
                        || row.eq_ignore_ascii_case("loop_")
                    {
                        break;
                    }
                    lines.next();
                    if is_site_loop {
                        let tokens = row.split_whitespace().map(str::to_string).collect();
                        site_rows.push((ridx + 1, tokens));
                    }
                }
                if is_site_loop {
                    site_headers = headers;
                }
                continue;
            }
            // data_ block names and free text: ignored
        }

        let cell_names = [
            "_cell_length_a",
            "_cell_length_b",
            "_cell_length_c",
            "_cell_angle_alpha",
            "_cell_angle_beta",
            "_cell_angle_gamma",
        ];
        let mut values = [0.0f64; 6];
        for i in 0..6 {
            values[i] =
                cell[i].ok_or_else(|| Error::msg(format!("CIF missing {}", cell_names[i])))?;
        }
        let lattice = Lattice::from_parameters(
            values[0], values[1], values[2], values[3], values[4], values[5],
        );
        if lattice.volume() <= f64::EPSILON {
            return Err(Error::DegenerateCell);
        }

        if site_headers.is_empty() {
            return Err(Error::msg("CIF contains no _atom_site loop"));
        }
        let column = |tag: &str| site_headers.iter().position(|h| h == tag);
        let fx = column("_atom_site_fract_x")
            .ok_or_else(|| Error::msg("CIF atom loop missing _atom_site_fract_x"))?;
        let fy = column("_atom_site_fract_y")
            .ok_or_else(|| Error::msg("CIF atom loop missing _atom_site_fract_y"))?;
        let fz = column("_atom_site_fract_z")
            .ok_or_else(|| Error::msg("CIF atom loop missing _atom_site_fract_z"))?;
        let symbol_col = column("_atom_site_type_symbol")
            .or_else(|| column("_atom_site_label"))
            .ok_or_else(|| {
                Error::msg("CIF atom loop has neither _atom_site_type_symbol nor _atom_site_label")
            })?;

        let mut positions = Vec::with_capacity(site_rows.len());
        let mut species = Vec::with_capacity(site_rows.len());
        for (line, tokens) in &site_rows {
            if tokens.len() != site_headers.len() {
                return Err(Error::Parse {
                    line: *line,
                    msg: format!(
                        "expected {} columns, got {}",
                        site_headers.len(),
                        tokens.len()
                    ),
                });
            }
            let mut frac = [0.0f64; 3];
            for (axis, col) in [fx, fy, fz].into_iter().enumerate() {
                frac[axis] = parse_cif_number(&tokens[col]).ok_or_else(|| Error::Parse {
                    line: *line,
                    msg: format!("invalid fractional coordinate '{}'", tokens[col]),
                })?;
            }
            let symbol = element_prefix(&tokens[symbol_col]);
            let z = element::symbol_to_number(symbol).ok_or_else(|| Error::UnknownElement {
                symbol: symbol.to_string(),
            })?;
            positions.push(lattice.fractional_to_cartesian(frac));
            species.push(z);
        }

        if species.is_empty() {
            return Err(Error::EmptyStructure);
        }
        Ok(Self {
            lattice,
            positions,
            species,
        })
    }
}

fn cell_slot(tag: &str) -> Option<usize> {
    match tag {
        "_cell_length_a" => Some(0),
        "_cell_length_b" => Some(1),
        "_cell_length_c" => Some(2),
        "_cell_angle_alpha" => Some(3),
        "_cell_angle_beta" => Some(4),
        "_cell_angle_gamma" => Some(5),
        _ => None,
    }
}

/// Parse a CIF numeric value, stripping a trailing `(u)` uncertainty.
fn parse_cif_number(token: &str) -> Option<f64> {
    let token = token.split('(').next().unwrap_or(token);
    token.parse().ok()
}

/// Leading alphabetic prefix of an atom-site symbol ("Fe3+" -> "Fe", "O1" -> "O").
fn element_prefix(token: &str) -> &str {
    let end = token
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(token.len());
    &token[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROCKSALT: &str = "\
data_NaCl
_cell_length_a 5.64(2)
_cell_length_b 5.64
_cell_length_c 5.64
_cell_angle_alpha 90.0
_cell_angle_beta 90.0
_cell_angle_gamma 90.0

loop_
_atom_site_label
_atom_site_type_symbol
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
Na1 Na 0.0 0.0 0.0
Cl1 Cl- 0.5 0.5 0.5
";

    #[test]
    fn parse_rocksalt() {
        let s = Structure::from_cif_str(ROCKSALT).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s.species, vec![11, 17]);
        // Cl at fractional (0.5, 0.5, 0.5) in a 5.64 Å cubic cell
        assert!((s.positions[1][0] - 2.82).abs() < 1e-9);
        assert!((s.positions[1][1] - 2.82).abs() < 1e-9);
        assert!((s.positions[1][2] - 2.82).abs() < 1e-9);
        assert!((s.lattice.volume() - 5.64f64.powi(3)).abs() < 1e-9);
    }

    #[test]
    fn label_fallback_strips_digits() {
        let cif = "\
_cell_length_a 4.0
_cell_length_b 4.0
_cell_length_c 4.0
_cell_angle_alpha 90
_cell_angle_beta 90
_cell_angle_gamma 90
loop_
_atom_site_label
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
Si2 0.0 0.0 0.0
";
        let s = Structure::from_cif_str(cif).unwrap();
        assert_eq!(s.species, vec![14]);
    }

    #[test]
    fn missing_cell_item() {
        let cif = "\
_cell_length_a 4.0
_cell_length_b 4.0
_cell_angle_alpha 90
_cell_angle_beta 90
_cell_angle_gamma 90
loop_
_atom_site_label
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
Si 0.0 0.0 0.0
";
        let err = Structure::from_cif_str(cif).unwrap_err();
        assert!(err.to_string().contains("_cell_length_c"));
    }

    #[test]
    fn unknown_element_fatal() {
        let cif = ROCKSALT.replace("Na1 Na", "Qq1 Qq");
        let err = Structure::from_cif_str(&cif).unwrap_err();
        assert!(matches!(err, Error::UnknownElement { .. }));
    }

    #[test]
    fn malformed_coordinate_fatal() {
        let cif = ROCKSALT.replace("0.5 0.5 0.5", "0.5 zzz 0.5");
        let err = Structure::from_cif_str(&cif).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn no_atom_loop_fatal() {
        let cif = "\
_cell_length_a 4.0
_cell_length_b 4.0
_cell_length_c 4.0
_cell_angle_alpha 90
_cell_angle_beta 90
_cell_angle_gamma 90
";
        let err = Structure::from_cif_str(cif).unwrap_err();
        assert!(err.to_string().contains("no _atom_site loop"));
    }

    #[test]
    fn missing_file() {
        let err = Structure::from_cif_file("/nonexistent/abc.cif").unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }

    #[test]
    fn non_site_loops_ignored() {
        let cif = format!(
            "loop_\n_symmetry_equiv_pos_as_xyz\n'x, y, z'\n\n{ROCKSALT}"
        );
        let s = Structure::from_cif_str(&cif).unwrap();
        assert_eq!(s.len(), 2);
    }
}
