// Symmetry functions — radial structure descriptors
//
// Each atom gets `num_features` radial symmetry functions
//
//   G_k(i) = Σ_j w_j · exp(-η (r_ij − R_k)²) · f_c(r_ij)
//
// with the cosine cutoff f_c(r) = ½(cos(π r / r_c) + 1), summed over all
// neighbors within the cutoff including periodic images (the atom's own
// home-cell image is excluded). Centers R_k are evenly spaced on
// [0, r_c]; w_j is 1, or the neighbor's atomic number in the
// species-weighted variant.

use std::f64::consts::PI;

use crate::error::Result;
use crate::features::AtomFeatures;
use crate::lattice::Lattice;
use crate::structure::Structure;

/// Configuration for the symmetry-function descriptor.
///
/// Parameters are fixed for the lifetime of a dataset instance.
#[derive(Debug, Clone)]
pub struct DescriptorConfig {
    /// Cutoff radius in Å.
    pub cutoff: f64,
    /// Number of radial features per atom.
    pub num_features: usize,
    /// Weight each neighbor contribution by its atomic number.
    pub species_weighted: bool,
}

impl Default for DescriptorConfig {
    fn default() -> Self {
        Self {
            cutoff: 6.0,
            num_features: 33,
            species_weighted: false,
        }
    }
}

impl DescriptorConfig {
    pub fn cutoff(mut self, r: f64) -> Self {
        self.cutoff = r;
        self
    }

    pub fn num_features(mut self, n: usize) -> Self {
        self.num_features = n;
        self
    }

    pub fn species_weighted(mut self, w: bool) -> Self {
        self.species_weighted = w;
        self
    }
}

/// Radial symmetry-function evaluator.
#[derive(Debug)]
pub struct SymmetryFunctions {
    config: DescriptorConfig,
    /// Gaussian centers, evenly spaced on [0, cutoff].
    centers: Vec<f64>,
    /// Shared Gaussian width parameter.
    eta: f64,
}

impl SymmetryFunctions {
    /// Create an evaluator for a fixed parameter set.
    ///
    /// # Panics
    /// Panics if the cutoff is not positive or `num_features` is zero.
    pub fn new(config: DescriptorConfig) -> Self {
        assert!(config.cutoff > 0.0, "cutoff must be positive");
        assert!(config.num_features > 0, "need at least one feature");
        let spacing = config.cutoff / config.num_features as f64;
        let centers = (0..config.num_features)
            .map(|k| k as f64 * spacing)
            .collect();
        let eta = 1.0 / (2.0 * spacing * spacing);
        Self {
            config,
            centers,
            eta,
        }
    }

    /// Features per atom.
    pub fn num_features(&self) -> usize {
        self.config.num_features
    }

    /// Compute the per-atom descriptor block for a structure.
    ///
    /// Output shape is `[structure.len(), num_features]` with row order
    /// equal to atom order. Deterministic: identical input produces
    /// identical output.
    ///
    /// # Errors
    /// Fails on a degenerate cell.
    pub fn compute(&self, structure: &Structure) -> Result<AtomFeatures> {
        let rcut = self.config.cutoff;
        let rcut_sq = rcut * rcut;
        let images = structure.lattice.images_for_cutoff(rcut)?;
        // Home cell first so the self-interaction check stays cheap.
        let shifts = image_shifts(&structure.lattice, images);

        let mut out = AtomFeatures::new(self.config.num_features);
        let mut row = vec![0.0f64; self.config.num_features];
        for i in 0..structure.len() {
            row.iter_mut().for_each(|v| *v = 0.0);
            let pos_i = structure.positions[i];
            for j in 0..structure.len() {
                let pos_j = structure.positions[j];
                let weight = if self.config.species_weighted {
                    structure.species[j] as f64
                } else {
                    1.0
                };
                for (s, shift) in shifts.iter().enumerate() {
                    if i == j && s == 0 {
                        continue;
                    }
                    let dx = pos_j[0] + shift[0] - pos_i[0];
                    let dy = pos_j[1] + shift[1] - pos_i[1];
                    let dz = pos_j[2] + shift[2] - pos_i[2];
                    let r_sq = dx * dx + dy * dy + dz * dz;
                    if r_sq >= rcut_sq {
                        continue;
                    }
                    let r = r_sq.sqrt();
                    let fc = 0.5 * ((PI * r / rcut).cos() + 1.0);
                    for (k, &center) in self.centers.iter().enumerate() {
                        let d = r - center;
                        row[k] += weight * (-self.eta * d * d).exp() * fc;
                    }
                }
            }
            out.push_row(&row);
        }
        Ok(out)
    }
}

/// All image translations within the given per-axis image counts, the
/// home cell (zero shift) first.
fn image_shifts(lattice: &Lattice, images: [i32; 3]) -> Vec<[f64; 3]> {
    let m = lattice.vectors();
    let mut shifts = vec![[0.0, 0.0, 0.0]];
    for na in -images[0]..=images[0] {
        for nb in -images[1]..=images[1] {
            for nc in -images[2]..=images[2] {
                if na == 0 && nb == 0 && nc == 0 {
                    continue;
                }
                let (fa, fb, fc) = (na as f64, nb as f64, nc as f64);
                shifts.push([
                    fa * m[0][0] + fb * m[1][0] + fc * m[2][0],
                    fa * m[0][1] + fb * m[1][1] + fc * m[2][1],
                    fa * m[0][2] + fb * m[1][2] + fc * m[2][2],
                ]);
            }
        }
    }
    shifts
}
