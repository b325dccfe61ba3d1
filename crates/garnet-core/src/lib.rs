//! # garnet-core
//!
//! Crystal-structure primitives for Garnet.
//!
//! This crate provides:
//! - [`Structure`] — atoms, cartesian positions, and lattice read from CIF files
//! - [`Lattice`] — cell vectors, fractional conversion, periodic image counts
//! - [`AtomFeatures`] — row-major per-atom feature blocks
//! - [`one_hot`] / [`encode_species`] — the 104-slot element encoding
//! - [`SymmetryFunctions`] — radial symmetry-function descriptors

pub mod descriptor;
pub mod element;
pub mod error;
pub mod features;
pub mod lattice;
pub mod structure;

pub use descriptor::{DescriptorConfig, SymmetryFunctions};
pub use element::{encode_species, number_to_symbol, one_hot, symbol_to_number, ONE_HOT_WIDTH};
pub use error::{Error, Result};
pub use features::AtomFeatures;
pub use lattice::Lattice;
pub use structure::Structure;
