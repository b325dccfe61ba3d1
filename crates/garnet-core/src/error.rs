use std::path::PathBuf;

/// All errors that can occur within garnet-core.
///
/// This enum captures every failure mode of the structure layer: missing
/// or malformed CIF files, unknown element symbols, and degenerate cells.
/// Using a single error type across the crate simplifies error propagation.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The structure file for an identifier does not exist.
    #[error("structure file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    /// A CIF line could not be interpreted.
    #[error("CIF parse error at line {line}: {msg}")]
    Parse { line: usize, msg: String },

    /// An atom-site symbol is outside the element table.
    #[error("unknown element symbol '{symbol}'")]
    UnknownElement { symbol: String },

    /// The lattice vectors are linearly dependent (zero cell volume).
    #[error("degenerate cell: lattice vectors are linearly dependent")]
    DegenerateCell,

    /// The structure contains no atoms.
    #[error("structure contains no atoms")]
    EmptyStructure,

    /// Generic error with a message.
    #[error("{0}")]
    Msg(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a generic error from a message.
    pub fn msg(msg: impl Into<String>) -> Self {
        Error::Msg(msg.into())
    }
}

/// Convenience alias used throughout garnet-core.
pub type Result<T> = std::result::Result<T, Error>;
