pub mod operation;
pub mod space_group;

pub use operation::SymmetryOperation;
pub use space_group::CellSymmetry;

use thiserror::Error;

use crate::io::CifError;

/// Fatal errors from symmetry parsing and application.
#[derive(Debug, Error)]
pub enum SymmetryError {
    #[error("Symmetry instruction '{0}' must have exactly 3 comma-separated components")]
    ComponentCount(String),

    #[error("Cannot parse term '{term}' of symmetry instruction '{instruction}'")]
    BadTerm { instruction: String, term: String },

    #[error("Invalid symmetry code '{0}': expected '<operation>_<3 digits>'")]
    BadCode(String),

    #[error("Symmetry code selects operation {selected}, but only {available} operations exist")]
    OperationOutOfRange { selected: usize, available: usize },

    #[error(transparent)]
    Cif(#[from] CifError),
}
