pub mod atom;
pub mod bonds;
pub mod cell;
pub mod connectivity;
pub mod structure;

use thiserror::Error;

use crate::io::{CifError, Value};
use crate::symmetry::SymmetryError;

/// Fatal structural-consistency errors raised while building or querying a
/// crystal structure.
#[derive(Debug, Error)]
pub enum StructureError {
    #[error("Invalid unit cell: {0}")]
    InvalidCell(String),

    #[error("No atom with label '{0}'")]
    UnknownAtomLabel(String),

    #[error("{kind} references unknown atom '{label}'")]
    DanglingReference { kind: &'static str, label: String },

    #[error("Atom '{label}' is Uani but has no row in the anisotropic loop")]
    MissingAnisoRow { label: String },

    #[error("Cannot transform displacement tensor: {0}")]
    AdpTransform(&'static str),

    #[error(transparent)]
    Cif(#[from] CifError),

    #[error(transparent)]
    Symmetry(#[from] SymmetryError),
}

/// Pulls a numeric scalar out of a CIF value, naming the tag on failure.
pub(crate) fn expect_f64(value: &Value, tag: &str) -> Result<f64, StructureError> {
    value.as_f64().ok_or_else(|| {
        CifError::NotNumeric {
            tag: tag.to_string(),
            got: value.to_string(),
        }
        .into()
    })
}
