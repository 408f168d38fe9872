pub mod disorder;
pub mod growth;
pub mod hydrogen;

pub use disorder::{DisorderFilter, DisorderMode};
pub use growth::{GrowthMode, SymmetryGrower};
pub use hydrogen::{HydrogenFilter, HydrogenMode};

use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

use crate::core::structure::CrystalStructure;
use crate::core::StructureError;
use crate::symmetry::SymmetryError;

#[derive(Debug, Error)]
pub enum ModifierError {
    #[error("Unknown {filter} mode '{input}'; expected one of {valid:?}")]
    UnknownMode {
        filter: &'static str,
        input: String,
        valid: &'static [&'static str],
    },

    #[error("Atom label '{0}' contains '@', which is reserved for symmetry-grown copies")]
    ReservedLabelCharacter(String),

    #[error("No connected group contains atom '{0}'")]
    GrowTargetNotFound(String),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error(transparent)]
    Symmetry(#[from] SymmetryError),
}

/// A filter's mode enum: a closed set with a preferred fallback order.
/// `FromStr` accepts any case and treats `-`, ` `, and `_` alike; unknown
/// strings are fatal.
pub trait ModifierMode: Copy + Eq + Display + FromStr<Err = ModifierError> + 'static {
    const FILTER_NAME: &'static str;

    fn all() -> &'static [Self];

    /// Order in which to pick a replacement when the current mode stops
    /// being applicable.
    fn fallback_order() -> &'static [Self];
}

/// Canonical form used by every mode's `FromStr`.
pub(crate) fn normalize_mode(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

/// The mode-validated structure transformation contract.
///
/// `apply` is pure with respect to the structure: it builds and returns a
/// new `CrystalStructure`, never mutating its input. The only self-mutation
/// is the mode self-healing, which logs instead of failing.
pub trait StructureModifier {
    type Mode: ModifierMode;

    fn mode(&self) -> Self::Mode;

    fn set_mode(&mut self, mode: Self::Mode);

    /// The subset of modes meaningful for this structure.
    fn applicable_modes(&self, structure: &CrystalStructure) -> Vec<Self::Mode>;

    fn apply(&mut self, structure: &CrystalStructure) -> Result<CrystalStructure, ModifierError>;

    /// Silently switches to the first applicable mode (preferring the
    /// fallback order) when the current one does not apply.
    fn ensure_valid_mode(&mut self, structure: &CrystalStructure) {
        let applicable = self.applicable_modes(structure);
        if applicable.contains(&self.mode()) {
            return;
        }
        let replacement = Self::Mode::fallback_order()
            .iter()
            .copied()
            .find(|mode| applicable.contains(mode))
            .or_else(|| applicable.first().copied());
        if let Some(next) = replacement {
            log::info!(
                "{} mode '{}' is not applicable to this structure; switching to '{}'",
                Self::Mode::FILTER_NAME,
                self.mode(),
                next
            );
            self.set_mode(next);
        }
    }

    /// Advances to the next applicable mode, wrapping around.
    fn cycle_mode(&mut self, structure: &CrystalStructure) -> Self::Mode {
        self.ensure_valid_mode(structure);
        let applicable = self.applicable_modes(structure);
        if applicable.is_empty() {
            return self.mode();
        }
        let position = applicable
            .iter()
            .position(|mode| *mode == self.mode())
            .unwrap_or(0);
        let next = applicable[(position + 1) % applicable.len()];
        self.set_mode(next);
        next
    }
}
