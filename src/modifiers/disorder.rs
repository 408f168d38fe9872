use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::{normalize_mode, ModifierError, ModifierMode, StructureModifier};
use crate::core::atom::Atom;
use crate::core::structure::CrystalStructure;

/// Which disorder groups are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisorderMode {
    /// Show every disorder component.
    All,
    /// Hide atoms in groups above 1.
    Group1,
    /// Hide atoms in group 1.
    Group2,
}

const DISORDER_MODES: &[DisorderMode] = &[DisorderMode::All, DisorderMode::Group1, DisorderMode::Group2];
const DISORDER_FALLBACK: &[DisorderMode] = &[DisorderMode::All];

impl fmt::Display for DisorderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DisorderMode::All => "all",
            DisorderMode::Group1 => "group1",
            DisorderMode::Group2 => "group2",
        };
        f.write_str(text)
    }
}

impl FromStr for DisorderMode {
    type Err = ModifierError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match normalize_mode(input).as_str() {
            "all" => Ok(DisorderMode::All),
            "group1" | "group_1" => Ok(DisorderMode::Group1),
            "group2" | "group_2" => Ok(DisorderMode::Group2),
            _ => Err(ModifierError::UnknownMode {
                filter: Self::FILTER_NAME,
                input: input.to_string(),
                valid: &["all", "group1", "group2"],
            }),
        }
    }
}

impl ModifierMode for DisorderMode {
    const FILTER_NAME: &'static str = "disorder";

    fn all() -> &'static [Self] {
        DISORDER_MODES
    }

    fn fallback_order() -> &'static [Self] {
        DISORDER_FALLBACK
    }
}

/// Disorder-component filter.
#[derive(Debug, Clone)]
pub struct DisorderFilter {
    mode: DisorderMode,
}

impl DisorderFilter {
    pub fn new(mode: DisorderMode) -> Self {
        Self { mode }
    }

    fn excludes(&self, atom: &Atom) -> bool {
        match self.mode {
            DisorderMode::All => false,
            DisorderMode::Group1 => atom.disorder_group > 1,
            DisorderMode::Group2 => atom.disorder_group == 1,
        }
    }
}

impl StructureModifier for DisorderFilter {
    type Mode = DisorderMode;

    fn mode(&self) -> DisorderMode {
        self.mode
    }

    fn set_mode(&mut self, mode: DisorderMode) {
        self.mode = mode;
    }

    fn applicable_modes(&self, structure: &CrystalStructure) -> Vec<DisorderMode> {
        let mut modes = vec![DisorderMode::All];
        if structure.atoms.iter().any(|atom| atom.disorder_group > 1) {
            modes.push(DisorderMode::Group1);
        }
        if structure.atoms.iter().any(|atom| atom.disorder_group == 1) {
            modes.push(DisorderMode::Group2);
        }
        modes
    }

    fn apply(&mut self, structure: &CrystalStructure) -> Result<CrystalStructure, ModifierError> {
        self.ensure_valid_mode(structure);

        let removed: HashSet<&str> = structure
            .atoms
            .iter()
            .filter(|atom| self.excludes(atom))
            .map(|atom| atom.label.as_str())
            .collect();

        let atoms: Vec<Atom> = structure
            .atoms
            .iter()
            .filter(|atom| !self.excludes(atom))
            .cloned()
            .collect();
        let bonds = structure
            .bonds
            .iter()
            .filter(|bond| {
                !removed.contains(bond.atom1_label.as_str())
                    && !removed.contains(bond.atom2_label.as_str())
            })
            .cloned()
            .collect();
        let h_bonds = structure
            .h_bonds
            .iter()
            .filter(|h_bond| {
                !removed.contains(h_bond.donor_label.as_str())
                    && !removed.contains(h_bond.hydrogen_label.as_str())
                    && !removed.contains(h_bond.acceptor_label.as_str())
            })
            .cloned()
            .collect();

        CrystalStructure::new(
            structure.cell.clone(),
            atoms,
            bonds,
            h_bonds,
            structure.symmetry.clone(),
        )
        .map_err(Into::into)
    }
}
