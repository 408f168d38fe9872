use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::{normalize_mode, ModifierError, ModifierMode, StructureModifier};
use crate::core::atom::Atom;
use crate::core::bonds::{Bond, HBond};
use crate::core::connectivity::ConnectedGroup;
use crate::core::structure::CrystalStructure;

/// Growth switch per edge family: grow it, leave it, or the family is not
/// present in the structure at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrowthMode {
    BondsYesHbondsYes,
    BondsYesHbondsNo,
    BondsNoHbondsYes,
    BondsNoHbondsNo,
    BondsYesHbondsNone,
    BondsNoHbondsNone,
    BondsNoneHbondsYes,
    BondsNoneHbondsNo,
    BondsNoneHbondsNone,
}

const GROWTH_MODES: &[GrowthMode] = &[
    GrowthMode::BondsYesHbondsYes,
    GrowthMode::BondsYesHbondsNo,
    GrowthMode::BondsNoHbondsYes,
    GrowthMode::BondsNoHbondsNo,
    GrowthMode::BondsYesHbondsNone,
    GrowthMode::BondsNoHbondsNone,
    GrowthMode::BondsNoneHbondsYes,
    GrowthMode::BondsNoneHbondsNo,
    GrowthMode::BondsNoneHbondsNone,
];

const GROWTH_FALLBACK: &[GrowthMode] = &[
    GrowthMode::BondsYesHbondsYes,
    GrowthMode::BondsYesHbondsNone,
    GrowthMode::BondsNoneHbondsYes,
    GrowthMode::BondsYesHbondsNo,
    GrowthMode::BondsNoHbondsYes,
    GrowthMode::BondsNoHbondsNo,
    GrowthMode::BondsNoHbondsNone,
    GrowthMode::BondsNoneHbondsNo,
    GrowthMode::BondsNoneHbondsNone,
];

impl GrowthMode {
    fn grow_bonds(self) -> bool {
        matches!(
            self,
            GrowthMode::BondsYesHbondsYes | GrowthMode::BondsYesHbondsNo | GrowthMode::BondsYesHbondsNone
        )
    }

    fn grow_h_bonds(self) -> bool {
        matches!(
            self,
            GrowthMode::BondsYesHbondsYes | GrowthMode::BondsNoHbondsYes | GrowthMode::BondsNoneHbondsYes
        )
    }
}

impl fmt::Display for GrowthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            GrowthMode::BondsYesHbondsYes => "bonds_yes_hbonds_yes",
            GrowthMode::BondsYesHbondsNo => "bonds_yes_hbonds_no",
            GrowthMode::BondsNoHbondsYes => "bonds_no_hbonds_yes",
            GrowthMode::BondsNoHbondsNo => "bonds_no_hbonds_no",
            GrowthMode::BondsYesHbondsNone => "bonds_yes_hbonds_none",
            GrowthMode::BondsNoHbondsNone => "bonds_no_hbonds_none",
            GrowthMode::BondsNoneHbondsYes => "bonds_none_hbonds_yes",
            GrowthMode::BondsNoneHbondsNo => "bonds_none_hbonds_no",
            GrowthMode::BondsNoneHbondsNone => "bonds_none_hbonds_none",
        };
        f.write_str(text)
    }
}

impl FromStr for GrowthMode {
    type Err = ModifierError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_mode(input);
        GROWTH_MODES
            .iter()
            .copied()
            .find(|mode| mode.to_string() == normalized)
            .ok_or_else(|| ModifierError::UnknownMode {
                filter: Self::FILTER_NAME,
                input: input.to_string(),
                valid: &[
                    "bonds_yes_hbonds_yes",
                    "bonds_yes_hbonds_no",
                    "bonds_no_hbonds_yes",
                    "bonds_no_hbonds_no",
                    "bonds_yes_hbonds_none",
                    "bonds_no_hbonds_none",
                    "bonds_none_hbonds_yes",
                    "bonds_none_hbonds_no",
                    "bonds_none_hbonds_none",
                ],
            })
    }
}

impl ModifierMode for GrowthMode {
    const FILTER_NAME: &'static str = "growth";

    fn all() -> &'static [Self] {
        GROWTH_MODES
    }

    fn fallback_order() -> &'static [Self] {
        GROWTH_FALLBACK
    }
}

/// Expands a structure by the symmetry mates its bonds and hydrogen bonds
/// point at. Grown atoms are labeled `original@code`, so one mate exists per
/// (atom, symmetry code) pair no matter how many edges reference it.
#[derive(Debug, Clone)]
pub struct SymmetryGrower {
    mode: GrowthMode,
}

/// Accumulates the output structure while groups are grown.
struct GrowthState {
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
    h_bonds: Vec<HBond>,
    labels: HashSet<String>,
    grown_keys: HashSet<String>,
}

impl SymmetryGrower {
    pub fn new(mode: GrowthMode) -> Self {
        Self { mode }
    }

    /// `(label, code)` pairs referenced by symmetry-coded bonds and hydrogen
    /// bonds, as two separate lists.
    pub fn find_growable_atoms(structure: &CrystalStructure) -> (Vec<(String, String)>, Vec<(String, String)>) {
        let bond_targets = structure
            .bonds
            .iter()
            .filter_map(|bond| {
                bond.atom2_site_symmetry
                    .as_ref()
                    .map(|code| (bond.atom2_label.clone(), code.clone()))
            })
            .collect();
        let h_bond_targets = structure
            .h_bonds
            .iter()
            .filter_map(|h_bond| {
                h_bond
                    .acceptor_atom_symmetry
                    .as_ref()
                    .map(|code| (h_bond.acceptor_label.clone(), code.clone()))
            })
            .collect();
        (bond_targets, h_bond_targets)
    }

    /// Grows the connected group behind every not-yet-grown `(label, code)`
    /// pair: the whole group is copied through the symmetry code, every copy
    /// relabeled `original@code`, and the group's own edges re-emitted with
    /// matching labels.
    fn grow_atom_array(
        structure: &CrystalStructure,
        targets: Vec<(String, String)>,
        state: &mut GrowthState,
    ) -> Result<(), ModifierError> {
        for (label, code) in targets {
            if state.grown_keys.contains(&grown_label(&label, &code)) {
                continue;
            }

            let group = find_group(structure, &label)
                .ok_or_else(|| ModifierError::GrowTargetNotFound(label.clone()))?;

            let mates = structure.symmetry.apply_symmetry(&code, &group.atoms)?;
            for mut mate in mates {
                // Every member of the group counts as grown under this code,
                // so later references to any of them are no-ops.
                state.grown_keys.insert(grown_label(&mate.label, &code));
                mate.label = grown_label(&mate.label, &code);
                if state.labels.insert(mate.label.clone()) {
                    state.atoms.push(mate);
                }
            }

            for bond in &group.bonds {
                state.bonds.push(Bond {
                    atom1_label: grown_label(&bond.atom1_label, &code),
                    atom2_label: grown_label(&bond.atom2_label, &code),
                    length: bond.length,
                    length_su: bond.length_su,
                    atom2_site_symmetry: None,
                });
            }
            for h_bond in &group.h_bonds {
                state.h_bonds.push(HBond {
                    donor_label: grown_label(&h_bond.donor_label, &code),
                    hydrogen_label: grown_label(&h_bond.hydrogen_label, &code),
                    acceptor_label: grown_label(&h_bond.acceptor_label, &code),
                    acceptor_atom_symmetry: None,
                    ..h_bond.clone()
                });
            }
        }
        Ok(())
    }
}

fn grown_label(label: &str, code: &str) -> String {
    format!("{label}@{code}")
}

fn find_group<'a>(structure: &'a CrystalStructure, label: &str) -> Option<&'a ConnectedGroup> {
    structure
        .connected_groups
        .iter()
        .find(|group| group.atoms.iter().any(|atom| atom.label == label))
}

impl StructureModifier for SymmetryGrower {
    type Mode = GrowthMode;

    fn mode(&self) -> GrowthMode {
        self.mode
    }

    fn set_mode(&mut self, mode: GrowthMode) {
        self.mode = mode;
    }

    fn applicable_modes(&self, structure: &CrystalStructure) -> Vec<GrowthMode> {
        let has_bonds = structure.bonds.iter().any(|b| b.atom2_site_symmetry.is_some());
        let has_h_bonds = structure
            .h_bonds
            .iter()
            .any(|h| h.acceptor_atom_symmetry.is_some());
        match (has_bonds, has_h_bonds) {
            (true, true) => vec![
                GrowthMode::BondsYesHbondsYes,
                GrowthMode::BondsYesHbondsNo,
                GrowthMode::BondsNoHbondsYes,
                GrowthMode::BondsNoHbondsNo,
            ],
            (true, false) => vec![GrowthMode::BondsYesHbondsNone, GrowthMode::BondsNoHbondsNone],
            (false, true) => vec![GrowthMode::BondsNoneHbondsYes, GrowthMode::BondsNoneHbondsNo],
            (false, false) => vec![GrowthMode::BondsNoneHbondsNone],
        }
    }

    fn apply(&mut self, structure: &CrystalStructure) -> Result<CrystalStructure, ModifierError> {
        self.ensure_valid_mode(structure);

        for atom in &structure.atoms {
            if atom.label.contains('@') {
                return Err(ModifierError::ReservedLabelCharacter(atom.label.clone()));
            }
        }

        let mut state = GrowthState {
            atoms: structure.atoms.clone(),
            bonds: structure.bonds.clone(),
            h_bonds: structure.h_bonds.clone(),
            labels: structure.atoms.iter().map(|atom| atom.label.clone()).collect(),
            grown_keys: HashSet::new(),
        };

        let (bond_targets, h_bond_targets) = Self::find_growable_atoms(structure);
        if self.mode.grow_bonds() {
            Self::grow_atom_array(structure, bond_targets, &mut state)?;
        }
        if self.mode.grow_h_bonds() {
            Self::grow_atom_array(structure, h_bond_targets, &mut state)?;
        }

        // Materialize direct edges to every symmetry-coded far end that now
        // exists among the (possibly grown) atoms.
        for bond in &structure.bonds {
            if let Some(code) = &bond.atom2_site_symmetry {
                let target = grown_label(&bond.atom2_label, code);
                if state.labels.contains(&target) {
                    state.bonds.push(Bond {
                        atom1_label: bond.atom1_label.clone(),
                        atom2_label: target,
                        length: bond.length,
                        length_su: bond.length_su,
                        atom2_site_symmetry: None,
                    });
                }
            }
        }
        for h_bond in &structure.h_bonds {
            if let Some(code) = &h_bond.acceptor_atom_symmetry {
                let target = grown_label(&h_bond.acceptor_label, code);
                if state.labels.contains(&target) {
                    state.h_bonds.push(HBond {
                        acceptor_label: target,
                        acceptor_atom_symmetry: None,
                        ..h_bond.clone()
                    });
                }
            }
        }

        CrystalStructure::new(
            structure.cell.clone(),
            state.atoms,
            state.bonds,
            state.h_bonds,
            structure.symmetry.clone(),
        )
        .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CifDocument;

    const STRUCTURE: &str = concat!(
        "data_test\n",
        "_cell_length_a 10.0\n_cell_length_b 10.0\n_cell_length_c 10.0\n",
        "_cell_angle_alpha 90\n_cell_angle_beta 90\n_cell_angle_gamma 90\n",
        "loop_\n",
        "_space_group_symop_operation_xyz\n",
        "'x, y, z'\n",
        "'-x, -y, -z'\n",
        "loop_\n",
        "_atom_site_label\n_atom_site_type_symbol\n",
        "_atom_site_fract_x\n_atom_site_fract_y\n_atom_site_fract_z\n",
        "C1 C 0.1 0.2 0.3\n",
        "O1 O 0.2 0.3 0.4\n",
        "F1 F 0.6 0.6 0.6\n",
        "loop_\n",
        "_geom_bond_atom_site_label_1\n",
        "_geom_bond_atom_site_label_2\n",
        "_geom_bond_distance\n",
        "_geom_bond_site_symmetry_2\n",
        "C1 O1 1.43 .\n",
        "C1 F1 1.35 2_655\n",
        "O1 F1 1.40 2_655\n",
    );

    fn structure() -> CrystalStructure {
        let mut doc = CifDocument::parse(STRUCTURE);
        CrystalStructure::from_cif(doc.get_block(0).unwrap()).unwrap()
    }

    #[test]
    fn none_mode_changes_nothing() {
        let source = structure();
        let mut grower = SymmetryGrower::new(GrowthMode::BondsNoHbondsNone);
        let grown = grower.apply(&source).unwrap();
        assert_eq!(grown.atoms.len(), source.atoms.len());
        assert_eq!(grown.bonds.len(), source.bonds.len());
        assert_eq!(grown.h_bonds.len(), source.h_bonds.len());
    }

    #[test]
    fn growth_adds_one_mate_per_label_code_pair() {
        let source = structure();
        let mut grower = SymmetryGrower::new(GrowthMode::BondsYesHbondsNone);
        let grown = grower.apply(&source).unwrap();

        // Two symmetry bonds reference the same (F1, 2_655) pair: one mate.
        assert_eq!(grown.atoms.len(), 4);
        let mate = grown.get_atom_by_label("F1@2_655").unwrap();
        // -x,-y,-z on (0.6,0.6,0.6), then +1 cell along a.
        assert!((mate.position[0] - 0.4).abs() < 1e-12);
        assert!((mate.position[1] + 0.6).abs() < 1e-12);
        assert!((mate.position[2] + 0.6).abs() < 1e-12);

        // Both symmetry edges materialize against the mate.
        let direct: Vec<&Bond> = grown
            .bonds
            .iter()
            .filter(|b| b.atom2_label == "F1@2_655")
            .collect();
        assert_eq!(direct.len(), 2);
        assert!(direct.iter().all(|b| b.atom2_site_symmetry.is_none()));
    }

    #[test]
    fn grown_mate_joins_connected_groups() {
        let source = structure();
        let mut grower = SymmetryGrower::new(GrowthMode::BondsYesHbondsNone);
        let grown = grower.apply(&source).unwrap();
        // C1-O1 fragment now reaches F1@2_655 through the materialized bonds.
        let group = grown
            .connected_groups
            .iter()
            .find(|g| g.atoms.iter().any(|a| a.label == "C1"))
            .unwrap();
        assert!(group.atoms.iter().any(|a| a.label == "F1@2_655"));
    }

    #[test]
    fn applicable_modes_collapse_to_present_families() {
        let source = structure();
        let grower = SymmetryGrower::new(GrowthMode::BondsNoneHbondsNone);
        assert_eq!(
            grower.applicable_modes(&source),
            vec![GrowthMode::BondsYesHbondsNone, GrowthMode::BondsNoHbondsNone]
        );
    }

    #[test]
    fn reserved_label_character_is_rejected() {
        let source = structure();
        let mut grower = SymmetryGrower::new(GrowthMode::BondsYesHbondsNone);
        let grown = grower.apply(&source).unwrap();
        // Re-growing an already-grown structure would double-suffix labels.
        let mut again = SymmetryGrower::new(GrowthMode::BondsYesHbondsNone);
        assert!(matches!(
            again.apply(&grown),
            Err(ModifierError::ReservedLabelCharacter(_))
        ));
    }

    #[test]
    fn mode_strings_round_trip() {
        for mode in GrowthMode::all() {
            assert_eq!(mode.to_string().parse::<GrowthMode>().unwrap(), *mode);
        }
        assert_eq!(
            "bonds-yes-hbonds-no".parse::<GrowthMode>().unwrap(),
            GrowthMode::BondsYesHbondsNo
        );
    }
}
