use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use super::{normalize_mode, ModifierError, ModifierMode, StructureModifier};
use crate::core::atom::{Adp, Atom};
use crate::core::structure::CrystalStructure;

/// How hydrogen atoms are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HydrogenMode {
    /// Drop hydrogens and everything touching them.
    None,
    /// Keep hydrogens but strip their displacement parameters.
    Constant,
    /// Keep hydrogens exactly as refined.
    Anisotropic,
}

const HYDROGEN_MODES: &[HydrogenMode] = &[
    HydrogenMode::None,
    HydrogenMode::Constant,
    HydrogenMode::Anisotropic,
];
const HYDROGEN_FALLBACK: &[HydrogenMode] = &[HydrogenMode::Constant, HydrogenMode::None];

impl fmt::Display for HydrogenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            HydrogenMode::None => "none",
            HydrogenMode::Constant => "constant",
            HydrogenMode::Anisotropic => "anisotropic",
        };
        f.write_str(text)
    }
}

impl FromStr for HydrogenMode {
    type Err = ModifierError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match normalize_mode(input).as_str() {
            "none" => Ok(HydrogenMode::None),
            "constant" => Ok(HydrogenMode::Constant),
            "anisotropic" => Ok(HydrogenMode::Anisotropic),
            _ => Err(ModifierError::UnknownMode {
                filter: Self::FILTER_NAME,
                input: input.to_string(),
                valid: &["none", "constant", "anisotropic"],
            }),
        }
    }
}

impl ModifierMode for HydrogenMode {
    const FILTER_NAME: &'static str = "hydrogen";

    fn all() -> &'static [Self] {
        HYDROGEN_MODES
    }

    fn fallback_order() -> &'static [Self] {
        HYDROGEN_FALLBACK
    }
}

/// Hydrogen display filter.
#[derive(Debug, Clone)]
pub struct HydrogenFilter {
    mode: HydrogenMode,
}

impl HydrogenFilter {
    pub fn new(mode: HydrogenMode) -> Self {
        Self { mode }
    }
}

fn is_hydrogen(atom: &Atom) -> bool {
    atom.element == "H"
}

impl StructureModifier for HydrogenFilter {
    type Mode = HydrogenMode;

    fn mode(&self) -> HydrogenMode {
        self.mode
    }

    fn set_mode(&mut self, mode: HydrogenMode) {
        self.mode = mode;
    }

    fn applicable_modes(&self, structure: &CrystalStructure) -> Vec<HydrogenMode> {
        let mut modes = vec![HydrogenMode::None];
        if structure.atoms.iter().any(is_hydrogen) {
            modes.push(HydrogenMode::Constant);
            let any_aniso_hydrogen = structure
                .atoms
                .iter()
                .any(|atom| is_hydrogen(atom) && matches!(atom.adp, Some(Adp::Ani(_))));
            if any_aniso_hydrogen {
                modes.push(HydrogenMode::Anisotropic);
            }
        }
        modes
    }

    fn apply(&mut self, structure: &CrystalStructure) -> Result<CrystalStructure, ModifierError> {
        self.ensure_valid_mode(structure);

        let (atoms, bonds, h_bonds) = match self.mode {
            HydrogenMode::None => {
                let removed: HashSet<&str> = structure
                    .atoms
                    .iter()
                    .filter(|atom| is_hydrogen(atom))
                    .map(|atom| atom.label.as_str())
                    .collect();
                let atoms: Vec<Atom> = structure
                    .atoms
                    .iter()
                    .filter(|atom| !is_hydrogen(atom))
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
                (atoms, bonds, h_bonds)
            }
            HydrogenMode::Constant => {
                let atoms = structure
                    .atoms
                    .iter()
                    .map(|atom| {
                        let mut atom = atom.clone();
                        if is_hydrogen(&atom) {
                            atom.adp = None;
                        }
                        atom
                    })
                    .collect();
                (atoms, structure.bonds.clone(), structure.h_bonds.clone())
            }
            HydrogenMode::Anisotropic => (
                structure.atoms.clone(),
                structure.bonds.clone(),
                structure.h_bonds.clone(),
            ),
        };

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CifDocument;

    const STRUCTURE: &str = concat!(
        "data_test\n",
        "_cell_length_a 10.0\n_cell_length_b 10.0\n_cell_length_c 10.0\n",
        "_cell_angle_alpha 90\n_cell_angle_beta 90\n_cell_angle_gamma 90\n",
        "loop_\n",
        "_atom_site_label\n_atom_site_type_symbol\n",
        "_atom_site_fract_x\n_atom_site_fract_y\n_atom_site_fract_z\n",
        "_atom_site_adp_type\n_atom_site_U_iso_or_equiv\n",
        "C1 C 0.1 0.2 0.3 Uiso 0.025\n",
        "O1 O 0.2 0.3 0.4 Uiso 0.030\n",
        "H1 H 0.15 0.25 0.35 Uiso 0.050\n",
        "loop_\n",
        "_geom_bond_atom_site_label_1\n",
        "_geom_bond_atom_site_label_2\n",
        "_geom_bond_distance\n",
        "C1 O1 1.43\n",
        "C1 H1 0.95\n",
        "loop_\n",
        "_geom_hbond_atom_site_label_D\n",
        "_geom_hbond_atom_site_label_H\n",
        "_geom_hbond_atom_site_label_A\n",
        "_geom_hbond_distance_DH\n",
        "_geom_hbond_distance_HA\n",
        "_geom_hbond_distance_DA\n",
        "_geom_hbond_angle_DHA\n",
        "C1 H1 O1 0.95 2.0 2.8 150.0\n",
    );

    fn structure() -> CrystalStructure {
        let mut doc = CifDocument::parse(STRUCTURE);
        CrystalStructure::from_cif(doc.get_block(0).unwrap()).unwrap()
    }

    #[test]
    fn none_drops_hydrogens_and_incident_edges() {
        let source = structure();
        let mut filter = HydrogenFilter::new(HydrogenMode::None);
        let filtered = filter.apply(&source).unwrap();
        assert_eq!(filtered.atoms.len(), 2);
        assert!(filtered.atoms.iter().all(|atom| atom.element != "H"));
        assert_eq!(filtered.bonds.len(), 1);
        assert!(filtered.h_bonds.is_empty());
    }

    #[test]
    fn constant_strips_hydrogen_adps_only() {
        let source = structure();
        let mut filter = HydrogenFilter::new(HydrogenMode::Constant);
        let filtered = filter.apply(&source).unwrap();
        assert_eq!(filtered.atoms.len(), 3);
        assert_eq!(filtered.get_atom_by_label("H1").unwrap().adp, None);
        assert_eq!(
            filtered.get_atom_by_label("C1").unwrap().adp,
            Some(Adp::Iso(0.025))
        );
    }

    #[test]
    fn anisotropic_mode_self_heals_without_aniso_hydrogens() {
        let source = structure();
        let mut filter = HydrogenFilter::new(HydrogenMode::Anisotropic);
        // No hydrogen carries an anisotropic ADP, so the mode falls back.
        let filtered = filter.apply(&source).unwrap();
        assert_eq!(filter.mode(), HydrogenMode::Constant);
        assert_eq!(filtered.atoms.len(), 3);
    }

    #[test]
    fn applicable_modes_escalate_with_content() {
        let source = structure();
        let filter = HydrogenFilter::new(HydrogenMode::None);
        assert_eq!(
            filter.applicable_modes(&source),
            vec![HydrogenMode::None, HydrogenMode::Constant]
        );
    }

    #[test]
    fn cycle_wraps_through_applicable_modes() {
        let source = structure();
        let mut filter = HydrogenFilter::new(HydrogenMode::None);
        assert_eq!(filter.cycle_mode(&source), HydrogenMode::Constant);
        assert_eq!(filter.cycle_mode(&source), HydrogenMode::None);
    }

    #[test]
    fn unknown_mode_string_is_fatal() {
        assert!(matches!(
            "sometimes".parse::<HydrogenMode>(),
            Err(ModifierError::UnknownMode { .. })
        ));
        assert_eq!("Anisotropic".parse::<HydrogenMode>().unwrap(), HydrogenMode::Anisotropic);
    }
}
