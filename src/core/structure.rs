use super::atom::Atom;
use super::bonds::{Bond, HBond};
use super::cell::UnitCell;
use super::connectivity::{find_connected_groups, ConnectedGroup};
use super::StructureError;
use crate::io::Block;
use crate::symmetry::CellSymmetry;

const ATOM_LOOP_KEYS: &[&str] = &["_atom_site"];
const BOND_LOOP_KEYS: &[&str] = &["_geom_bond"];
const HBOND_LOOP_KEYS: &[&str] = &["_geom_hbond"];

/// The complete structure model built from one CIF block.
///
/// Treated as an immutable value: modifiers never change an existing
/// structure, they construct a new one. The connected groups are derived at
/// construction, so they can never drift from the atom and bond lists.
#[derive(Debug, Clone)]
pub struct CrystalStructure {
    pub cell: UnitCell,
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
    pub h_bonds: Vec<HBond>,
    pub symmetry: CellSymmetry,
    pub connected_groups: Vec<ConnectedGroup>,
}

impl CrystalStructure {
    pub fn new(
        cell: UnitCell,
        atoms: Vec<Atom>,
        bonds: Vec<Bond>,
        h_bonds: Vec<HBond>,
        symmetry: CellSymmetry,
    ) -> Result<Self, StructureError> {
        let connected_groups = find_connected_groups(&atoms, &bonds, &h_bonds)?;
        Ok(Self {
            cell,
            atoms,
            bonds,
            h_bonds,
            symmetry,
            connected_groups,
        })
    }

    /// One-shot construction from a parsed block.
    ///
    /// Missing `_geom_bond` / `_geom_hbond` loops degrade to empty lists with
    /// a warning; everything else that is absent or malformed is fatal.
    pub fn from_cif(block: &mut Block) -> Result<Self, StructureError> {
        let cell = UnitCell::from_cif(block)?;

        let atom_count = block.get_loop(ATOM_LOOP_KEYS)?.n_rows()?;
        let mut atoms = Vec::with_capacity(atom_count);
        for index in 0..atom_count {
            atoms.push(Atom::from_cif(block, index)?);
        }

        let bonds = match optional_row_count(block, BOND_LOOP_KEYS)? {
            Some(rows) => {
                let mut bonds = Vec::with_capacity(rows);
                for index in 0..rows {
                    bonds.push(Bond::from_cif(block, index)?);
                }
                bonds
            }
            None => {
                log::warn!("Block '{}' has no _geom_bond loop; continuing without bonds", block.name());
                Vec::new()
            }
        };

        let h_bonds = match optional_row_count(block, HBOND_LOOP_KEYS)? {
            Some(rows) => {
                let mut h_bonds = Vec::with_capacity(rows);
                for index in 0..rows {
                    h_bonds.push(HBond::from_cif(block, index)?);
                }
                h_bonds
            }
            None => {
                log::warn!(
                    "Block '{}' has no _geom_hbond loop; continuing without hydrogen bonds",
                    block.name()
                );
                Vec::new()
            }
        };

        let symmetry = CellSymmetry::from_cif(block)?;

        Self::new(cell, atoms, bonds, h_bonds, symmetry)
    }

    /// Looks an atom up by its unique label.
    pub fn get_atom_by_label(&self, label: &str) -> Result<&Atom, StructureError> {
        self.atoms
            .iter()
            .find(|atom| atom.label == label)
            .ok_or_else(|| StructureError::UnknownAtomLabel(label.to_string()))
    }
}

fn optional_row_count(block: &mut Block, keys: &[&str]) -> Result<Option<usize>, StructureError> {
    match block.get_optional_loop(keys)? {
        Some(table) => Ok(Some(table.n_rows()?)),
        None => Ok(None),
    }
}
