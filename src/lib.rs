// ============================================================================
// MODULE DECLARATIONS
// ============================================================================
pub mod core;
pub mod io;
pub mod math;
pub mod modifiers;
pub mod symmetry;

// ============================================================================
// RE-EXPORTS (Public API)
// ============================================================================
pub use crate::core::atom::{Adp, Atom, Position};
pub use crate::core::bonds::{Bond, HBond};
pub use crate::core::cell::UnitCell;
pub use crate::core::connectivity::ConnectedGroup;
pub use crate::core::structure::CrystalStructure;
pub use crate::core::StructureError;
pub use crate::io::{Block, CifDocument, CifError, Value};
pub use crate::modifiers::{
    DisorderFilter, DisorderMode, GrowthMode, HydrogenFilter, HydrogenMode, ModifierError,
    StructureModifier, SymmetryGrower,
};
pub use crate::symmetry::{CellSymmetry, SymmetryError, SymmetryOperation};

use anyhow::{Context, Result};

// ============================================================================
// HIGH-LEVEL INTERFACE
// ============================================================================

/// Parses CIF text and builds a structure from its first data block.
pub fn load_first_structure(text: &str) -> Result<CrystalStructure> {
    let mut document = CifDocument::parse(text);
    let block = document
        .get_block(0)
        .context("CIF text contains no data blocks")?;
    let block_name = block.name().to_string();
    let structure = CrystalStructure::from_cif(block)
        .with_context(|| format!("Failed to build a structure from block '{block_name}'"))?;
    Ok(structure)
}

/// Parses CIF text and builds one structure per data block.
pub fn load_all_structures(text: &str) -> Result<Vec<(String, CrystalStructure)>> {
    let mut document = CifDocument::parse(text);
    let mut structures = Vec::with_capacity(document.blocks().len());
    for block in document.blocks_mut() {
        let block_name = block.name().to_string();
        let structure = CrystalStructure::from_cif(block)
            .with_context(|| format!("Failed to build a structure from block '{block_name}'"))?;
        structures.push((block_name, structure));
    }
    Ok(structures)
}
