use std::ops::Index;

use nalgebra::Vector3;

use super::cell::UnitCell;
use super::{expect_f64, StructureError};
use crate::io::{Block, Value};

const ATOM_LOOP_KEYS: &[&str] = &["_atom_site"];
const LABEL_KEYS: &[&str] = &["_atom_site_label", "_atom_site.label"];
const TYPE_SYMBOL_KEYS: &[&str] = &["_atom_site_type_symbol", "_atom_site.type_symbol"];
const FRACT_KEYS: [&[&str]; 3] = [
    &["_atom_site_fract_x", "_atom_site.fract_x"],
    &["_atom_site_fract_y", "_atom_site.fract_y"],
    &["_atom_site_fract_z", "_atom_site.fract_z"],
];
const CARTN_KEYS: [&[&str]; 3] = [
    &["_atom_site_Cartn_x", "_atom_site.Cartn_x"],
    &["_atom_site_Cartn_y", "_atom_site.Cartn_y"],
    &["_atom_site_Cartn_z", "_atom_site.Cartn_z"],
];
const ADP_TYPE_KEYS: &[&str] = &[
    "_atom_site_adp_type",
    "_atom_site.adp_type",
    "_atom_site_thermal_displace_type",
    "_atom_site.thermal_displace_type",
];
const U_ISO_KEYS: &[&str] = &["_atom_site_U_iso_or_equiv", "_atom_site.U_iso_or_equiv"];
const DISORDER_KEYS: &[&str] = &["_atom_site_disorder_group", "_atom_site.disorder_group"];

const ANISO_LOOP_KEYS: &[&str] = &["_atom_site_aniso"];
const ANISO_LABEL_KEYS: &[&str] = &["_atom_site_aniso_label", "_atom_site_aniso.label"];
const ANISO_U_KEYS: [&[&str]; 6] = [
    &["_atom_site_aniso_U_11", "_atom_site_aniso.U_11"],
    &["_atom_site_aniso_U_22", "_atom_site_aniso.U_22"],
    &["_atom_site_aniso_U_33", "_atom_site_aniso.U_33"],
    &["_atom_site_aniso_U_12", "_atom_site_aniso.U_12"],
    &["_atom_site_aniso_U_13", "_atom_site_aniso.U_13"],
    &["_atom_site_aniso_U_23", "_atom_site_aniso.U_23"],
];

/// Atom coordinates, fractional or Cartesian.
#[derive(Debug, Clone, PartialEq)]
pub enum Position {
    Fractional(Vector3<f64>),
    Cartesian(Vector3<f64>),
}

impl Position {
    pub fn coords(&self) -> &Vector3<f64> {
        match self {
            Position::Fractional(v) | Position::Cartesian(v) => v,
        }
    }

    pub fn coords_mut(&mut self) -> &mut Vector3<f64> {
        match self {
            Position::Fractional(v) | Position::Cartesian(v) => v,
        }
    }

    /// Cartesian coordinates; fractional positions go through the cell
    /// matrix, Cartesian positions pass through unchanged.
    pub fn to_cartesian(&self, cell: &UnitCell) -> Vector3<f64> {
        match self {
            Position::Fractional(v) => cell.fract_to_cart_matrix() * v,
            Position::Cartesian(v) => *v,
        }
    }
}

impl Index<usize> for Position {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.coords()[index]
    }
}

/// Atomic displacement parameters: one isotropic scalar or the six
/// anisotropic components (U11, U22, U33, U12, U13, U23).
#[derive(Debug, Clone, PartialEq)]
pub enum Adp {
    Iso(f64),
    Ani([f64; 6]),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    pub label: String,
    pub element: String,
    pub position: Position,
    pub adp: Option<Adp>,
    /// 0 means not disordered.
    pub disorder_group: i32,
}

impl Atom {
    /// Builds the atom at `index` of the block's `_atom_site` loop.
    ///
    /// Fractional coordinates are preferred over Cartesian ones. `Uani`
    /// atoms must have a matching row in the anisotropic loop.
    pub fn from_cif(block: &mut Block, index: usize) -> Result<Self, StructureError> {
        let (label, element, position, adp_type, u_iso, disorder_group) = {
            let table = block.get_loop(ATOM_LOOP_KEYS)?;

            let label = table.get_value(LABEL_KEYS, index)?.to_string();
            let element = table.get_value(TYPE_SYMBOL_KEYS, index)?.to_string();

            let has_fractional = table.get_optional_value(FRACT_KEYS[0], index)?.is_some();
            let position = if has_fractional {
                Position::Fractional(Vector3::new(
                    expect_f64(table.get_value(FRACT_KEYS[0], index)?, FRACT_KEYS[0][0])?,
                    expect_f64(table.get_value(FRACT_KEYS[1], index)?, FRACT_KEYS[1][0])?,
                    expect_f64(table.get_value(FRACT_KEYS[2], index)?, FRACT_KEYS[2][0])?,
                ))
            } else {
                Position::Cartesian(Vector3::new(
                    expect_f64(table.get_value(CARTN_KEYS[0], index)?, CARTN_KEYS[0][0])?,
                    expect_f64(table.get_value(CARTN_KEYS[1], index)?, CARTN_KEYS[1][0])?,
                    expect_f64(table.get_value(CARTN_KEYS[2], index)?, CARTN_KEYS[2][0])?,
                ))
            };

            let adp_type = table
                .get_optional_value(ADP_TYPE_KEYS, index)?
                .and_then(Value::as_str)
                .unwrap_or("Uiso")
                .to_string();
            let u_iso = table
                .get_optional_value(U_ISO_KEYS, index)?
                .and_then(Value::as_f64);

            let disorder_group = match table.get_optional_value(DISORDER_KEYS, index)? {
                Some(Value::Int(group)) => *group as i32,
                // "." marks an ordered atom.
                _ => 0,
            };

            (label, element, position, adp_type, u_iso, disorder_group)
        };

        let adp = if adp_type.eq_ignore_ascii_case("Uani") {
            Some(Adp::Ani(lookup_aniso(block, &label)?))
        } else {
            u_iso.map(Adp::Iso)
        };

        Ok(Self {
            label,
            element,
            position,
            adp,
            disorder_group,
        })
    }
}

fn lookup_aniso(block: &mut Block, label: &str) -> Result<[f64; 6], StructureError> {
    let missing = || StructureError::MissingAnisoRow {
        label: label.to_string(),
    };

    let Some(table) = block.get_optional_loop(ANISO_LOOP_KEYS)? else {
        return Err(missing());
    };

    let mut row = None;
    for candidate in 0..table.n_rows()? {
        if table.get_value(ANISO_LABEL_KEYS, candidate)?.to_string() == label {
            row = Some(candidate);
            break;
        }
    }
    let row = row.ok_or_else(missing)?;

    let mut u = [0.0; 6];
    for (slot, keys) in u.iter_mut().zip(ANISO_U_KEYS.iter()) {
        *slot = expect_f64(table.get_value(keys, row)?, keys[0])?;
    }
    Ok(u)
}
