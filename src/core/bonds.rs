use super::{expect_f64, StructureError};
use crate::io::{Block, Value};

const BOND_LOOP_KEYS: &[&str] = &["_geom_bond"];
const BOND_LABEL_1_KEYS: &[&str] = &["_geom_bond_atom_site_label_1", "_geom_bond.atom_site_label_1"];
const BOND_LABEL_2_KEYS: &[&str] = &["_geom_bond_atom_site_label_2", "_geom_bond.atom_site_label_2"];
const BOND_DISTANCE_KEYS: &[&str] = &["_geom_bond_distance", "_geom_bond.distance"];
const BOND_SYMMETRY_KEYS: &[&str] = &["_geom_bond_site_symmetry_2", "_geom_bond.site_symmetry_2"];

const HBOND_LOOP_KEYS: &[&str] = &["_geom_hbond"];
const HBOND_DONOR_KEYS: &[&str] = &["_geom_hbond_atom_site_label_D", "_geom_hbond.atom_site_label_D"];
const HBOND_HYDROGEN_KEYS: &[&str] = &["_geom_hbond_atom_site_label_H", "_geom_hbond.atom_site_label_H"];
const HBOND_ACCEPTOR_KEYS: &[&str] = &["_geom_hbond_atom_site_label_A", "_geom_hbond.atom_site_label_A"];
const HBOND_DH_KEYS: &[&str] = &["_geom_hbond_distance_DH", "_geom_hbond.distance_DH"];
const HBOND_HA_KEYS: &[&str] = &["_geom_hbond_distance_HA", "_geom_hbond.distance_HA"];
const HBOND_DA_KEYS: &[&str] = &["_geom_hbond_distance_DA", "_geom_hbond.distance_DA"];
const HBOND_ANGLE_KEYS: &[&str] = &["_geom_hbond_angle_DHA", "_geom_hbond.angle_DHA"];
const HBOND_SYMMETRY_KEYS: &[&str] = &["_geom_hbond_site_symmetry_A", "_geom_hbond.site_symmetry_A"];

/// A covalent bond between two labeled atoms.
///
/// `atom2_site_symmetry` is `None` for bonds inside the asymmetric unit;
/// otherwise it holds the symmetry/translation code of the far atom.
#[derive(Debug, Clone, PartialEq)]
pub struct Bond {
    pub atom1_label: String,
    pub atom2_label: String,
    pub length: f64,
    pub length_su: Option<f64>,
    pub atom2_site_symmetry: Option<String>,
}

impl Bond {
    pub fn from_cif(block: &mut Block, index: usize) -> Result<Self, StructureError> {
        let table = block.get_loop(BOND_LOOP_KEYS)?;
        Ok(Self {
            atom1_label: table.get_value(BOND_LABEL_1_KEYS, index)?.to_string(),
            atom2_label: table.get_value(BOND_LABEL_2_KEYS, index)?.to_string(),
            length: expect_f64(table.get_value(BOND_DISTANCE_KEYS, index)?, BOND_DISTANCE_KEYS[0])?,
            length_su: table.get_su(BOND_DISTANCE_KEYS, index)?,
            atom2_site_symmetry: site_symmetry(table.get_optional_value(BOND_SYMMETRY_KEYS, index)?),
        })
    }
}

/// A hydrogen bond: donor, hydrogen, and acceptor with the three distances
/// and the donor–hydrogen–acceptor angle.
#[derive(Debug, Clone, PartialEq)]
pub struct HBond {
    pub donor_label: String,
    pub hydrogen_label: String,
    pub acceptor_label: String,
    pub donor_hydrogen_distance: f64,
    pub donor_hydrogen_distance_su: Option<f64>,
    pub acceptor_hydrogen_distance: f64,
    pub acceptor_hydrogen_distance_su: Option<f64>,
    pub donor_acceptor_distance: f64,
    pub donor_acceptor_distance_su: Option<f64>,
    pub hbond_angle: f64,
    pub hbond_angle_su: Option<f64>,
    pub acceptor_atom_symmetry: Option<String>,
}

impl HBond {
    pub fn from_cif(block: &mut Block, index: usize) -> Result<Self, StructureError> {
        let table = block.get_loop(HBOND_LOOP_KEYS)?;
        Ok(Self {
            donor_label: table.get_value(HBOND_DONOR_KEYS, index)?.to_string(),
            hydrogen_label: table.get_value(HBOND_HYDROGEN_KEYS, index)?.to_string(),
            acceptor_label: table.get_value(HBOND_ACCEPTOR_KEYS, index)?.to_string(),
            donor_hydrogen_distance: expect_f64(table.get_value(HBOND_DH_KEYS, index)?, HBOND_DH_KEYS[0])?,
            donor_hydrogen_distance_su: table.get_su(HBOND_DH_KEYS, index)?,
            acceptor_hydrogen_distance: expect_f64(table.get_value(HBOND_HA_KEYS, index)?, HBOND_HA_KEYS[0])?,
            acceptor_hydrogen_distance_su: table.get_su(HBOND_HA_KEYS, index)?,
            donor_acceptor_distance: expect_f64(table.get_value(HBOND_DA_KEYS, index)?, HBOND_DA_KEYS[0])?,
            donor_acceptor_distance_su: table.get_su(HBOND_DA_KEYS, index)?,
            hbond_angle: expect_f64(table.get_value(HBOND_ANGLE_KEYS, index)?, HBOND_ANGLE_KEYS[0])?,
            hbond_angle_su: table.get_su(HBOND_ANGLE_KEYS, index)?,
            acceptor_atom_symmetry: site_symmetry(table.get_optional_value(HBOND_SYMMETRY_KEYS, index)?),
        })
    }
}

/// `"."` and an absent column both mean "inside the asymmetric unit".
fn site_symmetry(value: Option<&Value>) -> Option<String> {
    let text = value?.to_string();
    (text != ".").then_some(text)
}
