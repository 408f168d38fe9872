use nalgebra::Vector3;

use super::operation::SymmetryOperation;
use super::SymmetryError;
use crate::core::atom::Atom;
use crate::io::{Block, Value};

const NAME_KEYS: &[&str] = &[
    "_space_group_name_H-M_alt",
    "_symmetry_space_group_name_H-M",
    "_space_group.name_H-M_alt",
    "_space_group_name_Hall",
    "_space_group.name_Hall",
];
const NUMBER_KEYS: &[&str] = &[
    "_space_group_IT_number",
    "_symmetry_Int_Tables_number",
    "_space_group.IT_number",
];
const OPERATION_LOOP_KEYS: &[&str] = &["_space_group_symop", "_symmetry_equiv"];
const OPERATION_LOOP_PREFIXES: &[&str] = &["_space_group_symop", "_symmetry_equiv"];
const OPERATION_COLUMN_KEYS: &[&str] = &[
    "_space_group_symop_operation_xyz",
    "_space_group_symop.operation_xyz",
    "_symmetry_equiv_pos_as_xyz",
    "_symmetry_equiv.pos_as_xyz",
];

/// Space-group identification plus the ordered list of symmetry operations.
/// Operation 1 is always present; a block without symmetry data falls back
/// to P1 (`x,y,z` only).
#[derive(Debug, Clone, PartialEq)]
pub struct CellSymmetry {
    pub space_group_name: String,
    pub space_group_number: i32,
    pub operations: Vec<SymmetryOperation>,
}

impl CellSymmetry {
    pub fn new(space_group_name: String, space_group_number: i32, operations: Vec<SymmetryOperation>) -> Self {
        Self {
            space_group_name,
            space_group_number,
            operations,
        }
    }

    /// Reads space-group name, number, and operations from a block.
    /// Name and number default to `"Unknown"`/`0`; a missing operation loop
    /// degrades to P1. All three degradations are logged, never fatal.
    pub fn from_cif(block: &mut Block) -> Result<Self, SymmetryError> {
        let block_name = block.name().to_string();

        let space_group_name = match block.get_optional_value(NAME_KEYS)? {
            Some(value) => value.to_string(),
            None => {
                log::warn!("Block '{block_name}' names no space group; using 'Unknown'");
                "Unknown".to_string()
            }
        };

        let space_group_number = match block.get_optional_value(NUMBER_KEYS)? {
            Some(Value::Int(number)) => *number as i32,
            Some(other) => {
                log::warn!("Block '{block_name}' has a non-integer space group number '{other}'; using 0");
                0
            }
            None => {
                log::warn!("Block '{block_name}' has no space group number; using 0");
                0
            }
        };

        let operations = match find_operation_loop(block)? {
            Some(loop_key) => {
                let table = block.get_loop(&[loop_key.as_str()])?;
                let rows = table.n_rows()?;
                let mut operations = Vec::with_capacity(rows);
                for row in 0..rows {
                    let shorthand = table.get_value(OPERATION_COLUMN_KEYS, row)?.to_string();
                    operations.push(SymmetryOperation::parse(&shorthand)?);
                }
                operations
            }
            None => {
                log::warn!("Block '{block_name}' has no symmetry operation loop; assuming P1 (x,y,z)");
                vec![SymmetryOperation::identity()]
            }
        };

        Ok(Self::new(space_group_name, space_group_number, operations))
    }

    /// Maps every operation over one point.
    pub fn generate_equivalent_positions(&self, point: &Vector3<f64>) -> Vec<Vector3<f64>> {
        self.operations
            .iter()
            .map(|operation| operation.apply_to_point(point))
            .collect()
    }

    /// Applies a `"<operation>_<3 digits>"` code to one atom: the selected
    /// operation, then the digit−5 whole-cell translation.
    pub fn apply_symmetry_to_atom(&self, code: &str, atom: &Atom) -> Result<Atom, SymmetryError> {
        let (index, shift) = self.decode_code(code)?;
        let mut transformed = self.operations[index].apply_to_atom(atom);
        *transformed.position.coords_mut() += shift;
        Ok(transformed)
    }

    /// Slice form of [`apply_symmetry_to_atom`](Self::apply_symmetry_to_atom).
    pub fn apply_symmetry(&self, code: &str, atoms: &[Atom]) -> Result<Vec<Atom>, SymmetryError> {
        let (index, shift) = self.decode_code(code)?;
        let operation = &self.operations[index];
        Ok(atoms
            .iter()
            .map(|atom| {
                let mut transformed = operation.apply_to_atom(atom);
                *transformed.position.coords_mut() += shift;
                transformed
            })
            .collect())
    }

    fn decode_code(&self, code: &str) -> Result<(usize, Vector3<f64>), SymmetryError> {
        let bad = || SymmetryError::BadCode(code.to_string());

        let (operation_text, translation_text) = code.split_once('_').ok_or_else(bad)?;
        let digits: Vec<u32> = translation_text
            .chars()
            .map(|c| c.to_digit(10))
            .collect::<Option<_>>()
            .ok_or_else(bad)?;
        if digits.len() != 3 {
            return Err(bad());
        }

        let selected: usize = operation_text.parse().map_err(|_| bad())?;
        if selected == 0 || selected > self.operations.len() {
            return Err(SymmetryError::OperationOutOfRange {
                selected,
                available: self.operations.len(),
            });
        }

        let shift = Vector3::new(
            digits[0] as f64 - 5.0,
            digits[1] as f64 - 5.0,
            digits[2] as f64 - 5.0,
        );
        Ok((selected - 1, shift))
    }
}

/// Finds the symmetry-operation loop: canonical names first, then any block
/// entry whose key starts with a known symmetry-loop prefix.
fn find_operation_loop(block: &mut Block) -> Result<Option<String>, SymmetryError> {
    let keys = block.keys()?;

    for canonical in OPERATION_LOOP_KEYS {
        if keys.iter().any(|key| key == canonical) {
            return Ok(Some(canonical.to_string()));
        }
    }

    let mut prefixed: Vec<&String> = keys
        .iter()
        .filter(|key| OPERATION_LOOP_PREFIXES.iter().any(|prefix| key.starts_with(prefix)))
        .collect();
    prefixed.sort();
    Ok(prefixed.first().map(|key| key.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::atom::Position;
    use crate::io::CifDocument;

    const SYMMETRY: &str = concat!(
        "data_test\n",
        "_space_group_name_H-M_alt 'P 21/c'\n",
        "_space_group_IT_number 14\n",
        "loop_\n",
        "_space_group_symop_operation_xyz\n",
        "'x, y, z'\n",
        "'-x, y+1/2, -z+1/2'\n",
        "'-x, -y, -z'\n",
        "'x, -y+1/2, z+1/2'\n",
    );

    fn symmetry() -> CellSymmetry {
        let mut doc = CifDocument::parse(SYMMETRY);
        CellSymmetry::from_cif(doc.get_block(0).unwrap()).unwrap()
    }

    fn atom_at(x: f64, y: f64, z: f64) -> Atom {
        Atom {
            label: "F1".to_string(),
            element: "F".to_string(),
            position: Position::Fractional(Vector3::new(x, y, z)),
            adp: None,
            disorder_group: 0,
        }
    }

    #[test]
    fn reads_name_number_and_operations() {
        let symmetry = symmetry();
        assert_eq!(symmetry.space_group_name, "P 21/c");
        assert_eq!(symmetry.space_group_number, 14);
        assert_eq!(symmetry.operations.len(), 4);
    }

    #[test]
    fn equivalent_positions_cover_every_operation() {
        let positions = symmetry().generate_equivalent_positions(&Vector3::new(0.1, 0.2, 0.3));
        assert_eq!(positions.len(), 4);
        assert!((positions[0] - Vector3::new(0.1, 0.2, 0.3)).norm() < 1e-12);
        assert!((positions[1] - Vector3::new(-0.1, 0.7, 0.2)).norm() < 1e-12);
    }

    #[test]
    fn code_555_adds_no_translation() {
        let grown = symmetry()
            .apply_symmetry_to_atom("2_555", &atom_at(0.1, 0.2, 0.3))
            .unwrap();
        assert!((grown.position[0] + 0.1).abs() < 1e-12);
        assert!((grown.position[1] - 0.7).abs() < 1e-12);
        assert!((grown.position[2] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn code_655_shifts_one_cell_along_a() {
        let base = symmetry()
            .apply_symmetry_to_atom("2_555", &atom_at(0.1, 0.2, 0.3))
            .unwrap();
        let shifted = symmetry()
            .apply_symmetry_to_atom("2_655", &atom_at(0.1, 0.2, 0.3))
            .unwrap();
        assert!((shifted.position[0] - (base.position[0] + 1.0)).abs() < 1e-12);
        assert!((shifted.position[1] - base.position[1]).abs() < 1e-12);
    }

    #[test]
    fn slice_application_keeps_shape() {
        let atoms = vec![atom_at(0.1, 0.2, 0.3), atom_at(0.4, 0.5, 0.6)];
        let grown = symmetry().apply_symmetry("1_555", &atoms).unwrap();
        assert_eq!(grown.len(), 2);
        assert!((grown[1].position[0] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_operation_is_fatal() {
        let result = symmetry().apply_symmetry_to_atom("9_555", &atom_at(0.0, 0.0, 0.0));
        assert!(matches!(
            result,
            Err(SymmetryError::OperationOutOfRange { selected: 9, available: 4 })
        ));
    }

    #[test]
    fn malformed_codes_are_fatal() {
        let symmetry = symmetry();
        for code in ["nonsense", "2_55", "2_55a", "2-555"] {
            assert!(matches!(
                symmetry.apply_symmetry_to_atom(code, &atom_at(0.0, 0.0, 0.0)),
                Err(SymmetryError::BadCode(_))
            ));
        }
    }

    #[test]
    fn missing_symmetry_falls_back_to_p1() {
        let mut doc = CifDocument::parse("data_bare\n_k 1\n");
        let symmetry = CellSymmetry::from_cif(doc.get_block(0).unwrap()).unwrap();
        assert_eq!(symmetry.space_group_name, "Unknown");
        assert_eq!(symmetry.space_group_number, 0);
        assert_eq!(symmetry.operations, vec![SymmetryOperation::identity()]);
    }

    #[test]
    fn legacy_equiv_pos_loop_is_found() {
        let text = concat!(
            "data_legacy\n",
            "loop_\n",
            "_symmetry_equiv_pos_as_xyz\n",
            "'x, y, z'\n",
            "'-x, -y, -z'\n",
        );
        let mut doc = CifDocument::parse(text);
        let symmetry = CellSymmetry::from_cif(doc.get_block(0).unwrap()).unwrap();
        assert_eq!(symmetry.operations.len(), 2);
    }
}
