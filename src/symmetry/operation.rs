use std::str::FromStr;

use nalgebra::{Matrix3, Vector3};

use super::SymmetryError;
use crate::core::atom::{Adp, Atom};
use crate::math::orthogonalize::{components_from_symmetric, symmetric_from_components};

/// One space-group operation: a rotation matrix plus a translation vector,
/// parsed from crystallographic shorthand such as `-x+1/2,y,-z`.
#[derive(Debug, Clone, PartialEq)]
pub struct SymmetryOperation {
    pub rotation: Matrix3<f64>,
    pub translation: Vector3<f64>,
}

impl FromStr for SymmetryOperation {
    type Err = SymmetryError;

    fn from_str(instruction: &str) -> Result<Self, Self::Err> {
        Self::parse(instruction)
    }
}

impl SymmetryOperation {
    pub fn parse(instruction: &str) -> Result<Self, SymmetryError> {
        let components: Vec<&str> = instruction.split(',').collect();
        if components.len() != 3 {
            return Err(SymmetryError::ComponentCount(instruction.to_string()));
        }

        let mut rotation = Matrix3::zeros();
        let mut translation = Vector3::zeros();
        for (row, component) in components.iter().enumerate() {
            parse_component(component, instruction, row, &mut rotation, &mut translation)?;
        }

        Ok(Self {
            rotation,
            translation,
        })
    }

    pub fn identity() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// `rotation · p + translation`.
    pub fn apply_to_point(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * point + self.translation
    }

    /// Transforms an atom's position; an anisotropic displacement tensor is
    /// rotated as `R·U·Rᵀ` (rotation only, translations do not touch ADPs).
    pub fn apply_to_atom(&self, atom: &Atom) -> Atom {
        let mut transformed = atom.clone();
        let coords = transformed.position.coords_mut();
        *coords = self.rotation * *coords + self.translation;

        if let Some(Adp::Ani(u)) = &atom.adp {
            let rotated = self.rotation * symmetric_from_components(u) * self.rotation.transpose();
            transformed.adp = Some(Adp::Ani(components_from_symmetric(&rotated)));
        }
        transformed
    }

    pub fn apply_to_atoms(&self, atoms: &[Atom]) -> Vec<Atom> {
        atoms.iter().map(|atom| self.apply_to_atom(atom)).collect()
    }
}

fn parse_component(
    component: &str,
    instruction: &str,
    row: usize,
    rotation: &mut Matrix3<f64>,
    translation: &mut Vector3<f64>,
) -> Result<(), SymmetryError> {
    let bad_term = |term: &str| SymmetryError::BadTerm {
        instruction: instruction.to_string(),
        term: term.to_string(),
    };

    let normalized: String = component
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '*')
        .collect::<String>()
        .to_ascii_lowercase();

    // Split into signed terms, keeping each sign with its term.
    let mut terms: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in normalized.chars() {
        if (c == '+' || c == '-') && !current.is_empty() {
            terms.push(std::mem::take(&mut current));
        }
        current.push(c);
    }
    if !current.is_empty() {
        terms.push(current);
    }
    if terms.is_empty() {
        return Err(bad_term(component));
    }

    for term in terms {
        let (sign, body) = match term.strip_prefix('-') {
            Some(rest) => (-1.0, rest),
            None => (1.0, term.strip_prefix('+').unwrap_or(&term)),
        };
        if body.is_empty() {
            return Err(bad_term(&term));
        }

        if let Some(axis_position) = body.find(['x', 'y', 'z']) {
            let axis = match body.as_bytes()[axis_position] {
                b'x' => 0,
                b'y' => 1,
                _ => 2,
            };
            let mut coefficient_text = String::with_capacity(body.len() - 1);
            coefficient_text.push_str(&body[..axis_position]);
            coefficient_text.push_str(&body[axis_position + 1..]);
            let coefficient = if coefficient_text.is_empty() {
                1.0
            } else {
                parse_fraction(&coefficient_text).ok_or_else(|| bad_term(&term))?
            };
            rotation[(row, axis)] += sign * coefficient;
        } else {
            let amount = parse_fraction(body).ok_or_else(|| bad_term(&term))?;
            translation[row] += sign * amount;
        }
    }
    Ok(())
}

/// `p/q`, `/q` (implied numerator 1), or a plain decimal.
fn parse_fraction(text: &str) -> Option<f64> {
    match text.split_once('/') {
        Some((numerator, denominator)) => {
            let numerator: f64 = if numerator.is_empty() {
                1.0
            } else {
                numerator.parse().ok()?
            };
            let denominator: f64 = denominator.parse().ok()?;
            (denominator != 0.0).then(|| numerator / denominator)
        }
        None => text.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::atom::Position;

    fn atom(label: &str, x: f64, y: f64, z: f64, adp: Option<Adp>) -> Atom {
        Atom {
            label: label.to_string(),
            element: "C".to_string(),
            position: Position::Fractional(Vector3::new(x, y, z)),
            adp,
            disorder_group: 0,
        }
    }

    #[test]
    fn screw_axis_shorthand() {
        let op = SymmetryOperation::parse("-x+1/2,y,-z").unwrap();
        let image = op.apply_to_point(&Vector3::new(0.2, 0.3, 0.4));
        assert!((image.x - 0.3).abs() < 1e-12);
        assert!((image.y - 0.3).abs() < 1e-12);
        assert!((image.z + 0.4).abs() < 1e-12);
    }

    #[test]
    fn coefficient_and_trailing_fraction_forms() {
        let op = SymmetryOperation::parse("2x, x-y, z+0.25").unwrap();
        let image = op.apply_to_point(&Vector3::new(0.1, 0.2, 0.3));
        assert!((image.x - 0.2).abs() < 1e-12);
        assert!((image.y - (0.1 - 0.2)).abs() < 1e-12);
        assert!((image.z - 0.55).abs() < 1e-12);

        let divided = SymmetryOperation::parse("x/2, y, z").unwrap();
        assert!((divided.rotation[(0, 0)] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn uppercase_and_spaces_are_tolerated() {
        let op = SymmetryOperation::parse(" -X , Y + 1/2 , -Z ").unwrap();
        assert!((op.rotation[(0, 0)] + 1.0).abs() < 1e-12);
        assert!((op.translation[1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn wrong_component_count_is_fatal() {
        assert!(matches!(
            SymmetryOperation::parse("x,y"),
            Err(SymmetryError::ComponentCount(_))
        ));
        assert!(matches!(
            SymmetryOperation::parse("x,y,z,x"),
            Err(SymmetryError::ComponentCount(_))
        ));
    }

    #[test]
    fn garbage_term_is_fatal() {
        assert!(matches!(
            SymmetryOperation::parse("x,y,q"),
            Err(SymmetryError::BadTerm { .. })
        ));
    }

    #[test]
    fn atom_position_and_tensor_transform() {
        let op = SymmetryOperation::parse("-x,-y,z").unwrap();
        let source = atom("C1", 0.1, 0.2, 0.3, Some(Adp::Ani([0.01, 0.02, 0.03, 0.004, 0.005, 0.006])));
        let image = op.apply_to_atom(&source);

        assert!((image.position[0] + 0.1).abs() < 1e-12);
        assert!((image.position[1] + 0.2).abs() < 1e-12);
        assert!((image.position[2] - 0.3).abs() < 1e-12);

        // Under diag(-1,-1,1): U12 keeps its sign, U13 and U23 flip.
        match image.adp {
            Some(Adp::Ani(u)) => {
                assert!((u[0] - 0.01).abs() < 1e-12);
                assert!((u[3] - 0.004).abs() < 1e-12);
                assert!((u[4] + 0.005).abs() < 1e-12);
                assert!((u[5] + 0.006).abs() < 1e-12);
            }
            other => panic!("expected anisotropic ADP, got {other:?}"),
        }
    }

    #[test]
    fn isotropic_adp_passes_through() {
        let op = SymmetryOperation::parse("-x,-y,-z").unwrap();
        let source = atom("O1", 0.1, 0.2, 0.3, Some(Adp::Iso(0.05)));
        assert_eq!(op.apply_to_atom(&source).adp, Some(Adp::Iso(0.05)));
    }

    #[test]
    fn identity_round_trip() {
        let op = SymmetryOperation::parse("x,y,z").unwrap();
        assert_eq!(op, SymmetryOperation::identity());
    }
}
