use nalgebra::Matrix3;

use super::StructureError;
use crate::io::Block;
use crate::math::orthogonalize;

const LENGTH_A_KEYS: &[&str] = &["_cell_length_a", "_cell.length_a"];
const LENGTH_B_KEYS: &[&str] = &["_cell_length_b", "_cell.length_b"];
const LENGTH_C_KEYS: &[&str] = &["_cell_length_c", "_cell.length_c"];
const ANGLE_ALPHA_KEYS: &[&str] = &["_cell_angle_alpha", "_cell.angle_alpha"];
const ANGLE_BETA_KEYS: &[&str] = &["_cell_angle_beta", "_cell.angle_beta"];
const ANGLE_GAMMA_KEYS: &[&str] = &["_cell_angle_gamma", "_cell.angle_gamma"];

/// Unit cell parameters with a cached fractional→Cartesian matrix.
///
/// Every mutation funnels through one validate-then-recompute path, so the
/// cached matrix can never get out of step with the parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitCell {
    a: f64,
    b: f64,
    c: f64,
    alpha: f64,
    beta: f64,
    gamma: f64,
    fract_to_cart: Matrix3<f64>,
}

impl UnitCell {
    pub fn new(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Result<Self, StructureError> {
        let mut cell = Self {
            a,
            b,
            c,
            alpha,
            beta,
            gamma,
            fract_to_cart: Matrix3::identity(),
        };
        cell.validate_then_recompute()?;
        Ok(cell)
    }

    /// Reads cell lengths and angles from a block, accepting both the legacy
    /// underscore and DDL2 dotted tag spellings.
    pub fn from_cif(block: &mut Block) -> Result<Self, StructureError> {
        Self::new(
            block.get_f64(LENGTH_A_KEYS)?,
            block.get_f64(LENGTH_B_KEYS)?,
            block.get_f64(LENGTH_C_KEYS)?,
            block.get_f64(ANGLE_ALPHA_KEYS)?,
            block.get_f64(ANGLE_BETA_KEYS)?,
            block.get_f64(ANGLE_GAMMA_KEYS)?,
        )
    }

    pub fn a(&self) -> f64 {
        self.a
    }

    pub fn b(&self) -> f64 {
        self.b
    }

    pub fn c(&self) -> f64 {
        self.c
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    pub fn set_a(&mut self, value: f64) -> Result<(), StructureError> {
        self.update(|cell| cell.a = value)
    }

    pub fn set_b(&mut self, value: f64) -> Result<(), StructureError> {
        self.update(|cell| cell.b = value)
    }

    pub fn set_c(&mut self, value: f64) -> Result<(), StructureError> {
        self.update(|cell| cell.c = value)
    }

    pub fn set_alpha(&mut self, value: f64) -> Result<(), StructureError> {
        self.update(|cell| cell.alpha = value)
    }

    pub fn set_beta(&mut self, value: f64) -> Result<(), StructureError> {
        self.update(|cell| cell.beta = value)
    }

    pub fn set_gamma(&mut self, value: f64) -> Result<(), StructureError> {
        self.update(|cell| cell.gamma = value)
    }

    /// The cached fractional→Cartesian transformation.
    pub fn fract_to_cart_matrix(&self) -> &Matrix3<f64> {
        &self.fract_to_cart
    }

    fn update(&mut self, mutate: impl FnOnce(&mut Self)) -> Result<(), StructureError> {
        let previous = self.clone();
        mutate(self);
        if let Err(error) = self.validate_then_recompute() {
            *self = previous;
            return Err(error);
        }
        Ok(())
    }

    fn validate_then_recompute(&mut self) -> Result<(), StructureError> {
        for (name, value) in [("a", self.a), ("b", self.b), ("c", self.c)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(StructureError::InvalidCell(format!(
                    "length {name} must be positive, got {value}"
                )));
            }
        }
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta), ("gamma", self.gamma)] {
            if !value.is_finite() || value <= 0.0 || value >= 180.0 {
                return Err(StructureError::InvalidCell(format!(
                    "angle {name} must lie strictly between 0 and 180 degrees, got {value}"
                )));
            }
        }
        self.fract_to_cart =
            orthogonalize::fract_to_cart_matrix(self.a, self.b, self.c, self.alpha, self.beta, self.gamma);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::CifDocument;

    #[test]
    fn rejects_degenerate_parameters() {
        assert!(UnitCell::new(0.0, 10.0, 10.0, 90.0, 90.0, 90.0).is_err());
        assert!(UnitCell::new(10.0, 10.0, 10.0, 180.0, 90.0, 90.0).is_err());
        assert!(UnitCell::new(10.0, 10.0, 10.0, 90.0, 0.0, 90.0).is_err());
    }

    #[test]
    fn setters_recompute_the_matrix() {
        let mut cell = UnitCell::new(10.0, 10.0, 10.0, 90.0, 90.0, 90.0).unwrap();
        cell.set_a(20.0).unwrap();
        assert!((cell.fract_to_cart_matrix()[(0, 0)] - 20.0).abs() < 1e-12);
    }

    #[test]
    fn failed_update_rolls_back() {
        let mut cell = UnitCell::new(10.0, 10.0, 10.0, 90.0, 90.0, 90.0).unwrap();
        assert!(cell.set_gamma(200.0).is_err());
        assert!((cell.gamma() - 90.0).abs() < 1e-12);
        assert!((cell.fract_to_cart_matrix()[(1, 1)] - 10.0).abs() < 1e-12);
    }

    #[test]
    fn from_cif_prefers_first_matching_spelling() {
        let text = "data_x\n_cell_length_a 5.0\n_cell_length_b 6.0\n_cell_length_c 7.0\n_cell_angle_alpha 90\n_cell_angle_beta 90\n_cell_angle_gamma 90\n";
        let mut doc = CifDocument::parse(text);
        let cell = UnitCell::from_cif(doc.get_block(0).unwrap()).unwrap();
        assert!((cell.a() - 5.0).abs() < 1e-12);
        assert!((cell.c() - 7.0).abs() < 1e-12);
    }

    #[test]
    fn from_cif_accepts_dotted_tags() {
        let text = "data_x\n_cell.length_a 5.0\n_cell.length_b 6.0\n_cell.length_c 7.0\n_cell.angle_alpha 90\n_cell.angle_beta 90\n_cell.angle_gamma 90\n";
        let mut doc = CifDocument::parse(text);
        let cell = UnitCell::from_cif(doc.get_block(0).unwrap()).unwrap();
        assert!((cell.b() - 6.0).abs() < 1e-12);
    }
}
