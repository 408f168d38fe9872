use nalgebra::Matrix3;

/// Builds the fractional→Cartesian transformation matrix for a unit cell.
///
/// Standard crystallographic convention: the a-axis lies along x, the b-axis
/// in the xy-plane, and the c-axis completes the right-handed basis. Angles
/// are in degrees.
pub fn fract_to_cart_matrix(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Matrix3<f64> {
    let alpha_r = alpha.to_radians();
    let beta_r = beta.to_radians();
    let gamma_r = gamma.to_radians();

    let cos_alpha = alpha_r.cos();
    let cos_beta = beta_r.cos();
    let cos_gamma = gamma_r.cos();
    let sin_gamma = gamma_r.sin();

    // Cell-volume term of the triclinic metric.
    let v = (1.0 - cos_alpha.powi(2) - cos_beta.powi(2) - cos_gamma.powi(2)
        + 2.0 * cos_alpha * cos_beta * cos_gamma)
        .sqrt();

    Matrix3::new(
        a, b * cos_gamma, c * cos_beta,
        0.0, b * sin_gamma, c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma,
        0.0, 0.0, c * v / sin_gamma,
    )
}

/// Expands the six packed components (U11, U22, U33, U12, U13, U23) into a
/// symmetric 3×3 tensor.
pub fn symmetric_from_components(u: &[f64; 6]) -> Matrix3<f64> {
    Matrix3::new(
        u[0], u[3], u[4],
        u[3], u[1], u[5],
        u[4], u[5], u[2],
    )
}

/// Packs a symmetric 3×3 tensor back into (U11, U22, U33, U12, U13, U23).
pub fn components_from_symmetric(m: &Matrix3<f64>) -> [f64; 6] {
    [m[(0, 0)], m[(1, 1)], m[(2, 2)], m[(0, 1)], m[(0, 2)], m[(1, 2)]]
}

/// Converts CIF anisotropic displacement components (defined against the
/// reciprocal cell axes) into the Cartesian frame of `m`, the
/// fractional→Cartesian matrix of the owning cell.
///
/// The tensor is first de-dimensionalized with N = diag(‖rows of Fᵀ‖) where
/// F = (Mᵀ)⁻¹, then rotated into Cartesian space: U_cart = M·(N·U·Nᵀ)·Mᵀ.
/// Component order is preserved.
pub fn u_cif_to_u_cart(m: &Matrix3<f64>, u: [f64; 6]) -> Result<[f64; 6], &'static str> {
    let f = m
        .transpose()
        .try_inverse()
        .ok_or("Fractional matrix is not invertible.")?;

    // Rows of Fᵀ are the columns of F: the reciprocal axis lengths.
    let norms = nalgebra::Vector3::new(f.column(0).norm(), f.column(1).norm(), f.column(2).norm());
    let n = Matrix3::from_diagonal(&norms);
    let u_cif = symmetric_from_components(&u);

    let u_star = n * u_cif * n.transpose();
    let u_cart = m * u_star * m.transpose();

    Ok(components_from_symmetric(&u_cart))
}
