//! Simplex construction helpers.
//!
//! The solver takes a full initial simplex rather than a single starting
//! point. The seed simplex is built from the current parameter vector by
//! perturbing each coordinate by a fixed relative step, with an absolute
//! fallback for coordinates at zero, so every vertex stays in the domain
//! neighborhood the caller seeded.

use argmin::solver::neldermead::NelderMead;

use crate::optimization::{
    errors::{OptError, OptResult},
    simplex::traits::SimplexOptions,
};

/// Relative per-coordinate perturbation of the seed vertex.
const SEED_PERTURBATION: f64 = 0.05;

/// Absolute perturbation used for zero coordinates.
const ZERO_COORD_STEP: f64 = 1e-3;

/// Build the initial simplex around a seed vertex: the seed itself plus one
/// vertex per dimension with that coordinate nudged by 5% (or by a small
/// absolute step when the coordinate is zero).
///
/// # Errors
/// - [`OptError::EmptySimplexSeed`] for an empty seed.
/// - [`OptError::InvalidSimplexSeed`] for non-finite seed coordinates.
pub fn build_initial_simplex(seed: &[f64]) -> OptResult<Vec<Vec<f64>>> {
    if seed.is_empty() {
        return Err(OptError::EmptySimplexSeed);
    }
    for (index, &value) in seed.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidSimplexSeed { index, value });
        }
    }

    let mut vertices = Vec::with_capacity(seed.len() + 1);
    vertices.push(seed.to_vec());
    for i in 0..seed.len() {
        let step = if seed[i] == 0.0 { ZERO_COORD_STEP } else { SEED_PERTURBATION * seed[i].abs() };
        let mut vertex = seed.to_vec();
        vertex[i] += step;
        vertices.push(vertex);
    }
    Ok(vertices)
}

/// Construct a Nelder-Mead solver over the seeded simplex with the
/// configured cost-spread tolerance.
pub fn build_nelder_mead(
    seed: &[f64], opts: &SimplexOptions,
) -> OptResult<NelderMead<Vec<f64>, f64>> {
    let simplex = build_initial_simplex(seed)?;
    NelderMead::new(simplex).with_sd_tolerance(opts.sd_tolerance).map_err(OptError::from)
}
