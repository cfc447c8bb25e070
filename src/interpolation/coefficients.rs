//! Computation of per-neighbor interpolation weights by weighted local
//! polynomial regression.

use super::{
    polynomial_basis::{evaluate_polynomial_basis, polynomial_basis_size},
    radial_basis::RadialBasisFunction,
};
use crate::{
    geometry::{Point, PointSet, Vector},
    num::PFloat,
    verbosity::Verbosity,
};
use indicatif::ParallelProgressIterator;
use ndarray::prelude::*;
use rayon::prelude::*;
use std::mem::MaybeUninit;

/// Factor by which the radius of the sphere enclosing a target's neighbors
/// is extended, keeping the kernel weight of the furthest neighbor nonzero.
const RADIUS_EXTENSION_FACTOR: f64 = 1.1;

/// Computes the weight each neighbor contributes to the interpolated value
/// at its target point.
///
/// Row `i` of `neighbor_points` must hold the coordinates of the neighbors
/// of target point `i`. The returned weight table has the same shape and
/// ordering, such that the weighted sum of arbitrary sampled function
/// values at the neighbors of a target approximates the function's value
/// at that target, to the consistency order implied by the polynomial
/// degree.
pub fn compute_interpolation_weights<F, P, const D: usize>(
    target_points: &P,
    neighbor_points: &Array2<Point<F, D>>,
    polynomial_degree: usize,
    radial_basis_function: RadialBasisFunction,
    verbosity: &Verbosity,
) -> Array2<F>
where
    F: PFloat,
    P: PointSet<F, D> + ?Sized,
{
    let n_targets = neighbor_points.nrows();
    let num_neighbors = neighbor_points.ncols();
    let basis_size = polynomial_basis_size(D, polynomial_degree);

    let neighbor_points_buffer = neighbor_points.as_slice_memory_order().unwrap();

    let mut weights = Array2::uninit((n_targets, num_neighbors));
    weights
        .as_slice_memory_order_mut()
        .unwrap()
        .par_chunks_mut(num_neighbors)
        .enumerate()
        .progress_with(verbosity.create_progress_bar(n_targets))
        .for_each(|(target_idx, weight_row)| {
            compute_weights_for_target(
                &target_points.point(target_idx),
                &neighbor_points_buffer
                    [target_idx * num_neighbors..(target_idx + 1) * num_neighbors],
                polynomial_degree,
                basis_size,
                radial_basis_function,
                weight_row,
            );
        });
    unsafe { weights.assume_init() }
}

fn compute_weights_for_target<F: PFloat, const D: usize>(
    target_point: &Point<F, D>,
    neighbor_points: &[Point<F, D>],
    polynomial_degree: usize,
    basis_size: usize,
    radial_basis_function: RadialBasisFunction,
    weights: &mut [MaybeUninit<F>],
) {
    let num_neighbors = neighbor_points.len();

    // Work in target-centered coordinates
    let offsets: Vec<Vector<F, D>> = neighbor_points
        .iter()
        .map(|neighbor_point| neighbor_point - target_point)
        .collect();

    let max_squared_dist = offsets
        .iter()
        .map(|offset| offset.squared_length())
        .fold(F::zero(), F::max);

    let mut radius =
        max_squared_dist.sqrt() * F::from(RADIUS_EXTENSION_FACTOR).expect("Conversion failed");
    if radius == F::zero() {
        // All neighbors coincide with the target
        radius = F::one();
    }
    let inv_radius = radius.recip();

    let kernel_values: Vec<F> = offsets
        .iter()
        .map(|offset| radial_basis_function.evaluate(offset.length() * inv_radius))
        .collect();

    // The monomials are evaluated on radius-scaled offsets; the scaling
    // changes the conditioning of the local system but not the spanned
    // polynomial space
    let mut vandermonde = Vec::with_capacity(num_neighbors * basis_size);
    let mut basis_values = Vec::with_capacity(basis_size);
    for offset in &offsets {
        evaluate_polynomial_basis(&(offset * inv_radius), polynomial_degree, &mut basis_values);
        vandermonde.extend_from_slice(&basis_values);
    }

    // Gram matrix of the basis under the kernel weights, with the upper
    // triangle accumulated and then mirrored
    let mut gram = vec![F::zero(); basis_size * basis_size];
    for (neighbor_idx, &kernel_value) in kernel_values.iter().enumerate() {
        let basis_row = &vandermonde[neighbor_idx * basis_size..(neighbor_idx + 1) * basis_size];
        for row in 0..basis_size {
            let weighted_value = kernel_value * basis_row[row];
            for col in row..basis_size {
                gram[row * basis_size + col] =
                    gram[row * basis_size + col] + weighted_value * basis_row[col];
            }
        }
    }
    for row in 0..basis_size {
        for col in (row + 1)..basis_size {
            gram[col * basis_size + row] = gram[row * basis_size + col];
        }
    }

    // The right-hand side is the basis evaluated at the translated target,
    // where every non-constant monomial vanishes
    let mut rhs = vec![F::zero(); basis_size];
    rhs[0] = F::one();

    match solve_symmetric_system(&gram, &rhs, basis_size) {
        Some(solution) => {
            for (neighbor_idx, &kernel_value) in kernel_values.iter().enumerate() {
                let basis_row =
                    &vandermonde[neighbor_idx * basis_size..(neighbor_idx + 1) * basis_size];
                let mut projected = F::zero();
                for term_idx in 0..basis_size {
                    projected = projected + basis_row[term_idx] * solution[term_idx];
                }
                weights[neighbor_idx].write(kernel_value * projected);
            }
        }
        None => {
            // The local system is rank-deficient, so fall back to the
            // degree-0 solution, which keeps constant fields reproduced
            // exactly
            let total_kernel_value = kernel_values
                .iter()
                .fold(F::zero(), |acc, &kernel_value| acc + kernel_value);
            for (neighbor_idx, &kernel_value) in kernel_values.iter().enumerate() {
                weights[neighbor_idx].write(kernel_value / total_kernel_value);
            }
        }
    }
}

/// Solves the system `matrix * x = rhs` for a symmetric positive definite
/// `matrix` in row-major layout, returning `None` if the factorization
/// breaks down.
fn solve_symmetric_system<F: PFloat>(matrix: &[F], rhs: &[F], size: usize) -> Option<Vec<F>> {
    let lower = cholesky_decompose(matrix, size)?;

    let mut intermediate = vec![F::zero(); size];
    for row in 0..size {
        let mut sum = rhs[row];
        for col in 0..row {
            sum = sum - lower[row * size + col] * intermediate[col];
        }
        intermediate[row] = sum / lower[row * size + row];
    }

    let mut solution = vec![F::zero(); size];
    for row in (0..size).rev() {
        let mut sum = intermediate[row];
        for col in (row + 1)..size {
            sum = sum - lower[col * size + row] * solution[col];
        }
        solution[row] = sum / lower[row * size + row];
    }
    Some(solution)
}

/// Computes the lower-triangular Cholesky factor of a symmetric positive
/// definite matrix in row-major layout, returning `None` if the matrix
/// is not numerically positive definite.
fn cholesky_decompose<F: PFloat>(matrix: &[F], size: usize) -> Option<Vec<F>> {
    let mut lower = vec![F::zero(); size * size];

    for row in 0..size {
        for col in 0..=row {
            let mut sum = matrix[row * size + col];
            for k in 0..col {
                sum = sum - lower[row * size + k] * lower[col * size + k];
            }

            if row == col {
                if sum <= F::epsilon() {
                    return None;
                }
                lower[row * size + col] = sum.sqrt();
            } else {
                lower[row * size + col] = sum / lower[col * size + col];
            }
        }
    }
    Some(lower)
}
