//! Multivariate polynomial basis used for the local fits.

use crate::{geometry::Vector, num::PFloat};

/// Computes the number of monomials of total degree at most `degree`
/// in `dimension` variables.
///
/// This is the size of the polynomial basis spanned by the local fits,
/// and the default number of neighbors required to make a local fit of
/// the given degree generically well-posed.
pub fn polynomial_basis_size(dimension: usize, degree: usize) -> usize {
    // Binomial coefficient C(dimension + degree, degree), computed so
    // every intermediate division is exact
    let mut size = 1;
    for i in 1..=degree {
        size = size * (dimension + i) / i;
    }
    size
}

/// Evaluates every monomial of total degree at most `degree` at the given
/// point offset, writing the values into `basis_values` (which is cleared
/// first). The constant term comes first; the ordering of the remaining
/// terms is deterministic.
pub fn evaluate_polynomial_basis<F: PFloat, const D: usize>(
    offset: &Vector<F, D>,
    degree: usize,
    basis_values: &mut Vec<F>,
) {
    basis_values.clear();
    basis_values.push(F::one());
    add_higher_degree_terms(offset, degree, 0, F::one(), basis_values);
}

fn add_higher_degree_terms<F: PFloat, const D: usize>(
    offset: &Vector<F, D>,
    remaining_degree: usize,
    start_dim: usize,
    partial_product: F,
    basis_values: &mut Vec<F>,
) {
    if remaining_degree == 0 {
        return;
    }
    for dim in start_dim..D {
        let product = partial_product * offset[dim];
        basis_values.push(product);
        add_higher_degree_terms(offset, remaining_degree - 1, dim, product, basis_values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basis_sizes_match_binomial_coefficients() {
        assert_eq!(polynomial_basis_size(1, 0), 1);
        assert_eq!(polynomial_basis_size(1, 1), 2);
        assert_eq!(polynomial_basis_size(1, 2), 3);
        assert_eq!(polynomial_basis_size(2, 0), 1);
        assert_eq!(polynomial_basis_size(2, 1), 3);
        assert_eq!(polynomial_basis_size(2, 2), 6);
        assert_eq!(polynomial_basis_size(3, 1), 4);
        assert_eq!(polynomial_basis_size(3, 2), 10);
        assert_eq!(polynomial_basis_size(3, 3), 20);
    }

    #[test]
    fn number_of_evaluated_monomials_matches_basis_size() {
        let mut basis_values = Vec::new();
        for degree in 0..4 {
            evaluate_polynomial_basis(&Vector::<f64, 3>::new([0.5, -1.5, 2.0]), degree, &mut basis_values);
            assert_eq!(basis_values.len(), polynomial_basis_size(3, degree));
        }
    }

    #[test]
    fn constant_term_comes_first_and_monomials_vanish_at_origin() {
        let mut basis_values = Vec::new();
        evaluate_polynomial_basis(&Vector::<f64, 2>::zero(), 2, &mut basis_values);
        assert_eq!(basis_values[0], 1.0);
        assert!(basis_values[1..].iter().all(|&value| value == 0.0));
    }

    #[test]
    fn evaluated_monomials_have_correct_values_in_1d() {
        let mut basis_values = Vec::new();
        evaluate_polynomial_basis(&Vector::<f64, 1>::new([2.0]), 3, &mut basis_values);
        assert_eq!(basis_values, vec![1.0, 2.0, 4.0, 8.0]);
    }

    #[test]
    fn evaluated_monomials_span_full_quadratic_basis_in_2d() {
        let mut basis_values = Vec::new();
        evaluate_polynomial_basis(&Vector::<f64, 2>::new([2.0, 3.0]), 2, &mut basis_values);
        // Ordering: 1, x, x^2, x*y, y, y^2
        assert_eq!(basis_values, vec![1.0, 2.0, 4.0, 6.0, 3.0, 9.0]);
    }
}
