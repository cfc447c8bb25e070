//! Interpolation by moving least squares fitting.

use super::{
    coefficients::compute_interpolation_weights, polynomial_basis::polynomial_basis_size,
    radial_basis::RadialBasisFunction, ScatteredInterpolator,
};
use crate::{
    exit_on_false,
    geometry::{Point, PointSet, Vector},
    index::{kd_tree::KdTree, NearestNeighborQuery, NeighborLists, SpatialIndex},
    num::PFloat,
    verbosity::Verbosity,
};
use ndarray::prelude::*;
use rayon::prelude::*;

/// Configuration parameters for moving least squares interpolators.
#[derive(Clone, Debug)]
pub struct MovingLeastSquaresConfig {
    /// Highest total degree of polynomial the local fits reproduce exactly.
    pub polynomial_degree: usize,
    /// Compactly supported weighting function localizing each fit around
    /// its target point.
    pub radial_basis_function: RadialBasisFunction,
    /// Number of nearest source points used for each target's local fit,
    /// or `None` to use the smallest number making the fit generically
    /// well-posed.
    pub num_neighbors: Option<usize>,
}

impl MovingLeastSquaresConfig {
    pub const DEFAULT_POLYNOMIAL_DEGREE: usize = 2;
    pub const DEFAULT_RADIAL_BASIS_FUNCTION: RadialBasisFunction = RadialBasisFunction::Wendland0;
}

impl Default for MovingLeastSquaresConfig {
    fn default() -> Self {
        Self {
            polynomial_degree: Self::DEFAULT_POLYNOMIAL_DEGREE,
            radial_basis_function: Self::DEFAULT_RADIAL_BASIS_FUNCTION,
            num_neighbors: None,
        }
    }
}

/// An interpolator estimating field values at a fixed set of target points
/// by moving least squares fitting over the nearest source points.
///
/// Construction discovers the neighbors of every target point and computes
/// the weight each neighbor contributes to its target's estimate. The
/// resulting tables are immutable for the lifetime of the interpolator;
/// evaluation reuses them and can be repeated for any number of value
/// arrays sampled on the original source points.
#[derive(Clone, Debug)]
pub struct MovingLeastSquaresInterpolator<F, const D: usize> {
    index_table: Array2<usize>,
    weight_table: Array2<F>,
    n_source_points: usize,
}

impl<F: PFloat, const D: usize> MovingLeastSquaresInterpolator<F, D> {
    /// Creates a new moving least squares interpolator from the given
    /// source points to the given target points.
    ///
    /// # Parameters
    ///
    /// - `source_points`: Locations where field values will be supplied.
    /// - `target_points`: Locations where field values will be estimated.
    /// - `config`: Configuration parameters for the interpolator.
    /// - `verbosity`: Whether and how to report progress.
    ///
    /// # Returns
    ///
    /// A new interpolator with precomputed neighbor index and weight tables.
    pub fn new<SP, TP>(
        source_points: &SP,
        target_points: &TP,
        config: &MovingLeastSquaresConfig,
        verbosity: &Verbosity,
    ) -> Self
    where
        SP: PointSet<F, D> + ?Sized,
        TP: PointSet<F, D> + ?Sized,
    {
        exit_on_false!(
            source_points.all_points_are_finite(),
            "Error: Source points have non-finite components"
        );
        exit_on_false!(
            target_points.all_points_are_finite(),
            "Error: Target points have non-finite components"
        );

        let n_source_points = source_points.n_points();
        let num_neighbors = config
            .num_neighbors
            .unwrap_or_else(|| polynomial_basis_size(D, config.polynomial_degree));
        exit_on_false!(
            num_neighbors > 0 && num_neighbors <= n_source_points,
            "Error: Number of neighbors ({}) must be in the range [1, {}]",
            num_neighbors,
            n_source_points
        );

        if verbosity.print_messages() {
            println!(
                "Finding the {} nearest of {} source points for {} target points",
                num_neighbors,
                n_source_points,
                target_points.n_points()
            );
        }
        let source_index = KdTree::new(source_points);
        let query = NearestNeighborQuery::new(target_points, num_neighbors);
        let neighbor_lists = source_index.query_nearest(&query);

        let (index_table, neighbor_points) = Self::create_dense_neighbor_tables(
            &neighbor_lists,
            source_points,
            target_points.n_points(),
            num_neighbors,
        );

        if verbosity.print_messages() {
            println!(
                "Computing interpolation weights for {} target points",
                target_points.n_points()
            );
        }
        let weight_table = compute_interpolation_weights(
            target_points,
            &neighbor_points,
            config.polynomial_degree,
            config.radial_basis_function,
            verbosity,
        );

        Self {
            index_table,
            weight_table,
            n_source_points,
        }
    }

    /// Converts the ragged neighbor lists into dense tables of neighbor
    /// indices and neighbor coordinates, with one row per target point and
    /// one column per neighbor.
    ///
    /// Every `(target, neighbor)` cell is filled independently, so the
    /// pass is free to run in any order.
    fn create_dense_neighbor_tables<SP>(
        neighbor_lists: &NeighborLists,
        source_points: &SP,
        n_targets: usize,
        num_neighbors: usize,
    ) -> (Array2<usize>, Array2<Point<F, D>>)
    where
        SP: PointSet<F, D> + ?Sized,
    {
        let offsets = neighbor_lists.offsets();
        let flat_neighbor_indices = neighbor_lists.neighbor_indices();

        let mut index_table = Array2::uninit((n_targets, num_neighbors));
        let mut neighbor_points = Array2::uninit((n_targets, num_neighbors));

        index_table
            .as_slice_memory_order_mut()
            .unwrap()
            .par_iter_mut()
            .zip(neighbor_points.as_slice_memory_order_mut().unwrap().par_iter_mut())
            .enumerate()
            .for_each(|(flat_idx, (index_entry, point_entry))| {
                let target_idx = flat_idx / num_neighbors;
                let neighbor_idx = flat_idx % num_neighbors;
                let source_idx = flat_neighbor_indices[offsets[target_idx] + neighbor_idx];
                index_entry.write(source_idx);
                point_entry.write(source_points.point(source_idx));
            });

        (unsafe { index_table.assume_init() }, unsafe {
            neighbor_points.assume_init()
        })
    }

    /// Returns the number of source points the interpolator was constructed with.
    pub fn n_source_points(&self) -> usize {
        self.n_source_points
    }

    /// Returns the number of target points values are estimated at.
    pub fn n_target_points(&self) -> usize {
        self.index_table.nrows()
    }

    /// Returns the number of source points contributing to each target's estimate.
    pub fn num_neighbors(&self) -> usize {
        self.index_table.ncols()
    }

    /// Returns a read-only view of the table holding the source index of
    /// each target's neighbors.
    pub fn index_table(&self) -> ArrayView2<'_, usize> {
        self.index_table.view()
    }

    /// Returns a read-only view of the table holding the weight each
    /// neighbor contributes to its target's estimate.
    pub fn weight_table(&self) -> ArrayView2<'_, F> {
        self.weight_table.view()
    }

    /// Computes the interpolated values at every target point of the field
    /// sampled at the source points by the given value array.
    ///
    /// The length of `source_values` must equal the number of source
    /// points the interpolator was constructed with. The returned array is
    /// freshly allocated with exactly one value per target point.
    ///
    /// Evaluation does not mutate the interpolator and may be repeated or
    /// run concurrently with other evaluations on the same object.
    pub fn interpolate(&self, source_values: &[F]) -> Array1<F> {
        exit_on_false!(
            source_values.len() == self.n_source_points,
            "Error: Number of source values ({}) does not match number of source points ({})",
            source_values.len(),
            self.n_source_points
        );

        let num_neighbors = self.num_neighbors();

        let mut interp_values = Array1::uninit(self.n_target_points());
        interp_values
            .as_slice_memory_order_mut()
            .unwrap()
            .par_iter_mut()
            .enumerate()
            .for_each(|(target_idx, interp_value)| {
                let mut accumulated = F::zero();
                for neighbor_idx in 0..num_neighbors {
                    accumulated = accumulated
                        + self.weight_table[[target_idx, neighbor_idx]]
                            * source_values[self.index_table[[target_idx, neighbor_idx]]];
                }
                interp_value.write(accumulated);
            });
        unsafe { interp_values.assume_init() }
    }

    /// Computes the interpolated vectors at every target point of the
    /// vector field sampled at the source points by the given array,
    /// using the same cached tables as scalar interpolation.
    pub fn interpolate_vectors(&self, source_vectors: &[Vector<F, D>]) -> Array1<Vector<F, D>> {
        exit_on_false!(
            source_vectors.len() == self.n_source_points,
            "Error: Number of source vectors ({}) does not match number of source points ({})",
            source_vectors.len(),
            self.n_source_points
        );

        let num_neighbors = self.num_neighbors();

        let mut interp_vectors = Array1::uninit(self.n_target_points());
        interp_vectors
            .as_slice_memory_order_mut()
            .unwrap()
            .par_iter_mut()
            .enumerate()
            .for_each(|(target_idx, interp_vector)| {
                let mut accumulated = Vector::zero();
                for neighbor_idx in 0..num_neighbors {
                    let weight = self.weight_table[[target_idx, neighbor_idx]];
                    let source_vector =
                        &source_vectors[self.index_table[[target_idx, neighbor_idx]]];
                    accumulated = &accumulated + &(source_vector * weight);
                }
                interp_vector.write(accumulated);
            });
        unsafe { interp_vectors.assume_init() }
    }
}

impl<F: PFloat, const D: usize> ScatteredInterpolator<F>
    for MovingLeastSquaresInterpolator<F, D>
{
    fn n_source_points(&self) -> usize {
        self.n_source_points
    }

    fn n_target_points(&self) -> usize {
        self.index_table.nrows()
    }

    fn interp_values(&self, source_values: &[F]) -> Array1<F> {
        self.interpolate(source_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn quadratic_1d_source_points() -> Vec<Point<f64, 1>> {
        (0..10).map(|x| Point::new([x as f64])).collect()
    }

    #[test]
    fn quadratic_field_is_reproduced_exactly_in_1d() {
        let source_points = quadratic_1d_source_points();
        let source_values: Vec<f64> = (0..10).map(|x| (x * x) as f64).collect();
        let target_points = vec![Point::new([4.5])];

        let interpolator = MovingLeastSquaresInterpolator::new(
            &source_points,
            &target_points,
            &MovingLeastSquaresConfig::default(),
            &Verbosity::Quiet,
        );
        assert_eq!(interpolator.num_neighbors(), 3);

        let interp_values = interpolator.interpolate(&source_values);
        assert_eq!(interp_values.len(), 1);
        assert_relative_eq!(interp_values[0], 20.25, max_relative = 1e-10);
    }

    #[test]
    fn tables_have_consistent_shapes_and_valid_indices() {
        let source_points = quadratic_1d_source_points();
        let target_points: Vec<_> = (0..7).map(|i| Point::new([0.3 + i as f64])).collect();

        let config = MovingLeastSquaresConfig {
            num_neighbors: Some(5),
            ..Default::default()
        };
        let interpolator = MovingLeastSquaresInterpolator::new(
            &source_points,
            &target_points,
            &config,
            &Verbosity::Quiet,
        );

        assert_eq!(interpolator.n_source_points(), 10);
        assert_eq!(interpolator.n_target_points(), 7);
        assert_eq!(interpolator.index_table().dim(), (7, 5));
        assert_eq!(interpolator.weight_table().dim(), (7, 5));
        assert!(interpolator
            .index_table()
            .iter()
            .all(|&source_idx| source_idx < 10));
    }

    #[test]
    fn constant_field_is_reproduced_for_any_degree() {
        let source_points = quadratic_1d_source_points();
        let source_values = vec![7.5; 10];
        let target_points: Vec<_> = [0.1, 2.7, 8.9].iter().map(|&x| Point::new([x])).collect();

        for polynomial_degree in 0..3 {
            let config = MovingLeastSquaresConfig {
                polynomial_degree,
                ..Default::default()
            };
            let interpolator = MovingLeastSquaresInterpolator::new(
                &source_points,
                &target_points,
                &config,
                &Verbosity::Quiet,
            );
            let interp_values = interpolator.interpolate(&source_values);
            for &interp_value in &interp_values {
                assert_relative_eq!(interp_value, 7.5, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn coincident_target_hits_source_value_for_degree_zero() {
        let source_points = quadratic_1d_source_points();
        let identity_values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let target_points = vec![Point::new([4.0])];

        // With degree zero the default neighbor count is one, so the
        // estimate is the value at the coinciding source point itself
        let config = MovingLeastSquaresConfig {
            polynomial_degree: 0,
            ..Default::default()
        };
        let interpolator = MovingLeastSquaresInterpolator::new(
            &source_points,
            &target_points,
            &config,
            &Verbosity::Quiet,
        );
        assert_eq!(interpolator.num_neighbors(), 1);

        let interp_values = interpolator.interpolate(&identity_values);
        assert_relative_eq!(interp_values[0], 4.0, max_relative = 1e-12);
    }

    #[test]
    fn coincident_target_hits_source_value_on_lattice_for_degree_two() {
        // On the integer lattice the identity field coincides with the
        // linear polynomial x, which a degree-2 fit reproduces exactly
        let source_points = quadratic_1d_source_points();
        let identity_values: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let target_points = vec![Point::new([4.0])];

        let interpolator = MovingLeastSquaresInterpolator::new(
            &source_points,
            &target_points,
            &MovingLeastSquaresConfig::default(),
            &Verbosity::Quiet,
        );
        let interp_values = interpolator.interpolate(&identity_values);
        assert_relative_eq!(interp_values[0], 4.0, max_relative = 1e-10);
    }

    #[test]
    fn repeated_evaluation_is_bit_identical() {
        let source_points = quadratic_1d_source_points();
        let source_values: Vec<f64> = (0..10).map(|x| (x * x) as f64).collect();
        let target_points: Vec<_> = [1.3, 4.5, 7.7].iter().map(|&x| Point::new([x])).collect();

        let interpolator = MovingLeastSquaresInterpolator::new(
            &source_points,
            &target_points,
            &MovingLeastSquaresConfig::default(),
            &Verbosity::Quiet,
        );
        let first = interpolator.interpolate(&source_values);
        let second = interpolator.interpolate(&source_values);
        assert_eq!(first, second);
    }

    #[test]
    fn minimal_neighbor_count_succeeds() {
        let source_points = quadratic_1d_source_points();
        let target_points = vec![Point::new([4.5])];

        let config = MovingLeastSquaresConfig {
            num_neighbors: Some(polynomial_basis_size(1, 2)),
            ..Default::default()
        };
        let interpolator = MovingLeastSquaresInterpolator::new(
            &source_points,
            &target_points,
            &config,
            &Verbosity::Quiet,
        );
        assert_eq!(interpolator.num_neighbors(), 3);
    }

    #[test]
    #[should_panic(expected = "Number of neighbors")]
    fn too_large_neighbor_count_fails_construction() {
        let source_points = quadratic_1d_source_points();
        let target_points = vec![Point::new([4.5])];

        let config = MovingLeastSquaresConfig {
            num_neighbors: Some(11),
            ..Default::default()
        };
        MovingLeastSquaresInterpolator::new(
            &source_points,
            &target_points,
            &config,
            &Verbosity::Quiet,
        );
    }

    #[test]
    #[should_panic(expected = "Number of neighbors")]
    fn zero_neighbor_count_fails_construction() {
        let source_points = quadratic_1d_source_points();
        let target_points = vec![Point::new([4.5])];

        let config = MovingLeastSquaresConfig {
            num_neighbors: Some(0),
            ..Default::default()
        };
        MovingLeastSquaresInterpolator::new(
            &source_points,
            &target_points,
            &config,
            &Verbosity::Quiet,
        );
    }

    #[test]
    #[should_panic(expected = "Number of source values")]
    fn mismatched_value_array_length_fails_evaluation() {
        let source_points = quadratic_1d_source_points();
        let target_points = vec![Point::new([4.5])];

        let interpolator = MovingLeastSquaresInterpolator::new(
            &source_points,
            &target_points,
            &MovingLeastSquaresConfig::default(),
            &Verbosity::Quiet,
        );
        interpolator.interpolate(&vec![0.0; 8]);
    }

    #[test]
    #[should_panic(expected = "non-finite components")]
    fn non_finite_source_points_fail_construction() {
        let mut source_points = quadratic_1d_source_points();
        source_points[3] = Point::new([f64::NAN]);
        let target_points = vec![Point::new([4.5])];

        MovingLeastSquaresInterpolator::new(
            &source_points,
            &target_points,
            &MovingLeastSquaresConfig::default(),
            &Verbosity::Quiet,
        );
    }

    #[test]
    fn vector_field_interpolation_matches_componentwise_scalar_interpolation() {
        let source_points: Vec<Point<f64, 2>> = (0..5)
            .flat_map(|i| (0..5).map(move |j| Point::new([i as f64, j as f64])))
            .collect();
        let target_points = vec![Point::new([1.6, 2.3]), Point::new([3.2, 0.8])];

        let component_x: Vec<f64> = source_points.iter().map(|p| 1.0 + 2.0 * p[0]).collect();
        let component_y: Vec<f64> = source_points.iter().map(|p| 3.0 - p[1]).collect();
        let source_vectors: Vec<Vector<f64, 2>> = component_x
            .iter()
            .zip(&component_y)
            .map(|(&x, &y)| Vector::new([x, y]))
            .collect();

        let interpolator = MovingLeastSquaresInterpolator::new(
            &source_points,
            &target_points,
            &MovingLeastSquaresConfig::default(),
            &Verbosity::Quiet,
        );

        let interp_x = interpolator.interpolate(&component_x);
        let interp_y = interpolator.interpolate(&component_y);
        let interp_vectors = interpolator.interpolate_vectors(&source_vectors);

        for target_idx in 0..2 {
            assert_relative_eq!(
                interp_vectors[target_idx][0],
                interp_x[target_idx],
                max_relative = 1e-12
            );
            assert_relative_eq!(
                interp_vectors[target_idx][1],
                interp_y[target_idx],
                max_relative = 1e-12
            );
        }
    }
}
