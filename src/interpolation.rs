//! Meshless interpolation of scattered data.

pub mod coefficients;
pub mod moving_least_squares;
pub mod polynomial_basis;
pub mod radial_basis;

use crate::num::PFloat;
use ndarray::Array1;

/// Defines the properties of an interpolator constructed for fixed source
/// and target point sets.
///
/// Construction performs all geometric work (neighbor discovery and weight
/// computation); the resulting object can be evaluated repeatedly for
/// different value arrays sampled on the same source points.
pub trait ScatteredInterpolator<F: PFloat>: Sync + Send {
    /// Returns the number of source points the interpolator was constructed with.
    ///
    /// Every supplied value array must have exactly this length.
    fn n_source_points(&self) -> usize;

    /// Returns the number of target points values are estimated at.
    fn n_target_points(&self) -> usize;

    /// Computes the interpolated values at every target point of the field
    /// sampled at the source points by the given value array.
    ///
    /// # Parameters
    ///
    /// - `source_values`: Flat array of field values, one per source point,
    ///   addressed by the source point indexing used at construction.
    ///
    /// # Returns
    ///
    /// A newly allocated array with exactly one interpolated value per target point.
    fn interp_values(&self, source_values: &[F]) -> Array1<F>;
}
