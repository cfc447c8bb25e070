//! Spatial indexing of scattered point sets.

pub mod kd_tree;

use crate::{
    exit_on_false,
    geometry::{Point, PointSet},
    num::PFloat,
};
use rayon::prelude::*;

/// Ragged result of a batched neighbor query, holding a flat sequence of
/// neighbor indices delimited per query point by a sequence of offsets.
#[derive(Clone, Debug)]
pub struct NeighborLists {
    neighbor_indices: Vec<usize>,
    offsets: Vec<usize>,
}

impl NeighborLists {
    fn new(neighbor_indices: Vec<usize>, offsets: Vec<usize>) -> Self {
        debug_assert!(!offsets.is_empty());
        debug_assert_eq!(*offsets.last().unwrap(), neighbor_indices.len());
        Self {
            neighbor_indices,
            offsets,
        }
    }

    /// Returns the number of query points the lists were produced for.
    pub fn n_queries(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Returns the flat sequence of neighbor indices.
    pub fn neighbor_indices(&self) -> &[usize] {
        &self.neighbor_indices
    }

    /// Returns the offsets delimiting each query point's slice of the
    /// flat neighbor index sequence.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Returns the neighbor indices found for the query point with the given index.
    pub fn neighbors_of(&self, query_idx: usize) -> &[usize] {
        &self.neighbor_indices[self.offsets[query_idx]..self.offsets[query_idx + 1]]
    }
}

/// Descriptor for a query asking for a fixed number of nearest neighbors
/// for each point in a set of target points.
pub struct NearestNeighborQuery<'a, P: ?Sized> {
    target_points: &'a P,
    num_neighbors: usize,
}

impl<'a, P: ?Sized> NearestNeighborQuery<'a, P> {
    /// Creates a new query descriptor for finding the `num_neighbors`
    /// nearest indexed points to each of the given target points.
    pub fn new(target_points: &'a P, num_neighbors: usize) -> Self {
        exit_on_false!(
            num_neighbors > 0,
            "Error: Number of requested neighbors must be larger than zero"
        );
        Self {
            target_points,
            num_neighbors,
        }
    }

    /// Returns a reference to the target points of the query.
    pub fn target_points(&self) -> &'a P {
        self.target_points
    }

    /// Returns the number of neighbors requested for each target point.
    pub fn num_neighbors(&self) -> usize {
        self.num_neighbors
    }
}

/// Defines the properties of a spatial index supporting nearest-neighbor
/// queries over a fixed set of points.
pub trait SpatialIndex<F: PFloat, const D: usize>: Sync {
    /// Returns the number of points covered by the index.
    fn n_indexed_points(&self) -> usize;

    /// Finds the indices of the (up to) `num_neighbors` indexed points
    /// nearest to the given query point and appends them to `neighbors`,
    /// in no particular order.
    fn find_nearest(&self, query_point: &Point<F, D>, num_neighbors: usize, neighbors: &mut Vec<usize>);

    /// Executes the given query, producing the indices of the nearest
    /// indexed points for each target point, in target order.
    ///
    /// Each target point with index `i` contributes the slice of the result
    /// delimited by offsets `i` and `i + 1`. If the index covers at least
    /// `num_neighbors` points, every slice has exactly `num_neighbors` entries.
    fn query_nearest<P>(&self, query: &NearestNeighborQuery<'_, P>) -> NeighborLists
    where
        P: PointSet<F, D> + ?Sized,
    {
        let target_points = query.target_points();
        let num_neighbors = query.num_neighbors();
        let n_targets = target_points.n_points();

        let neighbors_per_target: Vec<Vec<usize>> = (0..n_targets)
            .into_par_iter()
            .map(|target_idx| {
                let mut neighbors = Vec::with_capacity(num_neighbors);
                self.find_nearest(&target_points.point(target_idx), num_neighbors, &mut neighbors);
                neighbors
            })
            .collect();

        let mut neighbor_indices = Vec::with_capacity(n_targets * num_neighbors);
        let mut offsets = Vec::with_capacity(n_targets + 1);
        offsets.push(0);
        for neighbors in neighbors_per_target {
            neighbor_indices.extend(neighbors);
            offsets.push(neighbor_indices.len());
        }
        NeighborLists::new(neighbor_indices, offsets)
    }
}
