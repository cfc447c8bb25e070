//! Spatial indexing with a k-d tree.

use super::SpatialIndex;
use crate::{
    geometry::{Point, PointSet},
    num::{KeyValueOrderableByValue, PFloat},
};
use std::collections::BinaryHeap;

/// Maximum number of points stored in a leaf node before it is split.
const MAX_LEAF_SIZE: usize = 16;

#[derive(Clone, Debug)]
enum Node<F> {
    /// Interior node splitting space along one dimension.
    Split {
        dim: usize,
        coord: F,
        left: usize,
        right: usize,
    },
    /// Leaf node covering the range `[start, end)` of the reordered points.
    Leaf { start: usize, end: usize },
}

/// A k-d tree over a fixed set of points, supporting nearest-neighbor queries.
///
/// The tree stores its own reordered copy of the point coordinates together
/// with the original point indices, so query results always refer to the
/// indexing of the point set the tree was built from.
#[derive(Clone, Debug)]
pub struct KdTree<F, const D: usize> {
    nodes: Vec<Node<F>>,
    points: Vec<Point<F, D>>,
    original_indices: Vec<usize>,
}

impl<F: PFloat, const D: usize> KdTree<F, D> {
    /// Builds a new k-d tree over the given point set.
    pub fn new<P>(points: &P) -> Self
    where
        P: PointSet<F, D> + ?Sized,
    {
        let n_points = points.n_points();
        let points: Vec<_> = (0..n_points).map(|point_idx| points.point(point_idx)).collect();
        let original_indices: Vec<_> = (0..n_points).collect();

        let mut tree = Self {
            nodes: Vec::new(),
            points,
            original_indices,
        };

        if n_points > 0 {
            let mut order: Vec<usize> = (0..n_points).collect();
            tree.build_subtree(&mut order, 0, n_points);

            let unordered_points = tree.points.clone();
            let unordered_indices = tree.original_indices.clone();
            for (new_pos, &old_pos) in order.iter().enumerate() {
                tree.points[new_pos] = unordered_points[old_pos];
                tree.original_indices[new_pos] = unordered_indices[old_pos];
            }
        }

        tree
    }

    fn build_subtree(&mut self, order: &mut [usize], start: usize, end: usize) -> usize {
        let count = end - start;

        if count <= MAX_LEAF_SIZE {
            let node_idx = self.nodes.len();
            self.nodes.push(Node::Leaf { start, end });
            return node_idx;
        }

        let split_dim = self.find_dim_with_largest_spread(&order[start..end]);

        let median_pos = start + count / 2;
        let points = &self.points;
        order[start..end].select_nth_unstable_by(median_pos - start, |&a, &b| {
            points[a][split_dim]
                .partial_cmp(&points[b][split_dim])
                .expect("NaN in floating point comparison.")
        });
        let split_coord = self.points[order[median_pos]][split_dim];

        // Reserve a slot for this node before its children are created
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf { start: 0, end: 0 });

        let left = self.build_subtree(order, start, median_pos);
        let right = self.build_subtree(order, median_pos, end);

        self.nodes[node_idx] = Node::Split {
            dim: split_dim,
            coord: split_coord,
            left,
            right,
        };

        node_idx
    }

    fn find_dim_with_largest_spread(&self, order: &[usize]) -> usize {
        let mut best_dim = 0;
        let mut largest_spread = F::neg_infinity();

        for dim in 0..D {
            let mut lower = F::infinity();
            let mut upper = F::neg_infinity();
            for &point_idx in order {
                let coord = self.points[point_idx][dim];
                lower = lower.min(coord);
                upper = upper.max(coord);
            }
            let spread = upper - lower;
            if spread > largest_spread {
                largest_spread = spread;
                best_dim = dim;
            }
        }

        best_dim
    }

    fn find_nearest_in_subtree(
        &self,
        node_idx: usize,
        query_point: &Point<F, D>,
        num_neighbors: usize,
        nearest: &mut BinaryHeap<KeyValueOrderableByValue<usize, F>>,
    ) {
        match self.nodes[node_idx] {
            Node::Leaf { start, end } => {
                for point_idx in start..end {
                    let squared_dist = self.points[point_idx].squared_distance_from(query_point);
                    if nearest.len() < num_neighbors {
                        nearest.push(KeyValueOrderableByValue(
                            self.original_indices[point_idx],
                            squared_dist,
                        ));
                    } else if nearest
                        .peek()
                        .map_or(false, |furthest| squared_dist < furthest.1)
                    {
                        nearest.pop();
                        nearest.push(KeyValueOrderableByValue(
                            self.original_indices[point_idx],
                            squared_dist,
                        ));
                    }
                }
            }
            Node::Split {
                dim,
                coord,
                left,
                right,
            } => {
                let signed_plane_dist = query_point[dim] - coord;

                let (near, far) = if signed_plane_dist <= F::zero() {
                    (left, right)
                } else {
                    (right, left)
                };

                self.find_nearest_in_subtree(near, query_point, num_neighbors, nearest);

                let squared_plane_dist = signed_plane_dist * signed_plane_dist;
                if nearest.len() < num_neighbors
                    || nearest
                        .peek()
                        .map_or(true, |furthest| squared_plane_dist < furthest.1)
                {
                    self.find_nearest_in_subtree(far, query_point, num_neighbors, nearest);
                }
            }
        }
    }
}

impl<F: PFloat, const D: usize> SpatialIndex<F, D> for KdTree<F, D> {
    fn n_indexed_points(&self) -> usize {
        self.points.len()
    }

    fn find_nearest(
        &self,
        query_point: &Point<F, D>,
        num_neighbors: usize,
        neighbors: &mut Vec<usize>,
    ) {
        if self.nodes.is_empty() || num_neighbors == 0 {
            return;
        }
        let mut nearest = BinaryHeap::with_capacity(num_neighbors + 1);
        self.find_nearest_in_subtree(0, query_point, num_neighbors, &mut nearest);
        neighbors.extend(
            nearest
                .into_iter()
                .map(|KeyValueOrderableByValue(original_idx, _)| original_idx),
        );
    }
}
