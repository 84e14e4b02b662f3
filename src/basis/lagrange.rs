//! Reference Lagrange basis, orders 0 through 2.
//!
//! Order 0 is element-attached (one DOF per cell interior, nothing shared);
//! order 1 is nodal (one DOF per vertex); order 2 adds one DOF per edge
//! interior. Hanging-DOF interpolation is one-dimensional along the parent
//! facet the hanging entity lies on, so a single 1D shape-function
//! evaluation covers bisection and trisection of any supported pattern.
//!
//! Cell-local DOF numbering convention: vertices first (DOF `i` is vertex
//! `i`), then edge interiors (edge `e` connects vertices `e` and
//! `(e+1) % n_vertices`, its interior DOF is `n_vertices + e`).

use crate::basis::{BasisDofTopology, HangingInterpolation, HangingQuery};
use crate::dof_error::DofSieveError;

/// Lagrange basis family of a fixed polynomial order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Lagrange {
    order: usize,
}

impl Lagrange {
    /// A Lagrange basis of the given order.
    ///
    /// # Panics
    /// Orders above 2 are not provided by this reference implementation.
    pub fn new(order: usize) -> Self {
        assert!(order <= 2, "reference Lagrange basis supports orders 0..=2, got {order}");
        Self { order }
    }
}

fn n_edges(cell_dim: usize) -> usize {
    match cell_dim {
        0 => 0,
        1 => 1,
        2 => 3,
        _ => 6,
    }
}

/// 1D Lagrange shape functions at parametric `t` on `[0, 1]`,
/// ordered endpoint 0, endpoint 1, then (for order 2) the midpoint node.
fn shape_1d(order: usize, t: f64) -> Vec<f64> {
    match order {
        1 => vec![1.0 - t, t],
        2 => vec![(1.0 - t) * (1.0 - 2.0 * t), t * (2.0 * t - 1.0), 4.0 * t * (1.0 - t)],
        _ => unreachable!("no 1D shape functions for order {order}"),
    }
}

impl BasisDofTopology for Lagrange {
    fn order(&self) -> usize {
        self.order
    }

    fn is_nodal(&self) -> bool {
        self.order == 1
    }

    fn is_cell_attached(&self) -> bool {
        self.order == 0
    }

    fn dofs_on_entity(&self, cell_dim: usize, entity_dim: usize) -> usize {
        match self.order {
            0 => usize::from(entity_dim == cell_dim),
            1 => usize::from(entity_dim == 0),
            _ => usize::from(entity_dim <= 1),
        }
    }

    fn total_dofs_per_cell(&self, cell_dim: usize) -> usize {
        match self.order {
            0 => 1,
            1 => cell_dim + 1,
            _ => cell_dim + 1 + n_edges(cell_dim),
        }
    }

    fn hanging_interpolation(
        &self,
        q: &HangingQuery,
    ) -> Result<HangingInterpolation, DofSieveError> {
        if self.order == 0 {
            return Err(DofSieveError::NoInterpolationRule { order: self.order });
        }

        // Subdivision count along one parent edge. 4/9 children cover
        // quadtree-style patterns whose per-edge fan-out is the square root.
        let edge_fanout = match q.n_children {
            2 | 4 => 2,
            3 | 9 => 3,
            _ => {
                return Err(DofSieveError::UnsupportedRefinement {
                    parent: q.index_in_parent,
                    children: q.n_children,
                });
            }
        };
        let along_edge = q.index_in_parent % edge_fanout;

        // Parametric position of the hanging DOF on the parent facet:
        // child vertices sit at the segment ends, a child-edge interior DOF
        // (order 2) at its midpoint.
        let s = if q.facet_dim == 0 {
            q.facet_index.min(1) as f64
        } else {
            0.5
        };
        let t = (along_edge as f64 + s) / edge_fanout as f64;

        let n_vertices = q.max_cell_dim + 1;
        let (parent_facet_dim, parent_facet_index) = if q.max_cell_dim == 1 {
            (1, 0)
        } else {
            (1, q.facet_index)
        };
        let v0 = parent_facet_index;
        let v1 = (parent_facet_index + 1) % n_vertices;

        let coefficients = shape_1d(self.order, t);
        let parent_local_dofs = match self.order {
            1 => vec![v0, v1],
            _ => vec![v0, v1, n_vertices + parent_facet_index],
        };

        Ok(HangingInterpolation {
            parent_facet_dim,
            parent_facet_index,
            parent_local_dofs,
            coefficients,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(index_in_parent: usize, n_children: usize, facet_index: usize) -> HangingQuery {
        HangingQuery {
            index_in_parent,
            max_cell_dim: 1,
            n_children,
            facet_dim: 0,
            facet_index,
            node_index: 0,
        }
    }

    #[test]
    fn dof_counts_per_order() {
        assert_eq!(Lagrange::new(0).total_dofs_per_cell(2), 1);
        assert_eq!(Lagrange::new(1).total_dofs_per_cell(1), 2);
        assert_eq!(Lagrange::new(1).total_dofs_per_cell(2), 3);
        assert_eq!(Lagrange::new(2).total_dofs_per_cell(1), 3);
        assert_eq!(Lagrange::new(2).total_dofs_per_cell(2), 6);
        assert_eq!(Lagrange::new(1).dofs_on_entity(2, 0), 1);
        assert_eq!(Lagrange::new(1).dofs_on_entity(2, 1), 0);
        assert_eq!(Lagrange::new(2).dofs_on_entity(2, 1), 1);
    }

    #[test]
    fn bisection_midpoint_is_half_half() {
        // Child 0's right vertex in a bisected segment sits at t = 1/2.
        let interp = Lagrange::new(1).hanging_interpolation(&query(0, 2, 1)).unwrap();
        assert_eq!(interp.parent_local_dofs, vec![0, 1]);
        assert!((interp.coefficients[0] - 0.5).abs() < 1e-15);
        assert!((interp.coefficients[1] - 0.5).abs() < 1e-15);
    }

    #[test]
    fn trisection_points() {
        // Child 0's right vertex at t = 1/3.
        let interp = Lagrange::new(1).hanging_interpolation(&query(0, 3, 1)).unwrap();
        assert!((interp.coefficients[0] - 2.0 / 3.0).abs() < 1e-15);
        assert!((interp.coefficients[1] - 1.0 / 3.0).abs() < 1e-15);
        // Child 2's left vertex at t = 2/3.
        let interp = Lagrange::new(1).hanging_interpolation(&query(2, 3, 0)).unwrap();
        assert!((interp.coefficients[0] - 1.0 / 3.0).abs() < 1e-15);
        assert!((interp.coefficients[1] - 2.0 / 3.0).abs() < 1e-15);
    }

    #[test]
    fn quadratic_midpoint_matches_parent_mid_node() {
        let interp = Lagrange::new(2).hanging_interpolation(&query(0, 2, 1)).unwrap();
        assert_eq!(interp.parent_local_dofs, vec![0, 1, 2]);
        assert!(interp.coefficients[0].abs() < 1e-15);
        assert!(interp.coefficients[1].abs() < 1e-15);
        assert!((interp.coefficients[2] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn coefficients_sum_to_one() {
        for order in [1, 2] {
            for n_children in [2usize, 3] {
                for idx in 0..n_children {
                    for fi in 0..2 {
                        let q = HangingQuery {
                            index_in_parent: idx,
                            max_cell_dim: 1,
                            n_children,
                            facet_dim: 0,
                            facet_index: fi,
                            node_index: 0,
                        };
                        let interp = Lagrange::new(order).hanging_interpolation(&q).unwrap();
                        let sum: f64 = interp.coefficients.iter().sum();
                        assert!((sum - 1.0).abs() < 1e-12, "order {order}: sum {sum}");
                    }
                }
            }
        }
    }

    #[test]
    fn unsupported_fanout_is_rejected() {
        let q = HangingQuery {
            index_in_parent: 0,
            max_cell_dim: 1,
            n_children: 5,
            facet_dim: 0,
            facet_index: 1,
            node_index: 0,
        };
        let err = Lagrange::new(1).hanging_interpolation(&q).unwrap_err();
        assert!(matches!(err, DofSieveError::UnsupportedRefinement { children: 5, .. }));
    }

    #[test]
    fn order_zero_has_no_rule() {
        let err = Lagrange::new(0).hanging_interpolation(&query(0, 2, 1)).unwrap_err();
        assert!(matches!(err, DofSieveError::NoInterpolationRule { order: 0 }));
    }
}
