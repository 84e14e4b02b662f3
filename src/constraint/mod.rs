//! Non-conforming mesh support: hanging-node constraints and the
//! interpolation-matrix cache behind them.

pub mod hanging;
pub mod matrix_store;

pub use hanging::{
    ConstraintTerm, HangingDofConstraint, HangingNodeConstraintMap, interpolate_hanging_value,
};
pub use matrix_store::{DEDUP_TOL, MatrixStore};
