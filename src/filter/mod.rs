//! Region selection: cell filters and their relation cache.

pub mod cell_filter;
pub mod relations;

pub use cell_filter::CellFilter;
pub use relations::FilterRelations;
