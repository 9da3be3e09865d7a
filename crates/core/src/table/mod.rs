//! Table detection for textbook pages.
//!
//! Ruled regions are found from drawn rects and lines, then refined: cells
//! that cannot be real are dropped, and candidates that look like
//! decorative boxes, charts, or boxed titles are rejected.

pub mod cell_filter;
pub mod clustering;
pub mod edges;
pub mod finder;
pub mod grid;
mod intersections;
pub mod metrics;
pub mod settings;
pub mod table_filter;
pub mod types;

pub use cell_filter::{CellDefect, CellFilter, filter_cells};
pub use edges::{LinesEdgeMerger, TextbookEdgeMerger};
pub use finder::{EdgeMerger, LatticeBuilder, TableFinder, find_tables};
pub use grid::IntersectionLattice;
pub use settings::{
    CellFilterSettings, EdgeSettings, EdgeSource, EdgeStrategy, ExplicitLine, LatticeSettings,
    SplitTablePolicy, TableFilterSettings, TableSettings,
};
pub use table_filter::{FilterContext, TablePredicate, filter_tables};
pub use types::{
    BBox, Cell, CharId, CharObj, ColorId, EdgeObj, EdgeSet, LineObj, Orientation, Page, RectId,
    RectObj, Table, TableId,
};
