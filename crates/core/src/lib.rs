//! tablesieve - Table detection and refinement for textbook PDF pages.
//!
//! Takes already-parsed pages (glyphs, rects, lines) and returns the ruled
//! regions that hold real tabular content.

pub mod error;
pub mod table;

pub use error::{Result, TableError};
pub use table::{Page, Table, TableFinder, TableSettings, find_tables};
