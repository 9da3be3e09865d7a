//! Removal of implausible cells from candidate tables.
//!
//! Filtering repeats until a pass removes nothing, so applying it to its own
//! output is a no-op.

use tracing::debug;

use super::clustering::bbox_from_chars;
use super::metrics::{median, min_glyph_size};
use super::settings::CellFilterSettings;
use super::types::{Cell, Page, Table};

/// Why a cell was removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellDefect {
    /// The cell boundary cuts through the glyphs it holds.
    ClippedContent,
    /// Narrower and shorter than the smallest glyph on the page.
    SubGlyph,
    /// Far lower than the table's typical cell.
    HeightOutlier,
}

impl CellDefect {
    pub fn name(self) -> &'static str {
        match self {
            CellDefect::ClippedContent => "clipped_content",
            CellDefect::SubGlyph => "sub_glyph",
            CellDefect::HeightOutlier => "height_outlier",
        }
    }
}

/// Cell filter bound to one page.
pub struct CellFilter<'a> {
    page: &'a Page,
    settings: &'a CellFilterSettings,
    min_glyph: Option<(f64, f64)>,
}

impl<'a> CellFilter<'a> {
    pub fn new(page: &'a Page, settings: &'a CellFilterSettings) -> Self {
        Self {
            page,
            settings,
            min_glyph: min_glyph_size(&page.chars),
        }
    }

    /// First defect found in `cell`, given the table's median cell height.
    pub fn defect(&self, cell: &Cell, median_height: f64) -> Option<CellDefect> {
        let tol = self.settings.content_overflow_tolerance;
        if let Some(content) = bbox_from_chars(cell.chars.iter().map(|&id| self.page.char(id))) {
            let b = &cell.bbox;
            if content.x0 < b.x0 - tol
                || content.top < b.top - tol
                || content.x1 > b.x1 + tol
                || content.bottom > b.bottom + tol
            {
                return Some(CellDefect::ClippedContent);
            }
        }

        if self.settings.drop_subglyph_cells
            && let Some((min_w, min_h)) = self.min_glyph
            && cell.bbox.width() < min_w
            && cell.bbox.height() < min_h
        {
            return Some(CellDefect::SubGlyph);
        }

        if cell.bbox.height() < self.settings.min_height_ratio * median_height {
            return Some(CellDefect::HeightOutlier);
        }
        None
    }

    /// Remove defective cells until none remain. Returns how many were
    /// removed. The table bbox is left as built.
    pub fn apply(&self, table: &mut Table) -> usize {
        let table_id = table.id.0;
        let mut removed = 0;
        loop {
            let heights: Vec<f64> = table.cells.iter().map(|c| c.bbox.height()).collect();
            let median_height = median(&heights).unwrap_or(0.0);

            let before = table.cells.len();
            table.cells.retain(|cell| match self.defect(cell, median_height) {
                Some(defect) => {
                    debug!(
                        table = table_id,
                        x0 = cell.bbox.x0,
                        top = cell.bbox.top,
                        reason = defect.name(),
                        "removed cell"
                    );
                    false
                }
                None => true,
            });

            let pass = before - table.cells.len();
            if pass == 0 {
                return removed;
            }
            removed += pass;
        }
    }
}

/// Filter the cells of one table against its page.
pub fn filter_cells(table: &mut Table, page: &Page, settings: &CellFilterSettings) -> usize {
    CellFilter::new(page, settings).apply(table)
}
