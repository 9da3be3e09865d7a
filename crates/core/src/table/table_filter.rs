//! Accept/reject decisions for candidate tables.
//!
//! Each [`TablePredicate`] is an independent test over one table and its
//! page; a table is rejected when any enabled predicate holds. After the
//! per-table pass, candidates sitting right next to an accepted table are
//! handled by the configured [`SplitTablePolicy`].

use std::collections::{BTreeMap, BTreeSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::clustering::count_clusters;
use super::metrics::{
    aligned_band_count, group_text_lines, median, mode_font_size, mode_glyph_size,
    overlapping_pairs,
};
use super::settings::{SplitTablePolicy, TableFilterSettings};
use super::types::{BBox, Cell, CharObj, KeyF64, Orientation, Page, Table, key_f64};

/// A reason to reject a candidate table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum TablePredicate {
    /// No cell holds a glyph.
    NoText,
    /// Text and empty cells split along whole rows or whole columns.
    MixedEmptyTextSplit,
    /// Every cell has its own height and its own width.
    DegenerateGrid,
    /// One cell frames a paragraph of regularly spaced lines.
    BoxedText,
    /// Most cells are set noticeably smaller than the page body text.
    FontSizeOutliers,
    /// Mostly empty cells.
    SparseText,
    /// Most cells hold a single glyph, as in boxed title lettering.
    SingleCharCells,
    /// A strip of cells with more fill colours than cells: a bar chart.
    FillColorMismatch,
    /// Cells overlap or refuse to line up in rows and columns.
    UnalignedProximity,
    /// A single row or column too thin to hold a line of text.
    ThinStrip,
    /// Most cells are smaller than the table's typical glyph.
    SmallCellsDominate,
    /// Two cells drawn as two separate boxes with a gap between them.
    DetachedPair,
}

impl TablePredicate {
    pub const ALL: [TablePredicate; 12] = [
        TablePredicate::NoText,
        TablePredicate::MixedEmptyTextSplit,
        TablePredicate::DegenerateGrid,
        TablePredicate::BoxedText,
        TablePredicate::FontSizeOutliers,
        TablePredicate::SparseText,
        TablePredicate::SingleCharCells,
        TablePredicate::FillColorMismatch,
        TablePredicate::UnalignedProximity,
        TablePredicate::ThinStrip,
        TablePredicate::SmallCellsDominate,
        TablePredicate::DetachedPair,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TablePredicate::NoText => "no_text",
            TablePredicate::MixedEmptyTextSplit => "mixed_empty_text_split",
            TablePredicate::DegenerateGrid => "degenerate_grid",
            TablePredicate::BoxedText => "boxed_text",
            TablePredicate::FontSizeOutliers => "font_size_outliers",
            TablePredicate::SparseText => "sparse_text",
            TablePredicate::SingleCharCells => "single_char_cells",
            TablePredicate::FillColorMismatch => "fill_color_mismatch",
            TablePredicate::UnalignedProximity => "unaligned_proximity",
            TablePredicate::ThinStrip => "thin_strip",
            TablePredicate::SmallCellsDominate => "small_cells_dominate",
            TablePredicate::DetachedPair => "detached_pair",
        }
    }

    /// Whether this predicate rejects `table`.
    pub fn rejects(self, ctx: &FilterContext<'_>, table: &Table) -> bool {
        match self {
            TablePredicate::NoText => table.text_cell_count() == 0,
            TablePredicate::MixedEmptyTextSplit => mixed_empty_text_split(table),
            TablePredicate::DegenerateGrid => degenerate_grid(ctx, table),
            TablePredicate::BoxedText => boxed_text(ctx, table),
            TablePredicate::FontSizeOutliers => font_size_outliers(ctx, table),
            TablePredicate::SparseText => sparse_text(ctx, table),
            TablePredicate::SingleCharCells => single_char_cells(ctx, table),
            TablePredicate::FillColorMismatch => fill_color_mismatch(ctx, table),
            TablePredicate::UnalignedProximity => unaligned_proximity(ctx, table),
            TablePredicate::ThinStrip => thin_strip(ctx, table),
            TablePredicate::SmallCellsDominate => small_cells_dominate(ctx, table),
            TablePredicate::DetachedPair => detached_pair(ctx, table),
        }
    }
}

/// Page-level state shared by every predicate evaluation on one page.
pub struct FilterContext<'a> {
    pub page: &'a Page,
    pub settings: &'a TableFilterSettings,
    /// Modal glyph size over the whole page.
    pub body_font_size: Option<f64>,
}

impl<'a> FilterContext<'a> {
    pub fn new(page: &'a Page, settings: &'a TableFilterSettings) -> Self {
        Self {
            page,
            settings,
            body_font_size: mode_font_size(&page.chars),
        }
    }

    fn chars_of<'c>(&'c self, cell: &'c Cell) -> impl Iterator<Item = &'a CharObj> + 'c {
        cell.chars.iter().map(|&id| self.page.char(id))
    }

    fn is_enabled(&self, predicate: TablePredicate) -> bool {
        !self.settings.disabled.contains(&predicate)
    }

    /// First enabled predicate in `order` that rejects `table`.
    pub fn first_rejection(
        &self,
        table: &Table,
        order: &[TablePredicate],
    ) -> Option<TablePredicate> {
        order
            .iter()
            .copied()
            .filter(|p| self.is_enabled(*p))
            .find(|p| p.rejects(self, table))
    }

    /// Every enabled predicate that rejects `table`.
    pub fn rejections(&self, table: &Table) -> Vec<TablePredicate> {
        TablePredicate::ALL
            .iter()
            .copied()
            .filter(|p| self.is_enabled(*p) && p.rejects(self, table))
            .collect()
    }

    pub fn is_rejected(&self, table: &Table) -> bool {
        self.first_rejection(table, &TablePredicate::ALL).is_some()
    }
}

/// In a single-row or single-column strip every band holds one cell, so any
/// blank cell makes the split and the strip is rejected.
fn mixed_empty_text_split(table: &Table) -> bool {
    if table.text_cell_count() == 0 || table.empty_cell_count() == 0 {
        return false;
    }
    fn row_key(c: &Cell) -> (KeyF64, KeyF64) {
        (key_f64(c.bbox.top), key_f64(c.bbox.bottom))
    }
    fn col_key(c: &Cell) -> (KeyF64, KeyF64) {
        (key_f64(c.bbox.x0), key_f64(c.bbox.x1))
    }

    let uniform_by = |band: fn(&Cell) -> (KeyF64, KeyF64)| {
        let mut bands: BTreeMap<(KeyF64, KeyF64), (bool, bool)> = BTreeMap::new();
        for cell in &table.cells {
            let seen = bands.entry(band(cell)).or_default();
            if cell.is_empty() {
                seen.0 = true;
            } else {
                seen.1 = true;
            }
        }
        bands.values().all(|(empty, text)| !(*empty && *text))
    };
    uniform_by(row_key) || uniform_by(col_key)
}

fn degenerate_grid(ctx: &FilterContext<'_>, table: &Table) -> bool {
    let n = table.cells.len();
    let tol = ctx.settings.size_tolerance;
    let heights = table.cells.iter().map(|c| c.bbox.height()).collect();
    let widths = table.cells.iter().map(|c| c.bbox.width()).collect();
    count_clusters(heights, tol) == n && count_clusters(widths, tol) == n
}

fn boxed_text(ctx: &FilterContext<'_>, table: &Table) -> bool {
    let s = ctx.settings;
    let total: usize = table.cells.iter().map(Cell::char_count).sum();
    let Some(fullest) = table.cells.iter().max_by_key(|c| c.char_count()) else {
        return false;
    };
    if total == 0 || (fullest.char_count() as f64) < s.prose_char_share * total as f64 {
        return false;
    }

    let chars: Vec<&CharObj> = ctx.chars_of(fullest).collect();
    let lines = group_text_lines(&chars, s.line_tolerance);
    if lines.len() < s.prose_min_lines {
        return false;
    }
    let tops: Vec<f64> = lines
        .iter()
        .map(|line| line.iter().map(|c| c.top).fold(f64::INFINITY, f64::min))
        .collect();
    let gaps: Vec<f64> = tops.windows(2).map(|w| w[1] - w[0]).collect();
    let (Some(pitch), Some(font_size)) = (median(&gaps), mode_font_size(chars.iter().copied()))
    else {
        return false;
    };
    let regular = gaps
        .iter()
        .all(|g| (g - pitch).abs() <= s.prose_pitch_tolerance * pitch);
    regular && pitch <= s.prose_max_line_spacing * font_size
}

fn font_size_outliers(ctx: &FilterContext<'_>, table: &Table) -> bool {
    let Some(body) = ctx.body_font_size else {
        return false;
    };
    let threshold = body - ctx.settings.font_size_margin;
    let mut filled = 0usize;
    let mut small = 0usize;
    for cell in table.cells.iter().filter(|c| !c.is_empty()) {
        filled += 1;
        let mean = ctx.chars_of(cell).map(|c| c.size).sum::<f64>() / cell.char_count() as f64;
        if mean < threshold {
            small += 1;
        }
    }
    small * 2 > filled
}

fn sparse_text(ctx: &FilterContext<'_>, table: &Table) -> bool {
    let n = table.cells.len();
    n > 0 && table.empty_cell_count() as f64 / n as f64 > ctx.settings.max_empty_fraction
}

fn single_char_cells(ctx: &FilterContext<'_>, table: &Table) -> bool {
    let mut filled = 0usize;
    let mut single = 0usize;
    for cell in table.cells.iter().filter(|c| !c.is_empty()) {
        filled += 1;
        if ctx.chars_of(cell).filter(|c| !c.is_blank()).count() == 1 {
            single += 1;
        }
    }
    filled > 0 && single as f64 > ctx.settings.single_char_cell_fraction * filled as f64
}

fn fill_color_mismatch(ctx: &FilterContext<'_>, table: &Table) -> bool {
    let (rows, cols) = (table.row_bands(), table.col_bands());
    if !((rows == 1 || cols == 1) && rows + cols > 4) {
        return false;
    }
    let fills: BTreeSet<_> = table
        .rects
        .iter()
        .filter_map(|&id| ctx.page.rect(id).non_stroking_color)
        .collect();
    fills.len() > table.cells.len()
}

fn unaligned_proximity(ctx: &FilterContext<'_>, table: &Table) -> bool {
    let s = ctx.settings;
    let n = table.cells.len() as f64;
    let boxes: Vec<BBox> = table.cells.iter().map(|c| c.bbox).collect();
    if overlapping_pairs(&boxes, &boxes).len() as f64 > s.overlap_ratio * n {
        return true;
    }
    let rows = aligned_band_count(&table.cells, Orientation::Horizontal, s.alignment_tolerance);
    let cols = aligned_band_count(&table.cells, Orientation::Vertical, s.alignment_tolerance);
    (rows * cols) as f64 > s.misalignment_ratio * n
}

fn thin_strip(ctx: &FilterContext<'_>, table: &Table) -> bool {
    let Some(first) = table.cells.first() else {
        return false;
    };
    let s = ctx.settings;
    (table.row_bands() == 1 && first.bbox.height() < s.thin_row_ratio * ctx.page.height())
        || (table.col_bands() == 1 && first.bbox.width() < s.thin_col_ratio * ctx.page.width())
}

fn small_cells_dominate(ctx: &FilterContext<'_>, table: &Table) -> bool {
    let inside: Vec<&CharObj> = ctx
        .page
        .chars
        .iter()
        .filter(|c| table.bbox.contains(&c.bbox(), 0.0))
        .collect();
    let Some((glyph_w, glyph_h)) = mode_glyph_size(&inside) else {
        return false;
    };
    let n = table.cells.len();
    let small = table
        .cells
        .iter()
        .filter(|c| c.bbox.height() < glyph_h || c.bbox.width() < glyph_w)
        .count();
    small * 2 > n - small
}

fn detached_pair(ctx: &FilterContext<'_>, table: &Table) -> bool {
    if table.cells.len() != 2 || table.rects.is_empty() {
        return false;
    }
    let rects: Vec<BBox> = table.rects.iter().map(|&id| ctx.page.rect(id).bbox()).collect();
    let tol = ctx.settings.pair_gap_tolerance;
    if table.row_bands() == 2 {
        let min_bottom = rects.iter().map(|r| r.bottom).fold(f64::INFINITY, f64::min);
        let max_top = rects.iter().map(|r| r.top).fold(f64::NEG_INFINITY, f64::max);
        max_top - min_bottom > tol
    } else if table.col_bands() == 2 {
        let min_x1 = rects.iter().map(|r| r.x1).fold(f64::INFINITY, f64::min);
        let max_x0 = rects.iter().map(|r| r.x0).fold(f64::NEG_INFINITY, f64::max);
        max_x0 - min_x1 > tol
    } else {
        false
    }
}

/// True when `a` and `b` are close enough and lined up well enough to be
/// two halves of one table.
fn is_split_fragment(a: &BBox, b: &BBox, min_distance: f64) -> bool {
    a.distance(b) < min_distance && (a.overlaps_x(b) || a.overlaps_y(b))
}

fn fold_into(target: &mut Table, fragment: Table) {
    target.bbox = target.bbox.union(&fragment.bbox);
    target.cells.extend(fragment.cells);
    target.cells.sort_by(|a, b| {
        a.bbox
            .top
            .partial_cmp(&b.bbox.top)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.bbox
                    .x0
                    .partial_cmp(&b.bbox.x0)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    target.rects.extend(fragment.rects);
    target.rects.sort_unstable();
    target.rects.dedup();
}

/// Apply the per-table predicates, then the split-table policy.
///
/// Accepted tables keep their input order.
pub fn filter_tables(tables: Vec<Table>, page: &Page, settings: &TableFilterSettings) -> Vec<Table> {
    let ctx = FilterContext::new(page, settings);
    let mut accepted: Vec<Table> = Vec::with_capacity(tables.len());
    for table in tables {
        if let Some(predicate) = ctx.first_rejection(&table, &TablePredicate::ALL) {
            debug!(table = table.id.0, predicate = predicate.name(), "rejected table");
            continue;
        }

        if settings.split_policy == SplitTablePolicy::Keep {
            accepted.push(table);
            continue;
        }
        let neighbour = accepted
            .iter()
            .position(|t| is_split_fragment(&t.bbox, &table.bbox, settings.min_table_distance));
        match (neighbour, settings.split_policy) {
            (Some(idx), SplitTablePolicy::Merge) => {
                debug!(
                    table = table.id.0,
                    into = accepted[idx].id.0,
                    "merged split table"
                );
                fold_into(&mut accepted[idx], table);
            }
            (Some(idx), _) => {
                debug!(
                    table = table.id.0,
                    near = accepted[idx].id.0,
                    predicate = "table_distance",
                    "rejected table"
                );
            }
            (None, _) => accepted.push(table),
        }
    }
    accepted
}
