//! Table detection settings.
//!
//! Every threshold used by the edge merger, lattice builder and filters is a
//! named field here. `TableSettings` is passed explicitly through the
//! pipeline; there is no process-wide default state.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Result, TableError};

use super::table_filter::TablePredicate;
use super::types::{BBox, Orientation};

// Default constants
pub(crate) const DEFAULT_SNAP_TOLERANCE: f64 = 3.0;
pub(crate) const DEFAULT_JOIN_TOLERANCE: f64 = 3.0;
pub(crate) const DEFAULT_GRID_SNAP_TOLERANCE: f64 = 1e-2;
pub(crate) const DEFAULT_INTERSECTION_TOLERANCE: f64 = 3.0;

/// How raw segments become canonical edges.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum EdgeStrategy {
    /// pdfplumber behaviour: snap to cluster averages, then join.
    Lines,
    /// Merge collinear segments, snap to a grid, then drop page-border and
    /// full-span rules.
    Textbook,
}

impl EdgeStrategy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "lines" => Some(EdgeStrategy::Lines),
            "textbook" => Some(EdgeStrategy::Textbook),
            _ => None,
        }
    }
}

/// Where the edges of one orientation come from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EdgeSource {
    /// Rect borders and stroked lines.
    Lines,
    /// Stroked lines only.
    LinesStrict,
    /// Only the configured explicit lines.
    Explicit,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ExplicitLine {
    /// A rule across the whole page at this coordinate.
    Coord(f64),
    /// The borders of this box with the matching orientation.
    Rect(BBox),
}

/// What to do with a table that sits too close to an accepted one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SplitTablePolicy {
    Keep,
    Reject,
    Merge,
}

impl SplitTablePolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "keep" => Some(SplitTablePolicy::Keep),
            "reject" => Some(SplitTablePolicy::Reject),
            "merge" => Some(SplitTablePolicy::Merge),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct EdgeSettings {
    pub strategy: EdgeStrategy,
    pub vertical_source: EdgeSource,
    pub horizontal_source: EdgeSource,
    pub explicit_vertical_lines: Vec<ExplicitLine>,
    pub explicit_horizontal_lines: Vec<ExplicitLine>,
    /// Snap tolerance for vertical edges. A cluster radius for `Lines`, a
    /// grid step for `Textbook`.
    pub snap_x_tolerance: f64,
    /// Snap tolerance for horizontal edges.
    pub snap_y_tolerance: f64,
    /// Largest gap bridged when joining horizontal segments.
    pub join_x_tolerance: f64,
    /// Largest gap bridged when joining vertical segments.
    pub join_y_tolerance: f64,
    /// Fixed coordinates closer than this are treated as one line when
    /// merging (`Textbook` only).
    pub collinear_tolerance: f64,
    pub edge_min_length: f64,
    pub edge_min_length_prefilter: f64,
    /// Edges reaching into this fraction of the page at any margin are page
    /// borders.
    pub terminal_margin_ratio: f64,
    /// Edges longer than this fraction of the page extent are rules, not
    /// table borders.
    pub max_edge_span_ratio: f64,
    /// Drop edges whose stroking and fill colours are equal.
    pub drop_colorless_edges: bool,
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            strategy: EdgeStrategy::Textbook,
            vertical_source: EdgeSource::Lines,
            horizontal_source: EdgeSource::Lines,
            explicit_vertical_lines: Vec::new(),
            explicit_horizontal_lines: Vec::new(),
            snap_x_tolerance: DEFAULT_GRID_SNAP_TOLERANCE,
            snap_y_tolerance: DEFAULT_GRID_SNAP_TOLERANCE,
            join_x_tolerance: DEFAULT_JOIN_TOLERANCE,
            join_y_tolerance: DEFAULT_JOIN_TOLERANCE,
            collinear_tolerance: 1.0,
            edge_min_length: 3.0,
            edge_min_length_prefilter: 1.0,
            terminal_margin_ratio: 0.03,
            max_edge_span_ratio: 0.95,
            drop_colorless_edges: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct LatticeSettings {
    pub intersection_x_tolerance: f64,
    pub intersection_y_tolerance: f64,
    /// Connected cell groups smaller than this are not tables.
    pub min_table_cells: usize,
}

impl Default for LatticeSettings {
    fn default() -> Self {
        Self {
            intersection_x_tolerance: DEFAULT_INTERSECTION_TOLERANCE,
            intersection_y_tolerance: DEFAULT_INTERSECTION_TOLERANCE,
            min_table_cells: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct CellFilterSettings {
    /// How far enclosed glyphs may stick out of a cell before the cell is
    /// considered to have clipped them.
    pub content_overflow_tolerance: f64,
    /// Cells lower than this fraction of the table's median cell height are
    /// dropped.
    pub min_height_ratio: f64,
    /// Drop cells narrower and shorter than the smallest glyph on the page.
    pub drop_subglyph_cells: bool,
}

impl Default for CellFilterSettings {
    fn default() -> Self {
        Self {
            content_overflow_tolerance: 1.0,
            min_height_ratio: 0.1,
            drop_subglyph_cells: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct TableFilterSettings {
    /// Cell dimensions closer than this count as the same size.
    pub size_tolerance: f64,
    /// Glyph tops closer than this share a text line.
    pub line_tolerance: f64,
    pub prose_char_share: f64,
    pub prose_min_lines: usize,
    /// Allowed relative deviation of each line gap from the median gap.
    pub prose_pitch_tolerance: f64,
    /// Largest median line gap, in multiples of the modal font size, that
    /// still reads as paragraph text.
    pub prose_max_line_spacing: f64,
    /// Points below the page body size that mark a cell as small text.
    pub font_size_margin: f64,
    pub max_empty_fraction: f64,
    pub single_char_cell_fraction: f64,
    pub overlap_ratio: f64,
    pub misalignment_ratio: f64,
    pub alignment_tolerance: f64,
    pub thin_row_ratio: f64,
    pub thin_col_ratio: f64,
    pub pair_gap_tolerance: f64,
    pub min_table_distance: f64,
    pub split_policy: SplitTablePolicy,
    /// Predicates that are never evaluated.
    pub disabled: Vec<TablePredicate>,
}

impl Default for TableFilterSettings {
    fn default() -> Self {
        Self {
            size_tolerance: 0.5,
            line_tolerance: 2.0,
            prose_char_share: 0.8,
            prose_min_lines: 2,
            prose_pitch_tolerance: 0.25,
            prose_max_line_spacing: 2.0,
            font_size_margin: 1.5,
            max_empty_fraction: 0.8,
            single_char_cell_fraction: 0.5,
            overlap_ratio: 2.0,
            misalignment_ratio: 3.0,
            alignment_tolerance: 1.0,
            thin_row_ratio: 0.02,
            thin_col_ratio: 0.03,
            pair_gap_tolerance: 1.0,
            min_table_distance: 5.0,
            split_policy: SplitTablePolicy::Reject,
            disabled: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct TableSettings {
    pub edges: EdgeSettings,
    pub lattice: LatticeSettings,
    pub cells: CellFilterSettings,
    pub tables: TableFilterSettings,
}

impl TableSettings {
    /// Edges built the unspecialised pdfplumber way: cluster snapping and
    /// no border suppression. Cell and table filters stay on.
    pub fn lines() -> Self {
        let mut settings = Self::default();
        settings.edges.strategy = EdgeStrategy::Lines;
        settings.edges.snap_x_tolerance = DEFAULT_SNAP_TOLERANCE;
        settings.edges.snap_y_tolerance = DEFAULT_SNAP_TOLERANCE;
        settings
    }

    /// Textbook-tuned settings (same as `Default`).
    pub fn textbook() -> Self {
        Self::default()
    }

    /// Set both snap tolerances at once.
    pub fn with_snap_tolerance(mut self, tolerance: f64) -> Self {
        self.edges.snap_x_tolerance = tolerance;
        self.edges.snap_y_tolerance = tolerance;
        self
    }

    /// Check every threshold. Called once, before any page is processed.
    pub fn validate(&self) -> Result<()> {
        let e = &self.edges;
        non_negative("snap_x_tolerance", e.snap_x_tolerance)?;
        non_negative("snap_y_tolerance", e.snap_y_tolerance)?;
        non_negative("join_x_tolerance", e.join_x_tolerance)?;
        non_negative("join_y_tolerance", e.join_y_tolerance)?;
        non_negative("collinear_tolerance", e.collinear_tolerance)?;
        non_negative("edge_min_length", e.edge_min_length)?;
        non_negative("edge_min_length_prefilter", e.edge_min_length_prefilter)?;
        in_range(
            "terminal_margin_ratio",
            e.terminal_margin_ratio,
            0.0,
            0.5,
            "a ratio in [0, 0.5]",
        )?;
        in_range(
            "max_edge_span_ratio",
            e.max_edge_span_ratio,
            0.0,
            1.0,
            "a ratio in [0, 1]",
        )?;
        for line in e.explicit_vertical_lines.iter().chain(&e.explicit_horizontal_lines) {
            let finite = match line {
                ExplicitLine::Coord(c) => c.is_finite(),
                ExplicitLine::Rect(b) => b.is_finite(),
            };
            if !finite {
                return Err(TableError::NonFinite {
                    name: "explicit_lines",
                });
            }
        }
        if e.vertical_source == EdgeSource::Explicit && e.explicit_vertical_lines.len() < 2 {
            return Err(TableError::MissingExplicitLines {
                orientation: Orientation::Vertical,
            });
        }
        if e.horizontal_source == EdgeSource::Explicit && e.explicit_horizontal_lines.len() < 2 {
            return Err(TableError::MissingExplicitLines {
                orientation: Orientation::Horizontal,
            });
        }

        let l = &self.lattice;
        non_negative("intersection_x_tolerance", l.intersection_x_tolerance)?;
        non_negative("intersection_y_tolerance", l.intersection_y_tolerance)?;
        if l.min_table_cells == 0 {
            return Err(TableError::OutOfRange {
                name: "min_table_cells",
                value: 0.0,
                expected: "at least 1",
            });
        }

        let c = &self.cells;
        non_negative("content_overflow_tolerance", c.content_overflow_tolerance)?;
        in_range(
            "min_height_ratio",
            c.min_height_ratio,
            0.0,
            1.0,
            "a ratio in [0, 1]",
        )?;

        let t = &self.tables;
        non_negative("size_tolerance", t.size_tolerance)?;
        non_negative("line_tolerance", t.line_tolerance)?;
        in_range("prose_char_share", t.prose_char_share, 0.0, 1.0, "a fraction in [0, 1]")?;
        if t.prose_min_lines < 2 {
            return Err(TableError::OutOfRange {
                name: "prose_min_lines",
                value: t.prose_min_lines as f64,
                expected: "at least 2",
            });
        }
        non_negative("prose_pitch_tolerance", t.prose_pitch_tolerance)?;
        non_negative("prose_max_line_spacing", t.prose_max_line_spacing)?;
        non_negative("font_size_margin", t.font_size_margin)?;
        in_range(
            "max_empty_fraction",
            t.max_empty_fraction,
            0.0,
            1.0,
            "a fraction in [0, 1]",
        )?;
        in_range(
            "single_char_cell_fraction",
            t.single_char_cell_fraction,
            0.0,
            1.0,
            "a fraction in [0, 1]",
        )?;
        non_negative("overlap_ratio", t.overlap_ratio)?;
        non_negative("misalignment_ratio", t.misalignment_ratio)?;
        non_negative("alignment_tolerance", t.alignment_tolerance)?;
        in_range("thin_row_ratio", t.thin_row_ratio, 0.0, 1.0, "a ratio in [0, 1]")?;
        in_range("thin_col_ratio", t.thin_col_ratio, 0.0, 1.0, "a ratio in [0, 1]")?;
        non_negative("pair_gap_tolerance", t.pair_gap_tolerance)?;
        non_negative("min_table_distance", t.min_table_distance)?;
        Ok(())
    }
}

fn non_negative(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() {
        return Err(TableError::NonFinite { name });
    }
    if value < 0.0 {
        return Err(TableError::NegativeSetting { name, value });
    }
    Ok(())
}

fn in_range(name: &'static str, value: f64, lo: f64, hi: f64, expected: &'static str) -> Result<()> {
    if !value.is_finite() {
        return Err(TableError::NonFinite { name });
    }
    if value < lo || value > hi {
        return Err(TableError::OutOfRange {
            name,
            value,
            expected,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(TableSettings::default().validate().is_ok());
        assert!(TableSettings::lines().validate().is_ok());
        assert!(TableSettings::textbook().validate().is_ok());
    }

    #[test]
    fn presets_pick_their_strategy() {
        let textbook = TableSettings::textbook();
        assert_eq!(textbook.edges.strategy, EdgeStrategy::Textbook);
        assert_eq!(textbook.edges.snap_x_tolerance, DEFAULT_GRID_SNAP_TOLERANCE);
        let lines = TableSettings::lines();
        assert_eq!(lines.edges.strategy, EdgeStrategy::Lines);
        assert_eq!(lines.edges.snap_y_tolerance, DEFAULT_SNAP_TOLERANCE);
        assert_eq!(lines.tables, textbook.tables);
    }

    #[test]
    fn negative_tolerance_is_rejected() {
        let settings = TableSettings::default().with_snap_tolerance(-1.0);
        assert_eq!(
            settings.validate(),
            Err(TableError::NegativeSetting {
                name: "snap_x_tolerance",
                value: -1.0
            })
        );
    }

    #[test]
    fn fraction_out_of_range_is_rejected() {
        let mut settings = TableSettings::default();
        settings.tables.max_empty_fraction = 1.5;
        assert!(matches!(
            settings.validate(),
            Err(TableError::OutOfRange {
                name: "max_empty_fraction",
                ..
            })
        ));
    }

    #[test]
    fn nan_threshold_is_rejected() {
        let mut settings = TableSettings::default();
        settings.cells.content_overflow_tolerance = f64::NAN;
        assert_eq!(
            settings.validate(),
            Err(TableError::NonFinite {
                name: "content_overflow_tolerance"
            })
        );
    }

    #[test]
    fn explicit_source_requires_two_lines() {
        let mut settings = TableSettings::default();
        settings.edges.vertical_source = EdgeSource::Explicit;
        settings.edges.explicit_vertical_lines = vec![ExplicitLine::Coord(10.0)];
        assert_eq!(
            settings.validate(),
            Err(TableError::MissingExplicitLines {
                orientation: Orientation::Vertical
            })
        );
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!(EdgeStrategy::from_str("lines"), Some(EdgeStrategy::Lines));
        assert_eq!(
            EdgeStrategy::from_str("textbook"),
            Some(EdgeStrategy::Textbook)
        );
        assert_eq!(EdgeStrategy::from_str("text"), None);
        assert_eq!(
            SplitTablePolicy::from_str("merge"),
            Some(SplitTablePolicy::Merge)
        );
    }
}
