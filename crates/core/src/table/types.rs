//! Table primitives: page objects, edges, cells and tables.
//!
//! All coordinates use a top-left origin (`top < bottom`, `x0 < x1`).

use ordered_float::OrderedFloat;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// Key types for ordered float maps
pub(crate) type KeyF64 = OrderedFloat<f64>;
pub(crate) type KeyPoint = (KeyF64, KeyF64);

pub(crate) fn key_f64(v: f64) -> KeyF64 {
    OrderedFloat(v)
}

pub(crate) const fn key_point(x: f64, y: f64) -> KeyPoint {
    (OrderedFloat(x), OrderedFloat(y))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Orientation {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BBox {
    pub const fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// Smallest box covering both.
    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            top: self.top.min(other.top),
            x1: self.x1.max(other.x1),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// True when `other` lies inside `self`, allowing `tol` slack on every side.
    pub fn contains(&self, other: &BBox, tol: f64) -> bool {
        other.x0 >= self.x0 - tol
            && other.top >= self.top - tol
            && other.x1 <= self.x1 + tol
            && other.bottom <= self.bottom + tol
    }

    /// Euclidean gap between two boxes; zero when they touch or overlap.
    pub fn distance(&self, other: &BBox) -> f64 {
        let dx = (other.x0 - self.x1).max(self.x0 - other.x1).max(0.0);
        let dy = (other.top - self.bottom).max(self.top - other.bottom).max(0.0);
        dx.hypot(dy)
    }

    /// True when the horizontal extents share a stretch of positive length.
    pub fn overlaps_x(&self, other: &BBox) -> bool {
        self.x0.max(other.x0) < self.x1.min(other.x1)
    }

    /// True when the vertical extents share a stretch of positive length.
    pub fn overlaps_y(&self, other: &BBox) -> bool {
        self.top.max(other.top) < self.bottom.min(other.bottom)
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.x0.is_finite() && self.top.is_finite() && self.x1.is_finite() && self.bottom.is_finite()
    }
}

/// A single positioned glyph.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CharObj {
    pub text: String,
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
    /// Font size in points.
    pub size: f64,
}

impl CharObj {
    pub fn new(text: &str, bbox: BBox, size: f64) -> Self {
        Self {
            text: text.to_string(),
            x0: bbox.x0,
            top: bbox.top,
            x1: bbox.x1,
            bottom: bbox.bottom,
            size,
        }
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(self.x0, self.top, self.x1, self.bottom)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub(crate) fn h_mid(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    pub(crate) fn v_mid(&self) -> f64 {
        (self.top + self.bottom) / 2.0
    }

    /// Whitespace glyphs carry no content for the table heuristics.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Opaque colour identifier assigned by the page parser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ColorId(pub u32);

/// A drawn rectangle: a decorative box, a cell fill, or a border segment.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RectObj {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub stroking_color: Option<ColorId>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub non_stroking_color: Option<ColorId>,
}

impl RectObj {
    pub fn new(bbox: BBox) -> Self {
        Self {
            x0: bbox.x0,
            top: bbox.top,
            x1: bbox.x1,
            bottom: bbox.bottom,
            stroking_color: None,
            non_stroking_color: None,
        }
    }

    pub fn with_colors(mut self, stroking: Option<ColorId>, non_stroking: Option<ColorId>) -> Self {
        self.stroking_color = stroking;
        self.non_stroking_color = non_stroking;
        self
    }

    pub fn bbox(&self) -> BBox {
        BBox::new(self.x0, self.top, self.x1, self.bottom)
    }
}

/// A straight stroked segment.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineObj {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub stroking_color: Option<ColorId>,
}

impl LineObj {
    /// Build a line from its two end points, normalising to a bbox.
    pub fn new(p0: (f64, f64), p1: (f64, f64)) -> Self {
        Self {
            x0: p0.0.min(p1.0),
            top: p0.1.min(p1.1),
            x1: p0.0.max(p1.0),
            bottom: p0.1.max(p1.1),
            stroking_color: None,
        }
    }
}

/// An already-parsed page.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Page {
    pub page_bbox: BBox,
    #[cfg_attr(feature = "serde", serde(default))]
    pub chars: Vec<CharObj>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rects: Vec<RectObj>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lines: Vec<LineObj>,
}

impl Page {
    pub fn new(page_bbox: BBox) -> Self {
        Self {
            page_bbox,
            chars: Vec::new(),
            rects: Vec::new(),
            lines: Vec::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.page_bbox.width()
    }

    pub fn height(&self) -> f64 {
        self.page_bbox.height()
    }

    pub fn add_char(&mut self, ch: CharObj) -> CharId {
        self.chars.push(ch);
        CharId(self.chars.len() - 1)
    }

    pub fn add_rect(&mut self, rect: RectObj) -> RectId {
        self.rects.push(rect);
        RectId(self.rects.len() - 1)
    }

    pub fn add_line(&mut self, line: LineObj) {
        self.lines.push(line);
    }

    pub fn char(&self, id: CharId) -> &CharObj {
        &self.chars[id.0]
    }

    pub fn rect(&self, id: RectId) -> &RectObj {
        &self.rects[id.0]
    }
}

/// An oriented segment used to build the cell lattice.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeObj {
    pub x0: f64,
    pub x1: f64,
    pub top: f64,
    pub bottom: f64,
    pub orientation: Orientation,
    pub object_type: &'static str,
    pub stroking_color: Option<ColorId>,
    pub non_stroking_color: Option<ColorId>,
}

impl EdgeObj {
    pub fn horizontal(y: f64, x0: f64, x1: f64, object_type: &'static str) -> Self {
        Self {
            x0,
            x1,
            top: y,
            bottom: y,
            orientation: Orientation::Horizontal,
            object_type,
            stroking_color: None,
            non_stroking_color: None,
        }
    }

    pub fn vertical(x: f64, top: f64, bottom: f64, object_type: &'static str) -> Self {
        Self {
            x0: x,
            x1: x,
            top,
            bottom,
            orientation: Orientation::Vertical,
            object_type,
            stroking_color: None,
            non_stroking_color: None,
        }
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Length along the edge's own axis.
    pub fn length(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => self.width(),
            Orientation::Vertical => self.height(),
        }
    }

    /// The perpendicular coordinate that stays constant along the edge.
    pub fn fixed(&self) -> f64 {
        match self.orientation {
            Orientation::Horizontal => self.top,
            Orientation::Vertical => self.x0,
        }
    }

    /// Start and end along the edge's own axis.
    pub fn span(&self) -> (f64, f64) {
        match self.orientation {
            Orientation::Horizontal => (self.x0, self.x1),
            Orientation::Vertical => (self.top, self.bottom),
        }
    }

    pub(crate) fn set_fixed(&mut self, value: f64) {
        match self.orientation {
            Orientation::Horizontal => {
                self.top = value;
                self.bottom = value;
            }
            Orientation::Vertical => {
                self.x0 = value;
                self.x1 = value;
            }
        }
    }

    pub(crate) fn set_span(&mut self, start: f64, end: f64) {
        match self.orientation {
            Orientation::Horizontal => {
                self.x0 = start;
                self.x1 = end;
            }
            Orientation::Vertical => {
                self.top = start;
                self.bottom = end;
            }
        }
    }

    pub(crate) fn bbox(&self) -> BBox {
        BBox::new(self.x0, self.top, self.x1, self.bottom)
    }
}

/// Canonical edges of one page, partitioned by orientation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeSet {
    pub horizontal: Vec<EdgeObj>,
    pub vertical: Vec<EdgeObj>,
}

impl EdgeSet {
    pub fn from_edges(edges: impl IntoIterator<Item = EdgeObj>) -> Self {
        let mut set = Self::default();
        for edge in edges {
            match edge.orientation {
                Orientation::Horizontal => set.horizontal.push(edge),
                Orientation::Vertical => set.vertical.push(edge),
            }
        }
        set
    }

    pub fn len(&self) -> usize {
        self.horizontal.len() + self.vertical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A lattice needs at least two edges in each direction.
    pub fn can_form_lattice(&self) -> bool {
        self.horizontal.len() >= 2 && self.vertical.len() >= 2
    }

    pub fn iter(&self) -> impl Iterator<Item = &EdgeObj> {
        self.horizontal.iter().chain(self.vertical.iter())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct CharId(pub usize);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct RectId(pub usize);

/// Position of a candidate in the lattice builder's output.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct TableId(pub usize);

/// A rectangular region of a table. Chars are referenced by index into
/// [`Page::chars`].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cell {
    pub bbox: BBox,
    pub chars: Vec<CharId>,
}

impl Cell {
    pub fn new(bbox: BBox) -> Self {
        Self {
            bbox,
            chars: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.chars.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Table {
    pub id: TableId,
    /// Fixed when the candidate is built; cell removal never shrinks it.
    pub bbox: BBox,
    pub cells: Vec<Cell>,
    /// Page rects that lie within, coincide with, or contain the table bbox.
    pub rects: Vec<RectId>,
}

impl Table {
    /// Build a table whose bbox covers `cells`.
    pub fn new(id: TableId, cells: Vec<Cell>) -> Self {
        let bbox = cells_bbox(&cells);
        Self {
            id,
            bbox,
            cells,
            rects: Vec::new(),
        }
    }

    /// Number of distinct `(top, bottom)` pairs among the cells.
    pub fn row_bands(&self) -> usize {
        let mut bands: Vec<(KeyF64, KeyF64)> = self
            .cells
            .iter()
            .map(|c| (key_f64(c.bbox.top), key_f64(c.bbox.bottom)))
            .collect();
        bands.sort();
        bands.dedup();
        bands.len()
    }

    /// Number of distinct `(x0, x1)` pairs among the cells.
    pub fn col_bands(&self) -> usize {
        let mut bands: Vec<(KeyF64, KeyF64)> = self
            .cells
            .iter()
            .map(|c| (key_f64(c.bbox.x0), key_f64(c.bbox.x1)))
            .collect();
        bands.sort();
        bands.dedup();
        bands.len()
    }

    pub fn text_cell_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.is_empty()).count()
    }

    pub fn empty_cell_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_empty()).count()
    }

    pub fn char_ids(&self) -> impl Iterator<Item = CharId> + '_ {
        self.cells.iter().flat_map(|c| c.chars.iter().copied())
    }
}

fn cells_bbox(cells: &[Cell]) -> BBox {
    let mut x0 = f64::INFINITY;
    let mut top = f64::INFINITY;
    let mut x1 = f64::NEG_INFINITY;
    let mut bottom = f64::NEG_INFINITY;
    for c in cells {
        x0 = x0.min(c.bbox.x0);
        top = top.min(c.bbox.top);
        x1 = x1.max(c.bbox.x1);
        bottom = bottom.max(c.bbox.bottom);
    }
    BBox {
        x0,
        top,
        x1,
        bottom,
    }
}

// Internal ID types for efficient indexing
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub(crate) struct VEdgeId(pub usize);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub(crate) struct HEdgeId(pub usize);
