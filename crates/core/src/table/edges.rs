//! Edge extraction and merging for table detection.
//!
//! Raw page primitives (rect borders, stroked lines, explicit lines) are
//! turned into edges, then reduced to a canonical [`EdgeSet`] by one of the
//! two [`EdgeStrategy`](super::settings::EdgeStrategy) mergers.

use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use super::clustering::cluster_objects;
use super::finder::EdgeMerger;
use super::settings::{EdgeSettings, EdgeSource, ExplicitLine};
use super::types::{BBox, EdgeObj, EdgeSet, KeyF64, LineObj, Orientation, Page, RectObj, key_f64};

/// `object_type` of edges built from configured explicit lines.
pub const EXPLICIT_EDGE: &str = "explicit_edge";

/// Convert a stroked line into an edge. Diagonal lines have no edge.
pub fn line_to_edge(line: &LineObj) -> Option<EdgeObj> {
    let mut edge = if line.top == line.bottom {
        EdgeObj::horizontal(line.top, line.x0, line.x1, "line")
    } else if line.x0 == line.x1 {
        EdgeObj::vertical(line.x0, line.top, line.bottom, "line")
    } else {
        return None;
    };
    edge.stroking_color = line.stroking_color;
    Some(edge)
}

/// The four borders of a rect, carrying the rect's colours.
pub fn rect_to_edges(rect: &RectObj) -> [EdgeObj; 4] {
    let b = rect.bbox();
    let mut edges = [
        EdgeObj::horizontal(b.top, b.x0, b.x1, "rect_edge"),
        EdgeObj::horizontal(b.bottom, b.x0, b.x1, "rect_edge"),
        EdgeObj::vertical(b.x0, b.top, b.bottom, "rect_edge"),
        EdgeObj::vertical(b.x1, b.top, b.bottom, "rect_edge"),
    ];
    for edge in &mut edges {
        edge.stroking_color = rect.stroking_color;
        edge.non_stroking_color = rect.non_stroking_color;
    }
    edges
}

/// Edges for explicitly configured lines of one orientation.
///
/// A coordinate spans the whole page; a box contributes its two borders of
/// the requested orientation.
pub fn explicit_edges(
    lines: &[ExplicitLine],
    orientation: Orientation,
    page_bbox: BBox,
) -> Vec<EdgeObj> {
    let mut edges = Vec::new();
    for line in lines {
        match (line, orientation) {
            (ExplicitLine::Coord(y), Orientation::Horizontal) => edges.push(EdgeObj::horizontal(
                *y,
                page_bbox.x0,
                page_bbox.x1,
                EXPLICIT_EDGE,
            )),
            (ExplicitLine::Coord(x), Orientation::Vertical) => edges.push(EdgeObj::vertical(
                *x,
                page_bbox.top,
                page_bbox.bottom,
                EXPLICIT_EDGE,
            )),
            (ExplicitLine::Rect(b), Orientation::Horizontal) => {
                edges.push(EdgeObj::horizontal(b.top, b.x0, b.x1, EXPLICIT_EDGE));
                edges.push(EdgeObj::horizontal(b.bottom, b.x0, b.x1, EXPLICIT_EDGE));
            }
            (ExplicitLine::Rect(b), Orientation::Vertical) => {
                edges.push(EdgeObj::vertical(b.x0, b.top, b.bottom, EXPLICIT_EDGE));
                edges.push(EdgeObj::vertical(b.x1, b.top, b.bottom, EXPLICIT_EDGE));
            }
        }
    }
    edges
}

fn source_edges(page: &Page, source: EdgeSource) -> Vec<EdgeObj> {
    let from_lines = page.lines.iter().filter_map(line_to_edge);
    match source {
        EdgeSource::Lines => page
            .rects
            .iter()
            .flat_map(rect_to_edges)
            .chain(from_lines)
            .collect(),
        EdgeSource::LinesStrict => from_lines.collect(),
        EdgeSource::Explicit => Vec::new(),
    }
}

/// Gather the raw edges of a page according to the per-orientation sources,
/// then drop anything shorter than `edge_min_length_prefilter`.
pub fn collect_page_edges(page: &Page, settings: &EdgeSettings) -> Vec<EdgeObj> {
    let mut v_edges = filter_edges(
        source_edges(page, settings.vertical_source),
        Some(Orientation::Vertical),
        0.0,
    );
    v_edges.extend(explicit_edges(
        &settings.explicit_vertical_lines,
        Orientation::Vertical,
        page.page_bbox,
    ));

    let mut h_edges = filter_edges(
        source_edges(page, settings.horizontal_source),
        Some(Orientation::Horizontal),
        0.0,
    );
    h_edges.extend(explicit_edges(
        &settings.explicit_horizontal_lines,
        Orientation::Horizontal,
        page.page_bbox,
    ));

    let mut edges = v_edges;
    edges.extend(h_edges);
    filter_edges(edges, None, settings.edge_min_length_prefilter)
}

/// Snap edges to the average position of their cluster.
pub fn snap_edges(edges: &[EdgeObj], x_tolerance: f64, y_tolerance: f64) -> Vec<EdgeObj> {
    let mut v_edges: Vec<EdgeObj> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Vertical)
        .cloned()
        .collect();
    let mut h_edges: Vec<EdgeObj> = edges
        .iter()
        .filter(|e| e.orientation == Orientation::Horizontal)
        .cloned()
        .collect();

    for (group, tolerance) in [(&mut v_edges, x_tolerance), (&mut h_edges, y_tolerance)] {
        if tolerance <= 0.0 {
            continue;
        }
        let clusters = cluster_objects(group.as_slice(), EdgeObj::fixed, tolerance);
        let mut snapped: Vec<EdgeObj> = Vec::with_capacity(group.len());
        for cluster in clusters {
            let avg = cluster.iter().map(EdgeObj::fixed).sum::<f64>() / (cluster.len() as f64);
            for mut e in cluster {
                e.set_fixed(avg);
                snapped.push(e);
            }
        }
        *group = snapped;
    }

    v_edges.extend(h_edges);
    v_edges
}

/// Join collinear edges whose extents overlap or sit within `tolerance`.
///
/// The joined edge keeps the fixed coordinate and colours of whichever
/// member starts first along the edge axis.
pub fn join_edge_group(edges: &[EdgeObj], tolerance: f64) -> Vec<EdgeObj> {
    let mut sorted = edges.to_vec();
    sorted.sort_by(|a, b| {
        a.span()
            .0
            .partial_cmp(&b.span().0)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut joined: Vec<EdgeObj> = Vec::new();
    for e in sorted {
        let (e_min, e_max) = e.span();
        match joined.last_mut() {
            Some(last) if e_min <= last.span().1 + tolerance => {
                let (last_min, last_max) = last.span();
                if e_max > last_max {
                    last.set_span(last_min, e_max);
                }
            }
            _ => joined.push(e),
        }
    }
    joined
}

/// Snap, then join edges that share an exact fixed coordinate.
pub fn merge_edges(
    edges: Vec<EdgeObj>,
    snap_x_tolerance: f64,
    snap_y_tolerance: f64,
    join_x_tolerance: f64,
    join_y_tolerance: f64,
) -> Vec<EdgeObj> {
    let mut edges = edges;
    if snap_x_tolerance > 0.0 || snap_y_tolerance > 0.0 {
        edges = snap_edges(&edges, snap_x_tolerance, snap_y_tolerance);
    }

    let mut grouped: BTreeMap<(Orientation, KeyF64), Vec<EdgeObj>> = BTreeMap::new();
    for e in edges {
        grouped
            .entry((e.orientation, key_f64(e.fixed())))
            .or_default()
            .push(e);
    }

    let mut merged: Vec<EdgeObj> = Vec::new();
    for ((orientation, _), group) in grouped {
        let tol = match orientation {
            Orientation::Horizontal => join_x_tolerance,
            Orientation::Vertical => join_y_tolerance,
        };
        merged.extend(join_edge_group(&group, tol));
    }
    merged
}

/// Join collinear segments into their union before any snapping.
///
/// Edges are clustered by fixed coordinate within `collinear_tolerance`.
/// Inside a cluster, segments whose extents touch or overlap (allowing the
/// join tolerance as a gap) become one edge. A merged edge keeps the fixed
/// coordinate and colours of its first member in input order.
pub fn merge_collinear(
    edges: &[EdgeObj],
    collinear_tolerance: f64,
    join_x_tolerance: f64,
    join_y_tolerance: f64,
) -> Vec<EdgeObj> {
    let mut merged = Vec::with_capacity(edges.len());
    for orientation in [Orientation::Horizontal, Orientation::Vertical] {
        let indexed: Vec<(usize, &EdgeObj)> = edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.orientation == orientation)
            .collect();
        let join_tol = match orientation {
            Orientation::Horizontal => join_x_tolerance,
            Orientation::Vertical => join_y_tolerance,
        };

        for mut cluster in cluster_objects(&indexed, |(_, e)| e.fixed(), collinear_tolerance) {
            // Stable: equal starts keep input order.
            cluster.sort_by(|(_, a), (_, b)| {
                a.span()
                    .0
                    .partial_cmp(&b.span().0)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut runs: Vec<(usize, EdgeObj, f64, f64)> = Vec::new();
            for (idx, e) in cluster {
                let (start, end) = e.span();
                match runs.last_mut() {
                    Some((first_idx, first, _, run_end)) if start <= *run_end + join_tol => {
                        *run_end = run_end.max(end);
                        if idx < *first_idx {
                            *first_idx = idx;
                            *first = e.clone();
                        }
                    }
                    _ => runs.push((idx, e.clone(), start, end)),
                }
            }

            // Each run's start is the start of its first sorted member.
            for (_, mut edge, start, end) in runs {
                edge.set_span(start, end);
                merged.push(edge);
            }
        }
    }
    merged
}

/// Round each fixed coordinate to a multiple of the snap step and collapse
/// exact duplicates, keeping the first.
///
/// A step of zero leaves that orientation unsnapped.
pub fn snap_to_grid(edges: Vec<EdgeObj>, x_step: f64, y_step: f64) -> Vec<EdgeObj> {
    let mut seen: BTreeSet<(Orientation, KeyF64, KeyF64, KeyF64)> = BTreeSet::new();
    let mut out = Vec::with_capacity(edges.len());
    for mut e in edges {
        let step = match e.orientation {
            Orientation::Horizontal => y_step,
            Orientation::Vertical => x_step,
        };
        if step > 0.0 {
            e.set_fixed((e.fixed() / step).round() * step);
        }
        let (start, end) = e.span();
        if seen.insert((e.orientation, key_f64(e.fixed()), key_f64(start), key_f64(end))) {
            out.push(e);
        }
    }
    out
}

/// Drop edges that reach into the page margin band.
///
/// The band is `ratio` of the page width on the left and right, and `ratio`
/// of the page height at the top and bottom. Explicit edges are kept: a
/// configured coordinate always spans the page.
pub fn suppress_terminal_edges(edges: Vec<EdgeObj>, page_bbox: BBox, ratio: f64) -> Vec<EdgeObj> {
    let dx = page_bbox.width() * ratio;
    let dy = page_bbox.height() * ratio;
    edges
        .into_iter()
        .filter(|e| {
            e.object_type == EXPLICIT_EDGE
                || !(e.x0 <= page_bbox.x0 + dx
                    || e.x1 >= page_bbox.x1 - dx
                    || e.top <= page_bbox.top + dy
                    || e.bottom >= page_bbox.bottom - dy)
        })
        .collect()
}

/// Drop rules that span nearly the whole page along their own axis.
/// Explicit edges are kept.
pub fn suppress_long_edges(edges: Vec<EdgeObj>, page_bbox: BBox, ratio: f64) -> Vec<EdgeObj> {
    let max_width = page_bbox.width() * ratio;
    let max_height = page_bbox.height() * ratio;
    edges
        .into_iter()
        .filter(|e| {
            e.object_type == EXPLICIT_EDGE
                || match e.orientation {
                    Orientation::Horizontal => e.width() <= max_width,
                    Orientation::Vertical => e.height() <= max_height,
                }
        })
        .collect()
}

/// Drop edges whose stroking and fill colours are the same.
pub fn drop_colorless_edges(edges: Vec<EdgeObj>) -> Vec<EdgeObj> {
    edges
        .into_iter()
        .filter(|e| e.stroking_color != e.non_stroking_color)
        .collect()
}

/// Filter edges by orientation and minimum length.
pub fn filter_edges(
    edges: Vec<EdgeObj>,
    orientation: Option<Orientation>,
    min_length: f64,
) -> Vec<EdgeObj> {
    edges
        .into_iter()
        .filter(|e| orientation.is_none_or(|o| e.orientation == o) && e.length() >= min_length)
        .collect()
}

/// pdfplumber's merger: cluster snapping and joining, no suppression.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinesEdgeMerger;

impl EdgeMerger for LinesEdgeMerger {
    fn merge(&self, page: &Page, settings: &EdgeSettings) -> EdgeSet {
        let raw = collect_page_edges(page, settings);
        trace!(edges = raw.len(), "collected raw edges");
        let merged = merge_edges(
            raw,
            settings.snap_x_tolerance,
            settings.snap_y_tolerance,
            settings.join_x_tolerance,
            settings.join_y_tolerance,
        );
        let edges = filter_edges(merged, None, settings.edge_min_length);
        trace!(edges = edges.len(), "merged edges");
        EdgeSet::from_edges(edges)
    }
}

/// Merger tuned for textbook pages: merge, snap to a fine grid, then drop
/// page borders and full-width rules.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextbookEdgeMerger;

impl EdgeMerger for TextbookEdgeMerger {
    fn merge(&self, page: &Page, settings: &EdgeSettings) -> EdgeSet {
        let raw = collect_page_edges(page, settings);
        trace!(edges = raw.len(), "collected raw edges");

        let merged = merge_collinear(
            &raw,
            settings.collinear_tolerance,
            settings.join_x_tolerance,
            settings.join_y_tolerance,
        );
        let snapped = snap_to_grid(merged, settings.snap_x_tolerance, settings.snap_y_tolerance);
        trace!(edges = snapped.len(), "merged and snapped edges");

        let inner = suppress_terminal_edges(snapped, page.page_bbox, settings.terminal_margin_ratio);
        let inner = suppress_long_edges(inner, page.page_bbox, settings.max_edge_span_ratio);
        let mut edges = filter_edges(inner, None, settings.edge_min_length);
        if settings.drop_colorless_edges {
            edges = drop_colorless_edges(edges);
        }
        trace!(edges = edges.len(), "edges after border suppression");
        EdgeSet::from_edges(edges)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::types::ColorId;

    fn page() -> Page {
        Page::new(BBox::new(0.0, 0.0, 600.0, 800.0))
    }

    #[test]
    fn diagonal_lines_have_no_edge() {
        assert!(line_to_edge(&LineObj::new((0.0, 0.0), (10.0, 10.0))).is_none());
        let h = line_to_edge(&LineObj::new((10.0, 5.0), (0.0, 5.0))).unwrap();
        assert_eq!(h.orientation, Orientation::Horizontal);
        assert_eq!(h.span(), (0.0, 10.0));
        let v = line_to_edge(&LineObj::new((3.0, 0.0), (3.0, 9.0))).unwrap();
        assert_eq!(v.orientation, Orientation::Vertical);
    }

    #[test]
    fn rect_edges_carry_colors() {
        let rect = RectObj::new(BBox::new(10.0, 20.0, 30.0, 50.0))
            .with_colors(Some(ColorId(1)), Some(ColorId(2)));
        let edges = rect_to_edges(&rect);
        assert_eq!(edges[0].fixed(), 20.0);
        assert_eq!(edges[1].fixed(), 50.0);
        assert_eq!(edges[2].fixed(), 10.0);
        assert_eq!(edges[3].fixed(), 30.0);
        assert!(edges.iter().all(|e| e.non_stroking_color == Some(ColorId(2))));
    }

    #[test]
    fn merge_collinear_keeps_first_seen_coordinate() {
        let edges = vec![
            EdgeObj::horizontal(100.4, 50.0, 80.0, "line"),
            EdgeObj::horizontal(100.0, 10.0, 50.0, "line"),
            EdgeObj::horizontal(100.2, 82.0, 120.0, "line"),
        ];
        let merged = merge_collinear(&edges, 1.0, 3.0, 3.0);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].fixed(), 100.4);
        assert_eq!(merged[0].span(), (10.0, 120.0));
    }

    #[test]
    fn merge_collinear_leaves_distant_segments_apart() {
        let edges = vec![
            EdgeObj::vertical(10.0, 0.0, 20.0, "line"),
            EdgeObj::vertical(10.0, 30.0, 50.0, "line"),
            EdgeObj::vertical(15.0, 0.0, 20.0, "line"),
        ];
        let merged = merge_collinear(&edges, 1.0, 3.0, 3.0);
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn grid_snap_collapses_duplicates() {
        let edges = vec![
            EdgeObj::horizontal(10.004, 0.0, 50.0, "a"),
            EdgeObj::horizontal(9.998, 0.0, 50.0, "b"),
            EdgeObj::horizontal(10.5, 0.0, 50.0, "c"),
        ];
        let snapped = snap_to_grid(edges, 0.01, 0.01);
        assert_eq!(snapped.len(), 2);
        assert_eq!(snapped[0].object_type, "a");
        assert!((snapped[0].fixed() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn page_border_edges_are_suppressed() {
        let page = page();
        let border: Vec<EdgeObj> = rect_to_edges(&RectObj::new(page.page_bbox)).to_vec();
        assert!(suppress_terminal_edges(border, page.page_bbox, 0.0).is_empty());

        let inner = vec![EdgeObj::horizontal(400.0, 100.0, 500.0, "line")];
        assert_eq!(suppress_terminal_edges(inner, page.page_bbox, 0.03).len(), 1);
    }

    #[test]
    fn full_span_rules_are_suppressed() {
        let page = page();
        let edges = vec![
            EdgeObj::horizontal(400.0, 5.0, 595.0, "line"),
            EdgeObj::horizontal(420.0, 100.0, 500.0, "line"),
        ];
        let kept = suppress_long_edges(edges, page.page_bbox, 0.95);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].fixed(), 420.0);
    }

    #[test]
    fn lines_merger_joins_touching_segments() {
        let mut page = page();
        page.add_line(LineObj::new((100.0, 200.0), (200.0, 200.0)));
        page.add_line(LineObj::new((201.0, 201.0), (300.0, 201.0)));
        let settings = crate::table::TableSettings::lines().edges;
        let set = LinesEdgeMerger.merge(&page, &settings);
        assert_eq!(set.horizontal.len(), 1);
        assert_eq!(set.horizontal[0].fixed(), 200.5);
        assert_eq!(set.horizontal[0].span(), (100.0, 300.0));
    }

    #[test]
    fn textbook_merger_is_deterministic() {
        let mut page = page();
        for i in 0..4 {
            let y = 100.0 + f64::from(i) * 20.0;
            page.add_rect(RectObj::new(BBox::new(100.0, y, 300.0, y + 20.0)));
        }
        let settings = EdgeSettings::default();
        let a = TextbookEdgeMerger.merge(&page, &settings);
        let b = TextbookEdgeMerger.merge(&page, &settings);
        assert_eq!(a, b);
        assert_eq!(a.horizontal.len(), 5);
        assert_eq!(a.vertical.len(), 2);
    }

    #[test]
    fn explicit_page_spanning_lines_survive_border_suppression() {
        let mut page = page();
        page.add_line(LineObj::new((100.0, 100.0), (340.0, 100.0)));
        page.add_line(LineObj::new((100.0, 120.0), (340.0, 120.0)));
        let settings = EdgeSettings {
            vertical_source: EdgeSource::Explicit,
            explicit_vertical_lines: vec![
                ExplicitLine::Coord(100.0),
                ExplicitLine::Coord(220.0),
                ExplicitLine::Coord(340.0),
            ],
            explicit_horizontal_lines: vec![ExplicitLine::Coord(5.0)],
            ..EdgeSettings::default()
        };

        let set = TextbookEdgeMerger.merge(&page, &settings);
        assert_eq!(set.vertical.len(), 3);
        assert!(set.vertical.iter().all(|e| e.span() == (0.0, 800.0)));
        // The page-spanning explicit rule stays next to the two stroked lines.
        assert_eq!(set.horizontal.len(), 3);

        let border = rect_to_edges(&RectObj::new(page.page_bbox)).to_vec();
        assert!(suppress_long_edges(border, page.page_bbox, 0.95).is_empty());
    }

    #[test]
    fn colorless_edges_are_dropped_on_request() {
        let mut page = page();
        page.add_rect(
            RectObj::new(BBox::new(100.0, 100.0, 200.0, 200.0))
                .with_colors(Some(ColorId(3)), Some(ColorId(3))),
        );
        let mut settings = EdgeSettings::default();
        assert_eq!(TextbookEdgeMerger.merge(&page, &settings).len(), 4);
        settings.drop_colorless_edges = true;
        assert!(TextbookEdgeMerger.merge(&page, &settings).is_empty());
    }
}
