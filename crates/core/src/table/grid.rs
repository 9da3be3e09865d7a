//! Lattice construction: intersections to cells, cells to tables, and the
//! assignment of page glyphs and rects to the resulting tables.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use tracing::trace;

use super::finder::LatticeBuilder;
use super::intersections::{EdgeStore, IntersectionIdx, edges_to_intersections};
use super::settings::LatticeSettings;
use super::types::{
    BBox, Cell, CharId, CharObj, EdgeSet, KeyPoint, Page, RectId, RectObj, Table, TableId,
    key_point,
};

fn sorted_lists_intersect<T: Ord>(a: &[T], b: &[T]) -> bool {
    let (mut i, mut j) = (0usize, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Equal => return true,
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
        }
    }
    false
}

/// Build the smallest cell anchored at each intersection.
///
/// A cell needs its four corners to be intersections, with each pair of
/// adjacent corners joined by a common edge.
pub(crate) fn intersections_to_cells(intersections: &HashMap<KeyPoint, IntersectionIdx>) -> Vec<BBox> {
    let mut points: Vec<KeyPoint> = intersections.keys().copied().collect();
    points.sort();
    let point_index: HashMap<KeyPoint, usize> =
        points.iter().enumerate().map(|(idx, p)| (*p, idx)).collect();
    let info: Vec<&IntersectionIdx> = points.iter().map(|p| &intersections[p]).collect();

    // For each edge, the points it passes through, ordered along the edge.
    let mut v_points: HashMap<_, Vec<usize>> = HashMap::new();
    let mut h_points: HashMap<_, Vec<usize>> = HashMap::new();
    for (pid, idx) in info.iter().enumerate() {
        for id in &idx.v {
            v_points.entry(*id).or_default().push(pid);
        }
        for id in &idx.h {
            h_points.entry(*id).or_default().push(pid);
        }
    }
    for pids in v_points.values_mut() {
        pids.sort_by_key(|pid| points[*pid].1);
    }
    for pids in h_points.values_mut() {
        pids.sort_by_key(|pid| points[*pid].0);
    }

    let connects = |p1: usize, p2: usize| -> bool {
        if points[p1].0 == points[p2].0 {
            sorted_lists_intersect(&info[p1].v, &info[p2].v)
        } else if points[p1].1 == points[p2].1 {
            sorted_lists_intersect(&info[p1].h, &info[p2].h)
        } else {
            false
        }
    };

    let mut cells = Vec::new();
    for (pid, point) in points.iter().enumerate() {
        let (px, py) = *point;
        let mut below: Vec<usize> = Vec::new();
        for id in &info[pid].v {
            if let Some(pids) = v_points.get(id) {
                below.extend(pids.iter().copied().filter(|p| points[*p].1 > py));
            }
        }
        below.sort_by_key(|p| points[*p].1);
        below.dedup();

        let mut right: Vec<usize> = Vec::new();
        for id in &info[pid].h {
            if let Some(pids) = h_points.get(id) {
                right.extend(pids.iter().copied().filter(|p| points[*p].0 > px));
            }
        }
        right.sort_by_key(|p| points[*p].0);
        right.dedup();

        'below: for &b in &below {
            if !connects(pid, b) {
                continue;
            }
            for &r in &right {
                if !connects(pid, r) {
                    continue;
                }
                let corner = (points[r].0, points[b].1);
                if let Some(&br) = point_index.get(&corner)
                    && connects(br, r)
                    && connects(br, b)
                {
                    cells.push(BBox::new(
                        px.into_inner(),
                        py.into_inner(),
                        points[r].0.into_inner(),
                        points[b].1.into_inner(),
                    ));
                    break 'below;
                }
            }
        }
    }
    cells
}

fn row_major(a: &BBox, b: &BBox) -> Ordering {
    a.top
        .partial_cmp(&b.top)
        .unwrap_or(Ordering::Equal)
        .then(a.x0.partial_cmp(&b.x0).unwrap_or(Ordering::Equal))
}

/// Group cells that share a corner into tables.
///
/// Tables come out top-to-bottom then left-to-right, each with its cells in
/// row-major order. Groups smaller than `min_cells` are dropped.
pub fn cells_to_tables(cells: Vec<BBox>, min_cells: usize) -> Vec<Vec<BBox>> {
    const fn corners(b: &BBox) -> [KeyPoint; 4] {
        [
            key_point(b.x0, b.top),
            key_point(b.x0, b.bottom),
            key_point(b.x1, b.top),
            key_point(b.x1, b.bottom),
        ]
    }

    let mut corner_map: HashMap<KeyPoint, Vec<usize>> = HashMap::new();
    for (idx, cell) in cells.iter().enumerate() {
        for corner in corners(cell) {
            corner_map.entry(corner).or_default().push(idx);
        }
    }

    let mut visited = vec![false; cells.len()];
    let mut tables: Vec<Vec<BBox>> = Vec::new();
    let mut queue: VecDeque<usize> = VecDeque::new();
    for start in 0..cells.len() {
        if visited[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);
        let mut group = Vec::new();
        while let Some(idx) = queue.pop_front() {
            group.push(cells[idx]);
            for corner in corners(&cells[idx]) {
                for &neighbor in corner_map.get(&corner).into_iter().flatten() {
                    if !visited[neighbor] {
                        visited[neighbor] = true;
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        group.sort_by(row_major);
        tables.push(group);
    }

    // Groups are non-empty and sorted, so the first cell is the top-left one.
    tables.sort_by(|a, b| row_major(&a[0], &b[0]));
    tables.retain(|t| t.len() >= min_cells);
    tables
}

/// Assign each glyph to every cell whose half-open box `[x0, x1) x [top,
/// bottom)` holds the glyph centre.
///
/// Sweeps the glyphs by vertical midpoint while cells enter and leave an
/// active set. Char ids in each cell come out ascending.
pub fn assign_chars(cells: &[BBox], chars: &[CharObj]) -> Vec<Vec<CharId>> {
    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum EventKind {
        Add,
        Remove,
    }

    struct Event {
        y: f64,
        kind: EventKind,
        cell: usize,
    }

    let mut events: Vec<Event> = Vec::with_capacity(cells.len() * 2);
    for (cell, bbox) in cells.iter().enumerate() {
        events.push(Event {
            y: bbox.top,
            kind: EventKind::Add,
            cell,
        });
        events.push(Event {
            y: bbox.bottom,
            kind: EventKind::Remove,
            cell,
        });
    }
    events.sort_by(|a, b| {
        a.y.partial_cmp(&b.y)
            .unwrap_or(Ordering::Equal)
            .then(a.kind.cmp(&b.kind))
            .then(a.cell.cmp(&b.cell))
    });

    let mut order: Vec<(usize, f64)> = chars.iter().map(CharObj::v_mid).enumerate().collect();
    order.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    let mut assigned: Vec<Vec<CharId>> = vec![Vec::new(); cells.len()];
    let mut active: Vec<usize> = Vec::new();
    let mut next_event = 0usize;
    for (char_idx, v_mid) in order {
        while let Some(event) = events.get(next_event) {
            if event.y > v_mid {
                break;
            }
            match event.kind {
                EventKind::Add => active.push(event.cell),
                EventKind::Remove => {
                    if let Some(pos) = active.iter().position(|&c| c == event.cell) {
                        active.swap_remove(pos);
                    }
                }
            }
            next_event += 1;
        }

        let ch = &chars[char_idx];
        for &cell in &active {
            if char_in_bbox(ch, &cells[cell]) {
                assigned[cell].push(CharId(char_idx));
            }
        }
    }

    for ids in &mut assigned {
        ids.sort_unstable();
    }
    assigned
}

/// Check if a character's center is inside a bounding box.
pub(crate) fn char_in_bbox(c: &CharObj, bbox: &BBox) -> bool {
    let h_mid = c.h_mid();
    let v_mid = c.v_mid();
    h_mid >= bbox.x0 && h_mid < bbox.x1 && v_mid >= bbox.top && v_mid < bbox.bottom
}

/// Rects that lie within, coincide with, or contain `bbox`.
pub fn associated_rects(rects: &[RectObj], bbox: &BBox, x_tol: f64, y_tol: f64) -> Vec<RectId> {
    let within = |outer: &BBox, inner: &BBox| {
        inner.x0 >= outer.x0 - x_tol
            && inner.x1 <= outer.x1 + x_tol
            && inner.top >= outer.top - y_tol
            && inner.bottom <= outer.bottom + y_tol
    };
    rects
        .iter()
        .enumerate()
        .filter(|(_, rect)| {
            let r = rect.bbox();
            within(bbox, &r) || within(&r, bbox)
        })
        .map(|(idx, _)| RectId(idx))
        .collect()
}

/// Builds candidate tables from edge intersections.
#[derive(Clone, Copy, Debug, Default)]
pub struct IntersectionLattice;

impl LatticeBuilder for IntersectionLattice {
    fn build(&self, page: &Page, edges: &EdgeSet, settings: &LatticeSettings) -> Vec<Table> {
        let store = EdgeStore::new(edges);
        let intersections = edges_to_intersections(
            &store,
            settings.intersection_x_tolerance,
            settings.intersection_y_tolerance,
        );
        let cells = intersections_to_cells(&intersections);
        trace!(
            intersections = intersections.len(),
            cells = cells.len(),
            "built lattice"
        );

        cells_to_tables(cells, settings.min_table_cells)
            .into_iter()
            .enumerate()
            .map(|(idx, boxes)| {
                let chars = assign_chars(&boxes, &page.chars);
                let cells: Vec<Cell> = boxes
                    .into_iter()
                    .zip(chars)
                    .map(|(bbox, chars)| Cell { bbox, chars })
                    .collect();
                let mut table = Table::new(TableId(idx), cells);
                table.rects = associated_rects(
                    &page.rects,
                    &table.bbox,
                    settings.intersection_x_tolerance,
                    settings.intersection_y_tolerance,
                );
                table
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::types::{EdgeObj, RectObj};

    fn grid_edges(xs: &[f64], ys: &[f64]) -> EdgeSet {
        EdgeSet {
            horizontal: ys
                .iter()
                .map(|&y| EdgeObj::horizontal(y, xs[0], xs[xs.len() - 1], "test"))
                .collect(),
            vertical: xs
                .iter()
                .map(|&x| EdgeObj::vertical(x, ys[0], ys[ys.len() - 1], "test"))
                .collect(),
        }
    }

    fn ch(text: &str, x: f64, y: f64) -> CharObj {
        CharObj::new(text, BBox::new(x, y, x + 5.0, y + 8.0), 10.0)
    }

    #[test]
    fn grid_produces_row_major_cells() {
        let page = Page::new(BBox::new(0.0, 0.0, 600.0, 800.0));
        let edges = grid_edges(&[100.0, 150.0, 200.0], &[100.0, 120.0, 140.0]);
        let tables = IntersectionLattice.build(&page, &edges, &LatticeSettings::default());
        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.id, TableId(0));
        assert_eq!(table.cells.len(), 4);
        assert_eq!(table.bbox, BBox::new(100.0, 100.0, 200.0, 140.0));
        assert_eq!(table.cells[0].bbox, BBox::new(100.0, 100.0, 150.0, 120.0));
        assert_eq!(table.cells[1].bbox, BBox::new(150.0, 100.0, 200.0, 120.0));
        assert_eq!(table.cells[2].bbox, BBox::new(100.0, 120.0, 150.0, 140.0));
    }

    #[test]
    fn single_cell_groups_are_dropped() {
        let cells = vec![
            BBox::new(0.0, 0.0, 10.0, 10.0),
            BBox::new(10.0, 0.0, 20.0, 10.0),
            BBox::new(50.0, 50.0, 60.0, 60.0),
        ];
        let tables = cells_to_tables(cells.clone(), 2);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].len(), 2);
        assert_eq!(cells_to_tables(cells, 1).len(), 2);
    }

    #[test]
    fn tables_are_ordered_top_then_left() {
        let cells = vec![
            BBox::new(200.0, 10.0, 210.0, 20.0),
            BBox::new(210.0, 10.0, 220.0, 20.0),
            BBox::new(0.0, 300.0, 10.0, 310.0),
            BBox::new(10.0, 300.0, 20.0, 310.0),
            BBox::new(0.0, 10.0, 10.0, 20.0),
            BBox::new(10.0, 10.0, 20.0, 20.0),
        ];
        let tables = cells_to_tables(cells, 2);
        let origins: Vec<(f64, f64)> = tables.iter().map(|t| (t[0].x0, t[0].top)).collect();
        assert_eq!(origins, vec![(0.0, 10.0), (200.0, 10.0), (0.0, 300.0)]);
    }

    #[test]
    fn chars_on_shared_border_go_to_one_cell() {
        let cells = vec![
            BBox::new(0.0, 0.0, 10.0, 10.0),
            BBox::new(10.0, 0.0, 20.0, 10.0),
        ];
        let chars = vec![
            CharObj::new("a", BBox::new(8.0, 2.0, 12.0, 6.0), 10.0),
            CharObj::new("b", BBox::new(2.0, 2.0, 6.0, 6.0), 10.0),
            CharObj::new("c", BBox::new(2.0, 30.0, 6.0, 36.0), 10.0),
        ];
        let assigned = assign_chars(&cells, &chars);
        assert_eq!(assigned[0], vec![CharId(1)]);
        assert_eq!(assigned[1], vec![CharId(0)]);
    }

    #[test]
    fn lattice_assigns_chars_and_rects() {
        let mut page = Page::new(BBox::new(0.0, 0.0, 600.0, 800.0));
        page.add_char(ch("x", 110.0, 105.0));
        page.add_char(ch("y", 160.0, 125.0));
        page.add_rect(RectObj::new(BBox::new(100.0, 100.0, 150.0, 120.0)));
        page.add_rect(RectObj::new(BBox::new(400.0, 400.0, 450.0, 420.0)));
        page.add_rect(RectObj::new(BBox::new(50.0, 50.0, 300.0, 300.0)));
        let edges = grid_edges(&[100.0, 150.0, 200.0], &[100.0, 120.0, 140.0]);
        let tables = IntersectionLattice.build(&page, &edges, &LatticeSettings::default());
        let table = &tables[0];
        assert_eq!(table.cells[0].chars, vec![CharId(0)]);
        assert_eq!(table.cells[3].chars, vec![CharId(1)]);
        assert!(table.cells[1].is_empty());
        assert_eq!(table.rects, vec![RectId(0), RectId(2)]);
    }
}
