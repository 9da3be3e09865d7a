//! Shared geometric and typographic measurements used by the filters.

use std::collections::{BTreeMap, BTreeSet};

use super::clustering::{cluster_objects, make_cluster_dict};
use super::types::{BBox, Cell, CharObj, KeyF64, Orientation, key_f64};

/// Find every pair `(i, j)` where `a[i]` and `b[j]` overlap with positive
/// area, using a sweep along x.
///
/// Boxes that merely touch are not reported. Degenerate (zero width or
/// height) boxes never overlap anything. Output is sorted.
pub fn overlapping_pairs(a: &[BBox], b: &[BBox]) -> Vec<(usize, usize)> {
    #[derive(Clone, Copy)]
    enum Side {
        A,
        B,
    }

    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum Kind {
        End,
        Start,
    }

    struct Event {
        x: f64,
        kind: Kind,
        side: Side,
        idx: usize,
    }

    let proper = |bbox: &BBox| bbox.width() > 0.0 && bbox.height() > 0.0;

    let mut events: Vec<Event> = Vec::with_capacity((a.len() + b.len()) * 2);
    for (side, boxes) in [(Side::A, a), (Side::B, b)] {
        for (idx, bbox) in boxes.iter().enumerate() {
            if !proper(bbox) {
                continue;
            }
            events.push(Event {
                x: bbox.x0,
                kind: Kind::Start,
                side,
                idx,
            });
            events.push(Event {
                x: bbox.x1,
                kind: Kind::End,
                side,
                idx,
            });
        }
    }
    // Ends sort before starts at equal x so touching boxes never coexist.
    events.sort_by(|p, q| {
        p.x.partial_cmp(&q.x)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(p.kind.cmp(&q.kind))
    });

    let mut active_a: BTreeSet<usize> = BTreeSet::new();
    let mut active_b: BTreeSet<usize> = BTreeSet::new();
    let mut pairs = Vec::new();
    for event in events {
        match (event.kind, event.side) {
            (Kind::Start, Side::A) => {
                let bbox = &a[event.idx];
                for &j in &active_b {
                    if bbox.overlaps_y(&b[j]) {
                        pairs.push((event.idx, j));
                    }
                }
                active_a.insert(event.idx);
            }
            (Kind::Start, Side::B) => {
                let bbox = &b[event.idx];
                for &i in &active_a {
                    if bbox.overlaps_y(&a[i]) {
                        pairs.push((i, event.idx));
                    }
                }
                active_b.insert(event.idx);
            }
            (Kind::End, Side::A) => {
                active_a.remove(&event.idx);
            }
            (Kind::End, Side::B) => {
                active_b.remove(&event.idx);
            }
        }
    }
    pairs.sort_unstable();
    pairs
}

/// Median of `values`, or `None` when empty.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Most frequent value after rounding to `step`; ties go to the smallest.
fn mode_rounded(values: impl IntoIterator<Item = f64>, step: f64) -> Option<f64> {
    let mut counts: BTreeMap<KeyF64, usize> = BTreeMap::new();
    for v in values {
        let rounded = (v / step).round() * step;
        *counts.entry(key_f64(rounded)).or_default() += 1;
    }
    let mut best: Option<(KeyF64, usize)> = None;
    for (value, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.into_inner())
}

/// Body-text font size: the modal glyph size, rounded to 0.1pt.
pub fn mode_font_size<'a>(chars: impl IntoIterator<Item = &'a CharObj>) -> Option<f64> {
    mode_rounded(chars.into_iter().map(|c| c.size), 0.1)
}

/// Modal glyph `(width, height)`, each rounded to 0.01pt.
pub fn mode_glyph_size(chars: &[&CharObj]) -> Option<(f64, f64)> {
    let width = mode_rounded(chars.iter().map(|c| c.width()), 0.01)?;
    let height = mode_rounded(chars.iter().map(|c| c.height()), 0.01)?;
    Some((width, height))
}

/// Smallest glyph width and smallest glyph height on the page.
pub fn min_glyph_size(chars: &[CharObj]) -> Option<(f64, f64)> {
    if chars.is_empty() {
        return None;
    }
    let width = chars.iter().map(CharObj::width).fold(f64::INFINITY, f64::min);
    let height = chars.iter().map(CharObj::height).fold(f64::INFINITY, f64::min);
    Some((width, height))
}

/// Group glyphs into text lines by their top coordinate.
pub fn group_text_lines<'a>(chars: &[&'a CharObj], tolerance: f64) -> Vec<Vec<&'a CharObj>> {
    cluster_objects(chars, |c| c.top, tolerance)
}

/// Count row (`Horizontal`) or column (`Vertical`) bands among `cells` after
/// snapping their borders to clusters within `tolerance`.
pub fn aligned_band_count(cells: &[Cell], orientation: Orientation, tolerance: f64) -> usize {
    let span = |c: &Cell| match orientation {
        Orientation::Horizontal => (c.bbox.top, c.bbox.bottom),
        Orientation::Vertical => (c.bbox.x0, c.bbox.x1),
    };
    let borders: Vec<f64> = cells
        .iter()
        .flat_map(|c| {
            let (start, end) = span(c);
            [start, end]
        })
        .collect();
    let dict = make_cluster_dict(borders, tolerance);
    let bands: BTreeSet<(usize, usize)> = cells
        .iter()
        .map(|c| {
            let (start, end) = span(c);
            (
                dict.get(&key_f64(start)).copied().unwrap_or(0),
                dict.get(&key_f64(end)).copied().unwrap_or(0),
            )
        })
        .collect();
    bands.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive_pairs(a: &[BBox], b: &[BBox]) -> Vec<(usize, usize)> {
        let mut out = Vec::new();
        for (i, p) in a.iter().enumerate() {
            for (j, q) in b.iter().enumerate() {
                if p.x0 < q.x1 && p.x1 > q.x0 && p.top < q.bottom && p.bottom > q.top {
                    out.push((i, j));
                }
            }
        }
        out
    }

    #[test]
    fn sweep_matches_naive_overlap() {
        let a = vec![
            BBox::new(1.0, 2.0, 3.0, 4.0),
            BBox::new(3.0, 2.0, 4.0, 4.0),
            BBox::new(4.0, 2.0, 6.0, 4.0),
            BBox::new(2.0, 4.0, 5.0, 9.0),
        ];
        let b = vec![
            BBox::new(1.2, 2.2, 2.8, 3.8),
            BBox::new(6.0, 2.0, 8.0, 5.0),
            BBox::new(8.0, 10.0, 10.0, 12.0),
            BBox::new(1.4, 2.4, 6.0, 3.8),
        ];
        assert_eq!(overlapping_pairs(&a, &b), naive_pairs(&a, &b));
    }

    #[test]
    fn self_overlap_reports_each_box_once_for_a_clean_grid() {
        let cells = vec![
            BBox::new(0.0, 0.0, 10.0, 10.0),
            BBox::new(10.0, 0.0, 20.0, 10.0),
            BBox::new(0.0, 10.0, 10.0, 20.0),
            BBox::new(10.0, 10.0, 20.0, 20.0),
        ];
        assert_eq!(
            overlapping_pairs(&cells, &cells),
            vec![(0, 0), (1, 1), (2, 2), (3, 3)]
        );
    }

    #[test]
    fn median_of_even_count_averages_middle() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn mode_font_size_prefers_smallest_on_tie() {
        let chars = [
            CharObj::new("a", BBox::new(0.0, 0.0, 5.0, 10.0), 10.0),
            CharObj::new("b", BBox::new(0.0, 0.0, 5.0, 10.0), 9.0),
            CharObj::new("c", BBox::new(0.0, 0.0, 5.0, 10.0), 10.04),
            CharObj::new("d", BBox::new(0.0, 0.0, 5.0, 10.0), 9.0),
        ];
        assert_eq!(mode_font_size(chars.iter()), Some(9.0));
    }

    #[test]
    fn bands_merge_nearly_aligned_borders() {
        let cells = vec![
            Cell::new(BBox::new(0.0, 0.0, 10.0, 10.0)),
            Cell::new(BBox::new(10.0, 0.3, 20.0, 10.2)),
            Cell::new(BBox::new(0.0, 10.0, 10.0, 20.0)),
        ];
        assert_eq!(aligned_band_count(&cells, Orientation::Horizontal, 0.5), 2);
        assert_eq!(aligned_band_count(&cells, Orientation::Horizontal, 0.0), 3);
        assert_eq!(aligned_band_count(&cells, Orientation::Vertical, 0.5), 2);
    }
}
