//! Sweep-line search for points where horizontal and vertical edges cross.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use super::types::{EdgeObj, EdgeSet, HEdgeId, KeyF64, KeyPoint, VEdgeId, key_f64, key_point};

/// Edges of one page in sweep order: verticals by `(x0, top)`, horizontals
/// by `(top, x0)`.
pub(crate) struct EdgeStore {
    pub v: Vec<EdgeObj>,
    pub h: Vec<EdgeObj>,
}

impl EdgeStore {
    pub fn new(edges: &EdgeSet) -> Self {
        let mut v = edges.vertical.clone();
        let mut h = edges.horizontal.clone();
        v.sort_by(|a, b| cmp_f64(a.x0, b.x0).then(cmp_f64(a.top, b.top)));
        h.sort_by(|a, b| cmp_f64(a.top, b.top).then(cmp_f64(a.x0, b.x0)));
        Self { v, h }
    }
}

/// Edges meeting at one intersection point, sorted by id.
#[derive(Clone, Debug, Default)]
pub(crate) struct IntersectionIdx {
    pub v: Vec<VEdgeId>,
    pub h: Vec<HEdgeId>,
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

/// Find every crossing between the vertical and horizontal edges of `store`.
///
/// A vertical edge is widened by `y_tol` at both ends and a horizontal edge
/// by `x_tol`, so segments that stop just short of each other still meet.
/// The intersection point is `(vertical.x0, horizontal.top)`.
pub(crate) fn edges_to_intersections(
    store: &EdgeStore,
    x_tol: f64,
    y_tol: f64,
) -> HashMap<KeyPoint, IntersectionIdx> {
    #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
    enum EventKind {
        AddV,
        QueryH,
        RemoveV,
    }

    struct Event {
        y: f64,
        kind: EventKind,
        idx: usize,
    }

    let mut events = Vec::with_capacity(store.v.len() * 2 + store.h.len());
    for (idx, v) in store.v.iter().enumerate() {
        events.push(Event {
            y: v.top - y_tol,
            kind: EventKind::AddV,
            idx,
        });
        events.push(Event {
            y: v.bottom + y_tol,
            kind: EventKind::RemoveV,
            idx,
        });
    }
    for (idx, h) in store.h.iter().enumerate() {
        events.push(Event {
            y: h.top,
            kind: EventKind::QueryH,
            idx,
        });
    }

    // Stores are pre-sorted, so the index is a stable positional tie-break.
    events.sort_by(|a, b| {
        cmp_f64(a.y, b.y)
            .then(a.kind.cmp(&b.kind))
            .then(a.idx.cmp(&b.idx))
    });

    let mut active: BTreeMap<KeyF64, Vec<usize>> = BTreeMap::new();
    let mut found: HashMap<KeyPoint, IntersectionIdx> = HashMap::new();

    for event in events {
        match event.kind {
            EventKind::AddV => {
                let v = &store.v[event.idx];
                active.entry(key_f64(v.x0)).or_default().push(event.idx);
            }
            EventKind::RemoveV => {
                let key = key_f64(store.v[event.idx].x0);
                if let Some(bucket) = active.get_mut(&key) {
                    bucket.retain(|&idx| idx != event.idx);
                    if bucket.is_empty() {
                        active.remove(&key);
                    }
                }
            }
            EventKind::QueryH => {
                let h = &store.h[event.idx];
                let x_min = key_f64(h.x0 - x_tol);
                let x_max = key_f64(h.x1 + x_tol);
                for (_, v_indices) in active.range(x_min..=x_max) {
                    for &v_idx in v_indices {
                        let v = &store.v[v_idx];
                        if v.top <= h.top + y_tol && v.bottom >= h.top - y_tol {
                            let entry = found.entry(key_point(v.x0, h.top)).or_default();
                            entry.v.push(VEdgeId(v_idx));
                            entry.h.push(HEdgeId(event.idx));
                        }
                    }
                }
            }
        }
    }

    for idx in found.values_mut() {
        idx.v.sort_unstable();
        idx.v.dedup();
        idx.h.sort_unstable();
        idx.h.dedup();
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(xs: &[f64], ys: &[f64]) -> EdgeSet {
        let (x_min, x_max) = (xs[0], xs[xs.len() - 1]);
        let (y_min, y_max) = (ys[0], ys[ys.len() - 1]);
        EdgeSet {
            horizontal: ys
                .iter()
                .map(|&y| EdgeObj::horizontal(y, x_min, x_max, "test"))
                .collect(),
            vertical: xs
                .iter()
                .map(|&x| EdgeObj::vertical(x, y_min, y_max, "test"))
                .collect(),
        }
    }

    #[test]
    fn full_grid_has_every_crossing() {
        let store = EdgeStore::new(&grid(&[0.0, 10.0, 20.0], &[0.0, 5.0]));
        let found = edges_to_intersections(&store, 1.0, 1.0);
        assert_eq!(found.len(), 6);
        let corner = &found[&key_point(20.0, 5.0)];
        assert_eq!(corner.v.len(), 1);
        assert_eq!(corner.h.len(), 1);
    }

    #[test]
    fn tolerance_bridges_short_gaps() {
        let set = EdgeSet {
            horizontal: vec![EdgeObj::horizontal(10.0, 0.0, 48.0, "test")],
            vertical: vec![EdgeObj::vertical(50.0, 12.0, 40.0, "test")],
        };
        let store = EdgeStore::new(&set);
        assert!(edges_to_intersections(&store, 0.0, 0.0).is_empty());
        let found = edges_to_intersections(&store, 3.0, 3.0);
        assert!(found.contains_key(&key_point(50.0, 10.0)));
    }
}
