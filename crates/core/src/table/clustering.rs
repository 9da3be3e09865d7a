//! Tolerance clustering and bounding-box helpers.
//!
//! These functions group objects (edges, characters, cell dimensions) based
//! on proximity along one axis.

use std::collections::HashMap;

use super::types::{BBox, CharObj, KeyF64, key_f64};

/// Cluster a list of f64 values based on tolerance.
///
/// Values are sorted, then chained: a value joins the current group when it
/// is within `tolerance` of the previous value.
pub fn cluster_list(mut xs: Vec<f64>, tolerance: f64) -> Vec<Vec<f64>> {
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if tolerance == 0.0 || xs.len() < 2 {
        return xs.into_iter().map(|x| vec![x]).collect();
    }
    let mut groups: Vec<Vec<f64>> = Vec::new();
    let mut current: Vec<f64> = Vec::new();
    let mut last = xs[0];
    current.push(xs[0]);
    for x in xs.into_iter().skip(1) {
        if x <= last + tolerance {
            current.push(x);
        } else {
            groups.push(current);
            current = vec![x];
        }
        last = x;
    }
    groups.push(current);
    groups
}

/// Number of tolerance clusters among `values`.
///
/// With a zero tolerance this counts exactly-distinct values.
pub fn count_clusters(values: Vec<f64>, tolerance: f64) -> usize {
    let mut values = values;
    if tolerance == 0.0 {
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup_by(|a, b| *a == *b);
        return values.len();
    }
    cluster_list(values, tolerance).len()
}

/// Create a mapping from values to their cluster indices.
pub fn make_cluster_dict(values: Vec<f64>, tolerance: f64) -> HashMap<KeyF64, usize> {
    let mut unique: Vec<f64> = values;
    unique.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    unique.dedup_by(|a, b| (*a - *b).abs() == 0.0);
    let clusters = cluster_list(unique, tolerance);
    let mut dict = HashMap::new();
    for (i, cluster) in clusters.into_iter().enumerate() {
        for val in cluster {
            dict.insert(key_f64(val), i);
        }
    }
    dict
}

/// Cluster objects based on a key function and tolerance.
///
/// Groups come out in ascending key order; inside a group the input order is
/// kept.
pub fn cluster_objects<T: Clone, F: Fn(&T) -> f64>(
    xs: &[T],
    key_fn: F,
    tolerance: f64,
) -> Vec<Vec<T>> {
    let values: Vec<f64> = xs.iter().map(&key_fn).collect();
    let cluster_dict = make_cluster_dict(values, tolerance);

    let mut cluster_tuples: Vec<(T, usize)> = xs
        .iter()
        .map(|x| {
            (
                x.clone(),
                *cluster_dict.get(&key_f64(key_fn(x))).unwrap_or(&0),
            )
        })
        .collect();
    cluster_tuples.sort_by(|a, b| a.1.cmp(&b.1));

    let mut groups: Vec<Vec<T>> = Vec::new();
    let mut current: Vec<T> = Vec::new();
    let mut last_idx: Option<usize> = None;
    for (item, idx) in cluster_tuples.drain(..) {
        if last_idx.is_none_or(|last| last == idx) {
            current.push(item);
        } else {
            groups.push(current);
            current = vec![item];
        }
        last_idx = Some(idx);
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Compute a bounding box from character references.
///
/// Returns `None` for an empty input.
pub fn bbox_from_chars<'a>(chars: impl IntoIterator<Item = &'a CharObj>) -> Option<BBox> {
    let mut x0 = f64::INFINITY;
    let mut top = f64::INFINITY;
    let mut x1 = f64::NEG_INFINITY;
    let mut bottom = f64::NEG_INFINITY;
    let mut any = false;
    for c in chars {
        any = true;
        x0 = x0.min(c.x0);
        top = top.min(c.top);
        x1 = x1.max(c.x1);
        bottom = bottom.max(c.bottom);
    }
    any.then_some(BBox {
        x0,
        top,
        x1,
        bottom,
    })
}
