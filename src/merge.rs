use std::collections::BTreeMap;

use nalgebra as na;
use tracing::trace;

use crate::contour::Contour;
use crate::detection::Detection;
use crate::disjoint_set::DisjointSet;

/// Fuse contours whose mass centers sit closer than `merge_fraction` of the
/// largest bounding-box side of either party, transitively. `summaries`
/// carries the pre-merge geometry and must run parallel to `contours`.
pub fn merge_nearby(
    contours: Vec<Contour>,
    summaries: &[Detection],
    merge_fraction: f32,
) -> Vec<Contour> {
    debug_assert_eq!(contours.len(), summaries.len());

    let mut sets = DisjointSet::new(contours.len());
    for i in 0..contours.len() {
        for j in (i + 1)..contours.len() {
            let side = summaries[i]
                .bbox
                .longest_side()
                .max(summaries[j].bbox.longest_side());

            let dist = na::distance(&summaries[i].centroid(), &summaries[j].centroid());
            if dist < merge_fraction * side as f32 {
                sets.union(i, j);
            }
        }
    }

    let mut classes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for i in 0..contours.len() {
        classes.entry(sets.find(i)).or_default().push(i);
    }

    let mut slots: Vec<Option<Contour>> = contours.into_iter().map(Some).collect();
    let mut merged = Vec::with_capacity(classes.len());

    for members in classes.into_values() {
        if members.len() > 1 {
            trace!(count = members.len(), "merging nearby contours");
        }

        let mut aggregate = Contour::new();
        for idx in members {
            if let Some(points) = slots[idx].take() {
                if aggregate.is_empty() {
                    aggregate = points;
                } else {
                    aggregate.extend(points);
                }
            }
        }

        merged.push(aggregate);
    }

    merged
}
