//! Per-segment material aggregation.
//!
//! The provider reports the segment as an ordered sequence of
//! (material, path length) steps; [`accumulate`] folds those steps into one
//! [`MaterialContribution`] per distinct material and derives the radiation
//! and interaction length counts. Contributions keep first-encounter order
//! along the segment, so a scan over a fixed geometry is reproducible.

use crate::geometry::{GeometryProvider, Material};
use crate::raycast::Segment;
use std::collections::HashMap;

/// Aggregated crossing of one distinct material.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialContribution {
    pub material: Material,
    /// Total path length through this material, disjoint crossings summed
    pub path_length: f64,
    /// `path_length / material.radiation_length`
    pub num_radiation_lengths: f64,
    /// `path_length / material.interaction_length`
    pub num_interaction_lengths: f64,
}

/// One output row of the scan: everything found along a single direction.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRecord {
    pub angle: f64,
    pub phi: f64,
    pub contributions: Vec<MaterialContribution>,
}

impl ScanRecord {
    /// Number of distinct materials along the direction. Zero is valid, e.g.
    /// for a vacuum-only path.
    pub fn material_count(&self) -> usize {
        self.contributions.len()
    }

    /// Sum of all per-material path lengths; equals the segment length up to
    /// floating tolerance.
    pub fn total_path_length(&self) -> f64 {
        self.contributions.iter().map(|c| c.path_length).sum()
    }
}

/// Queries the provider for the materials along `segment` and folds them
/// into one record for the given grid point.
pub fn accumulate(
    provider: &dyn GeometryProvider,
    segment: &Segment,
    angle: f64,
    phi: f64,
) -> ScanRecord {
    let steps = provider.materials_between(segment.origin, segment.end);

    // First-encounter order; the index map only routes repeats, iteration
    // order never depends on it.
    let mut folded: Vec<(Material, f64)> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();
    for (material, path_length) in steps {
        match index_by_name.get(material.name.as_str()) {
            Some(&index) => folded[index].1 += path_length,
            None => {
                index_by_name.insert(material.name.clone(), folded.len());
                folded.push((material, path_length));
            }
        }
    }

    let contributions = folded
        .into_iter()
        .map(|(material, path_length)| MaterialContribution {
            num_radiation_lengths: path_length / material.radiation_length,
            num_interaction_lengths: path_length / material.interaction_length,
            material,
            path_length,
        })
        .collect();

    ScanRecord {
        angle,
        phi,
        contributions,
    }
}
