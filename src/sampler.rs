//! Direction grid sampling.
//!
//! [`DirectionGrid`] turns a validated [`ScanConfig`] into the ordered,
//! finite sequence of [`DirectionSample`]s the driver walks: angle outer,
//! phi inner. Angle samples start at `angle_min + 0.5·angle_binning` and
//! step by `angle_binning` while strictly below `angle_max`, so the boundary
//! bin is excluded. Phi samples are `n_phi` even steps over `[0, 2π)`.

use crate::config::{AngleDef, ScanConfig};
use crate::math::{DVec3, direction_from_polar};
use std::f64::consts::TAU;

/// One grid point: the raw angle coordinate, the azimuth, and the unit
/// direction vector derived from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionSample {
    pub angle: f64,
    pub phi: f64,
    pub direction: DVec3,
}

/// Lazy iterator over the direction grid in lexicographic (angle, phi) order.
pub struct DirectionGrid {
    angle_min: f64,
    angle_binning: f64,
    angle_def: AngleDef,
    phi_step: f64,
    n_phi: usize,
    next: usize,
    total: usize,
}

impl DirectionGrid {
    pub fn new(config: &ScanConfig) -> Self {
        let n_phi = config.n_phi as usize;
        let angle_count = angle_count(config.angle_min, config.angle_max, config.angle_binning);
        Self {
            angle_min: config.angle_min,
            angle_binning: config.angle_binning,
            angle_def: config.angle_def,
            phi_step: TAU / n_phi as f64,
            n_phi,
            next: 0,
            total: angle_count * n_phi,
        }
    }

    /// Number of angle samples produced by the half-open stepping rule.
    pub fn angle_count(&self) -> usize {
        self.total / self.n_phi
    }
}

/// Closed-form count of samples `angle_min + (i + 0.5)·binning < angle_max`.
fn angle_count(angle_min: f64, angle_max: f64, angle_binning: f64) -> usize {
    let span = (angle_max - angle_min) / angle_binning - 0.5;
    if span <= 0.0 { 0 } else { span.ceil() as usize }
}

impl Iterator for DirectionGrid {
    type Item = DirectionSample;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let angle_index = self.next / self.n_phi;
        let phi_index = self.next % self.n_phi;
        self.next += 1;

        // Index-based stepping keeps the half-open rule exact; repeated
        // addition could drift past angle_max.
        let angle = self.angle_min + (angle_index as f64 + 0.5) * self.angle_binning;
        let phi = phi_index as f64 * self.phi_step;
        let theta = self.angle_def.to_polar(angle);
        Some(DirectionSample {
            angle,
            phi,
            direction: direction_from_polar(theta, phi),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DirectionGrid {}
