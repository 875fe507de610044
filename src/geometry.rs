//! Geometry provider seam.
//!
//! The scan engine never implements shape intersection or material lookup
//! itself; both come from an external detector-description provider through
//! the traits in this module. Implement [`GeometryProvider`] (and
//! [`Envelope`] for each boundary volume it exposes) to plug a geometry
//! backend into the scan.

use crate::math::DVec3;

/// A bounding volume the scan can cast rays against.
///
/// The two distance queries mirror the usual constructive-solid-geometry
/// navigator interface: one assumes the point is inside the volume, the
/// other that it is outside. A query that does not apply returns zero or a
/// non-finite value; the ray caster decides which of the two answers holds.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: the parallel scan path issues
/// read-only queries from several worker threads at once.
pub trait Envelope: Send + Sync {
    /// Distance from `origin` to the volume boundary along `direction`,
    /// assuming `origin` lies inside the volume.
    fn distance_from_inside(&self, origin: DVec3, direction: DVec3) -> f64;

    /// Distance from `origin` to the point where the ray enters the volume,
    /// assuming `origin` lies outside it.
    fn distance_from_outside(&self, origin: DVec3, direction: DVec3) -> f64;
}

/// Detector-description backend queried during a scan.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` and safe for concurrent read-only
/// queries; the engine never mutates the provider.
pub trait GeometryProvider: Send + Sync {
    /// Resolves a named envelope volume, or `None` if the name is unknown.
    fn envelope(&self, name: &str) -> Option<&dyn Envelope>;

    /// Materials crossed between `p0` and `p1`, in encounter order along the
    /// segment, each paired with the path length traversed in it. The same
    /// material may appear more than once when the segment crosses disjoint
    /// volumes made of it.
    fn materials_between(&self, p0: DVec3, p1: DVec3) -> Vec<(Material, f64)>;
}

/// Bulk material description, identified by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Material name as known to the detector description
    pub name: String,
    /// Radiation length X0, in the same length units as the geometry
    pub radiation_length: f64,
    /// Nuclear interaction length λ, in the same length units as the geometry
    pub interaction_length: f64,
}

impl Material {
    pub fn new(
        name: impl Into<String>,
        radiation_length: f64,
        interaction_length: f64,
    ) -> Self {
        Self {
            name: name.into(),
            radiation_length,
            interaction_length,
        }
    }

    /// Validates that both characteristic lengths are positive and finite.
    pub fn validate(&self) -> Result<(), &'static str> {
        if !(self.radiation_length.is_finite() && self.radiation_length > 0.0) {
            return Err("radiation length must be positive and finite");
        }
        if !(self.interaction_length.is_finite() && self.interaction_length > 0.0) {
            return Err("interaction length must be positive and finite");
        }
        Ok(())
    }
}
