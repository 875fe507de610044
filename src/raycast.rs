//! Ray casting against the envelope boundary.

use crate::error::{Result, ScanError};
use crate::geometry::Envelope;
use crate::math::DVec3;

/// Straight segment traversed by one scan direction, from the scan origin to
/// the envelope boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub origin: DVec3,
    pub end: DVec3,
}

impl Segment {
    pub fn length(&self) -> f64 {
        self.origin.distance(self.end)
    }
}

/// Casts a ray from `origin` along `direction` and returns the segment up to
/// the envelope boundary.
///
/// The envelope is first queried as if `origin` were inside it (the common
/// case, e.g. when the envelope is the world volume). A vanishing answer
/// means `origin` is outside, and the entry distance is used instead.
///
/// # Errors
///
/// Returns [`ScanError::Geometry`] when neither query yields a finite
/// positive distance; a zero-length segment is never produced.
pub fn cast_to_boundary(
    envelope: &dyn Envelope,
    origin: DVec3,
    direction: DVec3,
) -> Result<Segment> {
    let mut distance = envelope.distance_from_inside(origin, direction);
    if distance < f64::EPSILON {
        distance = envelope.distance_from_outside(origin, direction);
    }
    if !distance.is_finite() || distance < f64::EPSILON {
        return Err(ScanError::Geometry(format!(
            "ray from {:?} along {:?} does not intersect the envelope",
            origin, direction
        )));
    }
    Ok(Segment {
        origin,
        end: origin + direction * distance,
    })
}
