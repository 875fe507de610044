//! Math types for matscan

pub use glam::DVec3;

/// Unit direction vector from a polar angle `theta` (radians, measured from
/// the +z axis) and an azimuth `phi` (radians, measured in the x-y plane).
pub fn direction_from_polar(theta: f64, phi: f64) -> DVec3 {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    DVec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta).normalize()
}
