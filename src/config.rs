//! Configuration for matscan
//!
//! [`ScanOptions`] mirrors the option surface of the scan service, including
//! the deprecated aliases kept for backward compatibility. A one-shot
//! [`ScanOptions::validate`] resolves aliases and bounds checks everything,
//! producing the immutable [`ScanConfig`] consumed by the driver; nothing is
//! re-checked at use sites.

use crate::error::{Result, ScanError};
use std::fmt;
use std::str::FromStr;

/// Default angle grid bounds and step.
pub mod defaults {
    pub const ANGLE_MIN: f64 = -6.0;
    pub const ANGLE_MAX: f64 = 6.0;
    pub const ANGLE_BINNING: f64 = 0.05;
    pub const N_PHI: u32 = 100;
    pub const ENVELOPE_NAME: &str = "world";
}

/// Interpretation of the scanned angle coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleDef {
    /// Pseudorapidity; polar angle is `2·atan(exp(-angle))`.
    #[default]
    Eta,
    /// Polar angle in degrees.
    Theta,
    /// Polar angle in radians, used as-is.
    ThetaRad,
    /// Cosine of the polar angle; values must lie in `[-1, 1]`.
    CosTheta,
}

impl AngleDef {
    pub fn as_str(&self) -> &'static str {
        match self {
            AngleDef::Eta => "eta",
            AngleDef::Theta => "theta",
            AngleDef::ThetaRad => "thetaRad",
            AngleDef::CosTheta => "cosTheta",
        }
    }

    /// Converts an angle value in this definition to a polar angle in radians.
    pub fn to_polar(&self, angle: f64) -> f64 {
        match self {
            AngleDef::Eta => 2.0 * (-angle).exp().atan(),
            AngleDef::Theta => angle.to_radians(),
            AngleDef::ThetaRad => angle,
            AngleDef::CosTheta => angle.acos(),
        }
    }
}

impl fmt::Display for AngleDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AngleDef {
    type Err = ScanError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "eta" => Ok(AngleDef::Eta),
            "theta" => Ok(AngleDef::Theta),
            "thetaRad" => Ok(AngleDef::ThetaRad),
            "cosTheta" => Ok(AngleDef::CosTheta),
            other => Err(ScanError::Configuration(format!(
                "unknown angleDef '{}', expected one of 'eta', 'theta', 'thetaRad', 'cosTheta'",
                other
            ))),
        }
    }
}

/// Raw scan options as set by the caller.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Destination of the output record set
    pub filename: String,
    /// Lower bound of the angle grid
    pub angle_min: f64,
    /// Upper bound of the angle grid (half-open; the boundary bin is excluded)
    pub angle_max: f64,
    /// Angle grid step
    pub angle_binning: f64,
    /// Number of azimuthal samples, evenly distributed over `[0, 2π)`
    pub n_phi: u32,
    /// Interpretation of the angle coordinate
    pub angle_def: AngleDef,
    /// Name of the envelope volume within which the material is measured
    pub envelope_name: String,
    /// Deprecated, use `angle_binning` instead
    pub eta_binning: Option<f64>,
    /// Deprecated, use `angle_max` instead
    pub eta_max: Option<f64>,
    /// Deprecated, use `n_phi` instead
    pub n_phi_trials: Option<u32>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            filename: String::new(),
            angle_min: defaults::ANGLE_MIN,
            angle_max: defaults::ANGLE_MAX,
            angle_binning: defaults::ANGLE_BINNING,
            n_phi: defaults::N_PHI,
            angle_def: AngleDef::default(),
            envelope_name: defaults::ENVELOPE_NAME.to_string(),
            eta_binning: None,
            eta_max: None,
            n_phi_trials: None,
        }
    }
}

impl ScanOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    pub fn angle_min(mut self, angle_min: f64) -> Self {
        self.angle_min = angle_min;
        self
    }

    pub fn angle_max(mut self, angle_max: f64) -> Self {
        self.angle_max = angle_max;
        self
    }

    pub fn angle_binning(mut self, angle_binning: f64) -> Self {
        self.angle_binning = angle_binning;
        self
    }

    pub fn n_phi(mut self, n_phi: u32) -> Self {
        self.n_phi = n_phi;
        self
    }

    pub fn angle_def(mut self, angle_def: AngleDef) -> Self {
        self.angle_def = angle_def;
        self
    }

    pub fn envelope_name(mut self, envelope_name: impl Into<String>) -> Self {
        self.envelope_name = envelope_name.into();
        self
    }

    /// Resolves deprecated aliases and bounds checks every option, producing
    /// the canonical immutable configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Configuration`] for an inverted or empty angle
    /// range, a non-positive binning, zero phi samples, a `cosTheta` range
    /// outside `[-1, 1]`, or a deprecated alias set together with its
    /// replacement.
    pub fn validate(self) -> Result<ScanConfig> {
        let mut angle_binning = self.angle_binning;
        if let Some(eta_binning) = self.eta_binning {
            if self.angle_binning != defaults::ANGLE_BINNING {
                return Err(ScanError::Configuration(
                    "etaBinning is deprecated and conflicts with angleBinning; set only angleBinning"
                        .to_string(),
                ));
            }
            log::warn!("etaBinning is deprecated, use angleBinning instead");
            angle_binning = eta_binning;
        }

        let mut angle_max = self.angle_max;
        if let Some(eta_max) = self.eta_max {
            if self.angle_max != defaults::ANGLE_MAX {
                return Err(ScanError::Configuration(
                    "etaMax is deprecated and conflicts with angleMax; set only angleMax".to_string(),
                ));
            }
            log::warn!("etaMax is deprecated, use angleMax instead");
            angle_max = eta_max;
        }

        let mut n_phi = self.n_phi;
        if let Some(n_phi_trials) = self.n_phi_trials {
            if self.n_phi != defaults::N_PHI {
                return Err(ScanError::Configuration(
                    "nPhiTrials is deprecated and conflicts with nPhi; set only nPhi".to_string(),
                ));
            }
            log::warn!("nPhiTrials is deprecated, use nPhi instead");
            n_phi = n_phi_trials;
        }

        if self.angle_min >= angle_max {
            return Err(ScanError::Configuration(format!(
                "angleMin ({}) must be smaller than angleMax ({})",
                self.angle_min, angle_max
            )));
        }
        if angle_binning <= 0.0 {
            return Err(ScanError::Configuration(format!(
                "angleBinning must be positive, got {}",
                angle_binning
            )));
        }
        if n_phi == 0 {
            return Err(ScanError::Configuration(
                "nPhi must be positive".to_string(),
            ));
        }
        if self.angle_def == AngleDef::CosTheta && (self.angle_min < -1.0 || angle_max > 1.0) {
            return Err(ScanError::Configuration(format!(
                "cosTheta range [{}, {}] must lie within [-1, 1]",
                self.angle_min, angle_max
            )));
        }

        Ok(ScanConfig {
            filename: self.filename,
            angle_min: self.angle_min,
            angle_max,
            angle_binning,
            n_phi,
            angle_def: self.angle_def,
            envelope_name: self.envelope_name,
        })
    }
}

/// Validated, immutable scan configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanConfig {
    pub filename: String,
    pub angle_min: f64,
    pub angle_max: f64,
    pub angle_binning: f64,
    pub n_phi: u32,
    pub angle_def: AngleDef,
    pub envelope_name: String,
}
