//! # matscan
//!
//! A directional material-budget scan engine for detector geometries.
//!
//! matscan measures how much inactive material a straight ray from a
//! reference point traverses inside an envelope volume, expressed in
//! radiation lengths (X0) and nuclear interaction lengths (λ), as a function
//! of direction. Detector designers use the resulting records to check that
//! support structures, cables, and services stay within material budgets
//! before committing to full particle-transport simulation.
//!
//! The crate is the scan engine only: it samples an angular grid, casts each
//! direction against the envelope, aggregates the material found along the
//! traversed segment, and commits one record per direction to a sink.
//! Geometry construction and material lookup live behind the
//! [`GeometryProvider`] trait and are supplied by the caller.
//!
//! ## Quick Start
//!
//! ```no_run
//! use matscan::{AngleDef, JsonLinesSink, MaterialScan, ScanOptions};
//!
//! # fn scan(provider: &dyn matscan::GeometryProvider) -> matscan::Result<()> {
//! // Configure the angular grid
//! let options = ScanOptions::new()
//!     .filename("material_scan.jsonl")
//!     .angle_def(AngleDef::Eta)
//!     .angle_min(-4.0)
//!     .angle_max(4.0)
//!     .angle_binning(0.1)
//!     .n_phi(64)
//!     .envelope_name("world");
//!
//! // Validation happens once, up front
//! let mut scan = MaterialScan::new(options)?;
//!
//! // Run against your geometry backend and commit the records
//! let mut sink = JsonLinesSink::new("material_scan.jsonl");
//! let summary = scan.run(provider, &mut sink)?;
//! println!(
//!     "{} records, {} distinct materials",
//!     summary.records, summary.distinct_materials
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Components
//!
//! - **[`ScanOptions`]** / **[`ScanConfig`]**: raw options (including
//!   deprecated aliases) and the validated configuration they resolve into
//! - **[`DirectionGrid`]**: the ordered angular grid of scan directions
//! - **[`GeometryProvider`]** / **[`Envelope`]**: traits for plugging in a
//!   detector-description backend
//! - **[`MaterialScan`]**: the driver walking the grid and committing records
//! - **[`RecordSink`]**: destination for the completed record set
//!
//! ## Guarantees
//!
//! - Records are emitted in lexicographic (angle, phi) order, matching the
//!   grid; the parallel path reassembles records before the commit.
//! - Per-record material contributions are in first-encounter order, so a
//!   scan over a fixed geometry is reproducible.
//! - Output is all-or-nothing: any failure aborts the run before the sink is
//!   committed, so a partial grid never reaches the output.

pub mod accumulate;
pub mod config;
pub mod driver;
pub mod error;
pub mod geometry;
pub mod math;
pub mod raycast;
pub mod sampler;
pub mod sink;

pub use accumulate::{MaterialContribution, ScanRecord};
pub use config::{AngleDef, ScanConfig, ScanOptions};
pub use driver::{MaterialScan, ScanState, ScanSummary};
pub use error::{Result, ScanError};
pub use geometry::{Envelope, GeometryProvider, Material};
pub use raycast::Segment;
pub use sampler::{DirectionGrid, DirectionSample};
pub use sink::{JsonLinesSink, MemorySink, RecordSink};
