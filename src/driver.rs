//! Scan driver.
//!
//! [`MaterialScan`] orchestrates the whole run: it validates options into a
//! configuration, walks the direction grid in emission order, casts each
//! direction against the envelope, aggregates materials per segment, and
//! commits the complete record set to the sink in one step. Any error aborts
//! the run; nothing is committed.

use crate::accumulate::{ScanRecord, accumulate};
use crate::config::{ScanConfig, ScanOptions};
use crate::error::{Result, ScanError};
use crate::geometry::{Envelope, GeometryProvider};
use crate::math::DVec3;
use crate::raycast::cast_to_boundary;
use crate::sampler::{DirectionGrid, DirectionSample};
use crate::sink::{JsonLinesSink, RecordSink};
use std::collections::HashSet;

/// Lifecycle of a scan run.
///
/// `Idle` is the option-building stage before a `MaterialScan` exists;
/// constructing one performs the `Idle → Configured` transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Configured,
    Running,
    Completed,
    Failed,
}

/// Totals reported after a successful run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanSummary {
    /// Number of committed records, one per grid direction
    pub records: usize,
    /// Number of distinct materials seen across the whole grid
    pub distinct_materials: usize,
}

impl ScanSummary {
    fn from_records(records: &[ScanRecord]) -> Self {
        let mut names = HashSet::new();
        for record in records {
            for contribution in &record.contributions {
                names.insert(contribution.material.name.as_str());
            }
        }
        Self {
            records: records.len(),
            distinct_materials: names.len(),
        }
    }
}

/// Driver for a directional material-budget scan.
pub struct MaterialScan {
    config: ScanConfig,
    state: ScanState,
}

impl MaterialScan {
    /// Validates `options` and produces a configured scan.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Configuration`] when validation fails; no sink
    /// is opened and no output is produced.
    pub fn new(options: ScanOptions) -> Result<Self> {
        let config = options.validate()?;
        Ok(Self {
            config,
            state: ScanState::Configured,
        })
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Runs the scan serially in emission order (angle outer, phi inner) and
    /// commits the full record set to `sink` once the grid completes.
    ///
    /// # Errors
    ///
    /// Any [`ScanError::Geometry`] (unresolvable envelope, ray missing the
    /// envelope) or sink failure aborts the run as a whole; no records are
    /// committed and the state moves to [`ScanState::Failed`].
    pub fn run(
        &mut self,
        provider: &dyn GeometryProvider,
        sink: &mut dyn RecordSink,
    ) -> Result<ScanSummary> {
        self.state = ScanState::Running;
        let outcome = self.scan_serial(provider);
        self.finish(outcome, sink)
    }

    /// Runs the scan across a bounded worker pool, then reassembles the
    /// records into canonical (angle, phi) order before the single commit.
    ///
    /// Observationally identical to [`MaterialScan::run`], including the
    /// all-or-nothing failure behavior. The provider is only ever queried
    /// read-only, concurrently from `workers` threads.
    pub fn run_parallel(
        &mut self,
        provider: &dyn GeometryProvider,
        sink: &mut dyn RecordSink,
        workers: usize,
    ) -> Result<ScanSummary> {
        self.state = ScanState::Running;
        let outcome = self.scan_parallel(provider, workers);
        self.finish(outcome, sink)
    }

    /// Runs the scan and commits to a [`JsonLinesSink`] at the configured
    /// `filename`. Convenience wrapper over [`MaterialScan::run`].
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Configuration`] if no `filename` was configured,
    /// in addition to the failure modes of [`MaterialScan::run`].
    pub fn run_to_file(&mut self, provider: &dyn GeometryProvider) -> Result<ScanSummary> {
        if self.config.filename.is_empty() {
            return Err(ScanError::Configuration(
                "filename is not set".to_string(),
            ));
        }
        let mut sink = JsonLinesSink::new(self.config.filename.clone());
        self.run(provider, &mut sink)
    }

    fn finish(
        &mut self,
        outcome: Result<Vec<ScanRecord>>,
        sink: &mut dyn RecordSink,
    ) -> Result<ScanSummary> {
        let committed = outcome.and_then(|records| {
            sink.commit(&records)?;
            Ok(records)
        });
        match committed {
            Ok(records) => {
                self.state = ScanState::Completed;
                let summary = ScanSummary::from_records(&records);
                log::info!(
                    "scan completed: {} records, {} distinct materials",
                    summary.records,
                    summary.distinct_materials
                );
                Ok(summary)
            }
            Err(err) => {
                self.state = ScanState::Failed;
                log::error!("scan failed: {}", err);
                Err(err)
            }
        }
    }

    fn resolve_envelope<'a>(
        &self,
        provider: &'a dyn GeometryProvider,
    ) -> Result<&'a dyn Envelope> {
        provider.envelope(&self.config.envelope_name).ok_or_else(|| {
            ScanError::Geometry(format!(
                "unknown envelope volume '{}'",
                self.config.envelope_name
            ))
        })
    }

    fn scan_serial(&self, provider: &dyn GeometryProvider) -> Result<Vec<ScanRecord>> {
        let envelope = self.resolve_envelope(provider)?;
        let grid = DirectionGrid::new(&self.config);
        let mut records = Vec::with_capacity(grid.len());
        let mut current_angle = None;
        for sample in grid {
            if current_angle != Some(sample.angle) {
                log::info!("{}: {}", self.config.angle_def, sample.angle);
                current_angle = Some(sample.angle);
            }
            records.push(self.scan_direction(provider, envelope, &sample)?);
        }
        Ok(records)
    }

    fn scan_parallel(
        &self,
        provider: &dyn GeometryProvider,
        workers: usize,
    ) -> Result<Vec<ScanRecord>> {
        let envelope = self.resolve_envelope(provider)?;
        let grid = DirectionGrid::new(&self.config);
        let total = grid.len();
        let workers = workers.max(1);

        let (task_tx, task_rx) = crossbeam_channel::bounded::<(usize, DirectionSample)>(workers * 2);
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<(usize, Result<ScanRecord>)>();

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let task_rx = task_rx.clone();
                let result_tx = result_tx.clone();
                scope.spawn(move || {
                    for (index, sample) in task_rx.iter() {
                        let outcome = self.scan_direction(provider, envelope, &sample);
                        if result_tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
            drop(task_rx);
            drop(result_tx);

            scope.spawn(move || {
                for task in grid.enumerate() {
                    if task_tx.send(task).is_err() {
                        break;
                    }
                }
            });

            // Reassemble by grid index so the commit sees canonical order.
            // On failure the smallest failing index is reported, keeping the
            // error deterministic regardless of worker interleaving.
            let mut slots: Vec<Option<ScanRecord>> = vec![None; total];
            let mut failure: Option<(usize, ScanError)> = None;
            for (index, outcome) in result_rx.iter() {
                match outcome {
                    Ok(record) => slots[index] = Some(record),
                    Err(err) => {
                        if failure.as_ref().is_none_or(|(first, _)| index < *first) {
                            failure = Some((index, err));
                        }
                    }
                }
            }

            match failure {
                Some((_, err)) => Err(err),
                None => Ok(slots
                    .into_iter()
                    .map(|slot| slot.expect("every grid index produced a record"))
                    .collect()),
            }
        })
    }

    fn scan_direction(
        &self,
        provider: &dyn GeometryProvider,
        envelope: &dyn Envelope,
        sample: &DirectionSample,
    ) -> Result<ScanRecord> {
        let segment = cast_to_boundary(envelope, DVec3::ZERO, sample.direction).map_err(|_| {
            ScanError::Geometry(format!(
                "no envelope intersection for {} = {}, phi = {}",
                self.config.angle_def, sample.angle, sample.phi
            ))
        })?;
        log::debug!(
            "material between {:?} and {:?} <=> {} = {}, phi = {}",
            segment.origin,
            segment.end,
            self.config.angle_def,
            sample.angle,
            sample.phi
        );
        Ok(accumulate(provider, &segment, sample.angle, sample.phi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AngleDef;
    use crate::geometry::Material;
    use crate::sink::MemorySink;
    use std::f64::consts::PI;

    /// Sphere centered at the scan origin.
    struct SphereEnvelope {
        radius: f64,
    }

    impl Envelope for SphereEnvelope {
        fn distance_from_inside(&self, origin: DVec3, _direction: DVec3) -> f64 {
            if origin.length() < self.radius {
                self.radius - origin.length()
            } else {
                0.0
            }
        }

        fn distance_from_outside(&self, _origin: DVec3, _direction: DVec3) -> f64 {
            f64::INFINITY
        }
    }

    /// Sphere filled with a single homogeneous material.
    struct UniformProvider {
        envelope_name: String,
        envelope: SphereEnvelope,
        material: Material,
    }

    impl UniformProvider {
        fn sphere(radius: f64, material: Material) -> Self {
            Self {
                envelope_name: "world".to_string(),
                envelope: SphereEnvelope { radius },
                material,
            }
        }
    }

    impl GeometryProvider for UniformProvider {
        fn envelope(&self, name: &str) -> Option<&dyn Envelope> {
            (name == self.envelope_name).then_some(&self.envelope as &dyn Envelope)
        }

        fn materials_between(&self, p0: DVec3, p1: DVec3) -> Vec<(Material, f64)> {
            vec![(self.material.clone(), p0.distance(p1))]
        }
    }

    /// Splits every segment into two layers of different materials.
    struct LayeredProvider {
        envelope: SphereEnvelope,
        inner: Material,
        outer: Material,
    }

    impl GeometryProvider for LayeredProvider {
        fn envelope(&self, name: &str) -> Option<&dyn Envelope> {
            (name == "world").then_some(&self.envelope as &dyn Envelope)
        }

        fn materials_between(&self, p0: DVec3, p1: DVec3) -> Vec<(Material, f64)> {
            let length = p0.distance(p1);
            vec![
                (self.inner.clone(), 0.5 * length),
                (self.outer.clone(), 0.5 * length),
            ]
        }
    }

    /// Envelope that refuses rays into the lower hemisphere.
    struct HalfBrokenEnvelope {
        radius: f64,
    }

    impl Envelope for HalfBrokenEnvelope {
        fn distance_from_inside(&self, _origin: DVec3, direction: DVec3) -> f64 {
            if direction.z < 0.0 { 0.0 } else { self.radius }
        }

        fn distance_from_outside(&self, _origin: DVec3, _direction: DVec3) -> f64 {
            0.0
        }
    }

    struct HalfBrokenProvider {
        envelope: HalfBrokenEnvelope,
        material: Material,
    }

    impl GeometryProvider for HalfBrokenProvider {
        fn envelope(&self, name: &str) -> Option<&dyn Envelope> {
            (name == "world").then_some(&self.envelope as &dyn Envelope)
        }

        fn materials_between(&self, p0: DVec3, p1: DVec3) -> Vec<(Material, f64)> {
            vec![(self.material.clone(), p0.distance(p1))]
        }
    }

    fn theta_rad_options() -> ScanOptions {
        ScanOptions::new()
            .angle_def(AngleDef::ThetaRad)
            .angle_min(0.0)
            .angle_max(PI)
            .angle_binning(PI / 2.0)
            .n_phi(1)
    }

    #[test]
    fn test_sphere_scan_end_to_end() {
        let _ = env_logger::builder().is_test(true).try_init();
        let provider = UniformProvider::sphere(10.0, Material::new("Iron", 5.0, 20.0));
        let mut scan = MaterialScan::new(theta_rad_options()).unwrap();
        let mut sink = MemorySink::new();

        let summary = scan.run(&provider, &mut sink).unwrap();
        assert_eq!(scan.state(), ScanState::Completed);
        assert_eq!(summary.records, 2);
        assert_eq!(summary.distinct_materials, 1);

        for record in sink.records() {
            assert_eq!(record.material_count(), 1);
            let contribution = &record.contributions[0];
            assert!((contribution.path_length - 10.0).abs() < 1e-9);
            assert!((contribution.num_radiation_lengths - 2.0).abs() < 1e-9);
            assert!((contribution.num_interaction_lengths - 0.5).abs() < 1e-9);
        }
        assert!((sink.records()[0].angle - PI / 4.0).abs() < 1e-12);
        assert!((sink.records()[1].angle - 3.0 * PI / 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_record_count_matches_grid() {
        let provider = UniformProvider::sphere(3.0, Material::new("Air", 30423.0, 71010.0));
        let options = ScanOptions::new()
            .angle_def(AngleDef::ThetaRad)
            .angle_min(0.2)
            .angle_max(3.0)
            .angle_binning(0.25)
            .n_phi(6);
        let mut scan = MaterialScan::new(options).unwrap();
        let mut sink = MemorySink::new();

        let summary = scan.run(&provider, &mut sink).unwrap();
        let expected = DirectionGrid::new(scan.config()).len();
        assert_eq!(summary.records, expected);
        assert_eq!(sink.records().len(), expected);
    }

    #[test]
    fn test_path_lengths_sum_to_segment_length() {
        let provider = LayeredProvider {
            envelope: SphereEnvelope { radius: 8.0 },
            inner: Material::new("Silicon", 93.7, 465.2),
            outer: Material::new("Aluminium", 89.0, 397.0),
        };
        let mut scan = MaterialScan::new(theta_rad_options()).unwrap();
        let mut sink = MemorySink::new();
        scan.run(&provider, &mut sink).unwrap();

        for record in sink.records() {
            assert_eq!(record.material_count(), 2);
            // segment spans the sphere radius
            let relative = (record.total_path_length() - 8.0).abs() / 8.0;
            assert!(relative < 1e-6);
        }
    }

    #[test]
    fn test_unknown_envelope_fails() {
        let provider = UniformProvider {
            envelope_name: "tracker".to_string(),
            envelope: SphereEnvelope { radius: 1.0 },
            material: Material::new("Air", 30423.0, 71010.0),
        };
        let mut scan = MaterialScan::new(theta_rad_options()).unwrap();
        let mut sink = MemorySink::new();

        let result = scan.run(&provider, &mut sink);
        assert!(matches!(result, Err(ScanError::Geometry(_))));
        assert_eq!(scan.state(), ScanState::Failed);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_geometry_failure_commits_nothing() {
        let provider = HalfBrokenProvider {
            envelope: HalfBrokenEnvelope { radius: 5.0 },
            material: Material::new("Iron", 1.757, 16.77),
        };
        // grid covers both hemispheres; the downward direction fails
        let mut scan = MaterialScan::new(theta_rad_options()).unwrap();
        let mut sink = MemorySink::new();

        let result = scan.run(&provider, &mut sink);
        assert!(matches!(result, Err(ScanError::Geometry(_))));
        assert_eq!(scan.state(), ScanState::Failed);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_geometry_failure_leaves_no_output_file() {
        let provider = HalfBrokenProvider {
            envelope: HalfBrokenEnvelope { radius: 5.0 },
            material: Material::new("Iron", 1.757, 16.77),
        };
        let path =
            std::env::temp_dir().join(format!("matscan-aborted-{}.jsonl", std::process::id()));
        let mut scan = MaterialScan::new(theta_rad_options()).unwrap();
        let mut sink = JsonLinesSink::new(&path);

        assert!(scan.run(&provider, &mut sink).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_parallel_matches_serial() {
        let provider = LayeredProvider {
            envelope: SphereEnvelope { radius: 4.0 },
            inner: Material::new("Silicon", 93.7, 465.2),
            outer: Material::new("Air", 30423.0, 71010.0),
        };
        let options = ScanOptions::new()
            .angle_def(AngleDef::ThetaRad)
            .angle_min(0.1)
            .angle_max(3.0)
            .angle_binning(0.2)
            .n_phi(5);

        let mut serial_sink = MemorySink::new();
        MaterialScan::new(options.clone())
            .unwrap()
            .run(&provider, &mut serial_sink)
            .unwrap();

        let mut parallel_sink = MemorySink::new();
        MaterialScan::new(options)
            .unwrap()
            .run_parallel(&provider, &mut parallel_sink, 4)
            .unwrap();

        assert_eq!(serial_sink.records(), parallel_sink.records());
    }

    #[test]
    fn test_parallel_failure_commits_nothing() {
        let provider = HalfBrokenProvider {
            envelope: HalfBrokenEnvelope { radius: 5.0 },
            material: Material::new("Iron", 1.757, 16.77),
        };
        let mut scan = MaterialScan::new(theta_rad_options()).unwrap();
        let mut sink = MemorySink::new();

        let result = scan.run_parallel(&provider, &mut sink, 3);
        assert!(matches!(result, Err(ScanError::Geometry(_))));
        assert_eq!(scan.state(), ScanState::Failed);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_run_to_file_writes_configured_filename() {
        let path =
            std::env::temp_dir().join(format!("matscan-run-{}.jsonl", std::process::id()));
        let provider = UniformProvider::sphere(10.0, Material::new("Iron", 5.0, 20.0));
        let mut scan =
            MaterialScan::new(theta_rad_options().filename(path.to_string_lossy().to_string()))
                .unwrap();

        let summary = scan.run_to_file(&provider).unwrap();
        assert_eq!(summary.records, 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_run_to_file_requires_filename() {
        let provider = UniformProvider::sphere(1.0, Material::new("Air", 30423.0, 71010.0));
        let mut scan = MaterialScan::new(theta_rad_options()).unwrap();
        assert!(matches!(
            scan.run_to_file(&provider),
            Err(ScanError::Configuration(_))
        ));
    }

    #[test]
    fn test_state_transitions() {
        let scan = MaterialScan::new(ScanOptions::new()).unwrap();
        assert_eq!(scan.state(), ScanState::Configured);

        let provider = UniformProvider::sphere(1.0, Material::new("Air", 30423.0, 71010.0));
        let mut scan = MaterialScan::new(theta_rad_options()).unwrap();
        let mut sink = MemorySink::new();
        scan.run(&provider, &mut sink).unwrap();
        assert_eq!(scan.state(), ScanState::Completed);
    }

    #[test]
    fn test_invalid_options_never_configure() {
        let result = MaterialScan::new(ScanOptions::new().n_phi(0));
        assert!(matches!(result, Err(ScanError::Configuration(_))));
    }
}
