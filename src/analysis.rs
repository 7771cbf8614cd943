//! Batch orchestration: desurvey, locate and composite every hole.
//!
//! Holes are independent and run in parallel on a dedicated worker pool.
//! Within a hole the steps run in order. Any [`HoleError`] is caught at the
//! hole boundary and recorded in the [`BatchReport`]; it never affects other
//! holes. Configuration problems are reported by [`Analyzer::new`] before any
//! hole is touched.

use std::time::Instant;

use rayon::prelude::*;

use crate::cache::TrajectoryCache;
use crate::composite::{composite, CompositeOptions};
use crate::config::AnalysisConfig;
use crate::error::{ConfigError, HoleError};
use crate::ingest::{self, RawSample};
use crate::locate::locate_all;
use crate::models::{Hole, HoleRecord, SampleInterval};
use crate::report::{BatchReport, HoleFailure, HoleOutcome, HoleReport, HoleSuccess};

pub struct Analyzer {
    config: AnalysisConfig,
    options: CompositeOptions,
    pool: rayon::ThreadPool,
}

impl Analyzer {
    /// Validate `config` and build the worker pool.
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let options = config.composite_options()?;

        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("hole-worker-{}", i));
        if let Some(threads) = config.threads {
            builder = builder.num_threads(threads);
        }
        let pool = builder.build().map_err(|e| ConfigError::Invalid {
            field: "threads".to_string(),
            message: e.to_string(),
        })?;

        Ok(Analyzer {
            config,
            options,
            pool,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// A cache sized by the configured capacity.
    pub fn new_cache(&self) -> TrajectoryCache {
        TrajectoryCache::new(self.config.effective_cache_capacity())
    }

    /// Analyze a batch. The report lists the holes in input order.
    pub fn run(&self, records: &[HoleRecord], cache: &TrajectoryCache) -> BatchReport {
        let started = Instant::now();
        tracing::info!(
            holes = records.len(),
            mode = ?self.config.effective_compositing_mode(),
            method = self.config.effective_desurvey_method().label(),
            "starting hole analysis batch"
        );

        let holes: Vec<HoleReport> = self.pool.install(|| {
            records
                .par_iter()
                .map(|record| self.analyze_hole(record, cache))
                .collect()
        });
        let report = BatchReport::new(holes);

        let summary = report.summary();
        tracing::info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            composites = summary.composites,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "hole analysis batch complete"
        );
        report
    }

    /// Group flat hole and sample lists, then analyze them. A hole reusing an
    /// earlier hole's id fails with [`HoleError::DuplicateHoleId`].
    pub fn run_grouped(
        &self,
        holes: Vec<Hole>,
        samples: Vec<SampleInterval>,
        cache: &TrajectoryCache,
    ) -> BatchReport {
        let grouped = HoleRecord::group(holes, samples);
        if grouped.orphan_samples > 0 {
            tracing::warn!(
                orphans = grouped.orphan_samples,
                "samples reference holes missing from the batch"
            );
        }

        let rejected = grouped
            .duplicates
            .iter()
            .map(|(position, hole)| {
                let err = HoleError::DuplicateHoleId(hole.id.to_string());
                tracing::warn!(hole_id = %hole.id, position, "duplicate hole id");
                (*position, failure_report(hole, &err))
            })
            .collect();

        let analyzed = self.run(&grouped.records, cache);
        let mut report = merge_in_order(grouped.positions, analyzed, rejected);
        report.orphan_samples = grouped.orphan_samples;
        report
    }

    /// Ingest textual readings with the configured below-detection policy.
    /// A hole whose readings cannot be parsed fails on its own.
    pub fn run_raw(
        &self,
        holes: Vec<(Hole, Vec<RawSample>)>,
        cache: &TrajectoryCache,
    ) -> BatchReport {
        let policy = self.config.effective_below_detection();
        let mut records = Vec::with_capacity(holes.len());
        let mut positions = Vec::with_capacity(holes.len());
        let mut rejected = Vec::new();

        for (position, (hole, raw)) in holes.into_iter().enumerate() {
            let ingested: Result<Vec<SampleInterval>, _> =
                raw.iter().map(|r| r.ingest(policy)).collect();
            match ingested {
                Ok(samples) => {
                    positions.push(position);
                    records.push(HoleRecord::new(hole, samples));
                }
                Err(err) => {
                    let err = HoleError::from(err);
                    tracing::warn!(hole_id = %hole.id, error = %err, "failed to ingest readings");
                    rejected.push((position, failure_report(&hole, &err)));
                }
            }
        }

        let analyzed = self.run(&records, cache);
        merge_in_order(positions, analyzed, rejected)
    }

    /// Analyze a single hole, capturing any error in the report.
    pub fn analyze_hole(&self, record: &HoleRecord, cache: &TrajectoryCache) -> HoleReport {
        match self.process(record, cache) {
            Ok(success) => {
                tracing::debug!(
                    hole_id = %record.hole.id,
                    composites = success.composites.len(),
                    skipped = success.skipped_intervals.len(),
                    "hole composited"
                );
                HoleReport {
                    hole_id: record.hole.id.clone(),
                    outcome: HoleOutcome::Success(success),
                }
            }
            Err(err) => {
                tracing::warn!(
                    hole_id = %record.hole.id,
                    kind = err.kind().code(),
                    error = %err,
                    "hole analysis failed"
                );
                failure_report(&record.hole, &err)
            }
        }
    }

    fn process(
        &self,
        record: &HoleRecord,
        cache: &TrajectoryCache,
    ) -> Result<HoleSuccess, HoleError> {
        let hole = &record.hole;
        if record.samples.is_empty() {
            return Err(HoleError::EmptyInput);
        }
        if let Some(stray) = record.samples.iter().find(|s| s.hole_id != hole.id) {
            return Err(HoleError::InvalidSampleData(format!(
                "sample [{}, {}] belongs to hole {}, not {}",
                stray.from, stray.to, stray.hole_id, hole.id
            )));
        }
        ingest::validate_samples(&record.samples)?;

        let trajectory = cache.get_or_resolve(
            hole,
            self.config.effective_desurvey_method(),
            self.config.effective_dip_convention(),
        )?;

        let (located, skipped) = locate_all(&trajectory, &record.samples);
        for failure in &skipped {
            tracing::debug!(
                hole_id = %hole.id,
                from = failure.from,
                to = failure.to,
                error = %failure.error,
                "sample interval skipped"
            );
        }

        let composites = composite(&hole.id, &trajectory, &located, &self.options)?;
        Ok(HoleSuccess {
            composites,
            skipped_intervals: skipped,
        })
    }
}

/// Interleave analyzed holes with holes rejected before analysis, restoring
/// input order.
fn merge_in_order(
    positions: Vec<usize>,
    analyzed: BatchReport,
    rejected: Vec<(usize, HoleReport)>,
) -> BatchReport {
    let mut holes: Vec<(usize, HoleReport)> = positions.into_iter().zip(analyzed.holes).collect();
    holes.extend(rejected);
    holes.sort_by_key(|(position, _)| *position);
    BatchReport::new(holes.into_iter().map(|(_, report)| report).collect())
}

fn failure_report(hole: &Hole, err: &HoleError) -> HoleReport {
    HoleReport {
        hole_id: hole.id.clone(),
        outcome: HoleOutcome::Failure(HoleFailure::from(err)),
    }
}
