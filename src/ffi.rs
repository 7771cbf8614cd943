//! Foreign-function surface for host applications.
//!
//! Records here mirror the native types using only uniffi-compatible shapes
//! (`HashMap`, `Vec`, `Option`, plain numbers and strings). Readings cross the
//! boundary as text and are ingested on this side.

use std::collections::HashMap;

use crate::analysis::Analyzer;
use crate::config::AnalysisConfig;
use crate::error::{ConfigError, HoleError};
use crate::ingest::RawSample;
use crate::locate::IntervalFailure;
use crate::models::{CompositeInterval, Hole, Point3, SurveyStation};
use crate::report::{BatchReport, HoleOutcome};
use crate::survey::Trajectory;

// ============================================================================
// FFI Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStation {
    pub depth: f64,
    pub azimuth: f64,
    pub dip: f64,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSample {
    pub from: f64,
    pub to: f64,
    /// Field name to reading text, e.g. `"au" -> "<0.01 g/t"`
    pub readings: HashMap<String, String>,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHole {
    pub id: String,
    pub collar: FfiPoint,
    pub stations: Vec<FfiStation>,
    pub total_depth: Option<f64>,
    pub samples: Vec<FfiSample>,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiComposite {
    pub from: f64,
    pub to: f64,
    pub values: HashMap<String, Option<f64>>,
    pub sample_count: u32,
    pub covered_length: f64,
    pub start: FfiPoint,
    pub end: FfiPoint,
    pub midpoint: FfiPoint,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSkippedInterval {
    pub from: f64,
    pub to: f64,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiHoleOutcome {
    Success {
        composites: Vec<FfiComposite>,
        skipped_intervals: Vec<FfiSkippedInterval>,
    },
    Failure {
        kind: String,
        message: String,
    },
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHoleResult {
    pub hole_id: String,
    pub outcome: FfiHoleOutcome,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBatchReport {
    pub holes: Vec<FfiHoleResult>,
    pub succeeded: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiTrajectoryPoint {
    pub depth: f64,
    pub position: FfiPoint,
}

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FfiError {
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("{kind}: {message}")]
    Hole { kind: String, message: String },
}

impl From<ConfigError> for FfiError {
    fn from(err: ConfigError) -> Self {
        FfiError::Config {
            message: err.to_string(),
        }
    }
}

impl From<HoleError> for FfiError {
    fn from(err: HoleError) -> Self {
        FfiError::Hole {
            kind: err.kind().code().to_string(),
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<Point3> for FfiPoint {
    fn from(p: Point3) -> Self {
        FfiPoint {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }
}

impl From<&FfiPoint> for Point3 {
    fn from(p: &FfiPoint) -> Self {
        Point3::new(p.x, p.y, p.z)
    }
}

impl FfiHole {
    fn to_hole(&self) -> Hole {
        Hole {
            id: crate::models::HoleId(self.id.clone()),
            collar: Point3::from(&self.collar),
            stations: self
                .stations
                .iter()
                .map(|s| SurveyStation::new(s.depth, s.azimuth, s.dip))
                .collect(),
            total_depth: self.total_depth,
        }
    }

    fn raw_samples(&self) -> Vec<RawSample> {
        self.samples
            .iter()
            .map(|s| RawSample {
                hole_id: self.id.clone(),
                from: s.from,
                to: s.to,
                readings: s.readings.clone().into_iter().collect(),
            })
            .collect()
    }
}

impl From<CompositeInterval> for FfiComposite {
    fn from(c: CompositeInterval) -> Self {
        FfiComposite {
            from: c.from,
            to: c.to,
            values: c.values.into_iter().collect(),
            sample_count: c.sample_count,
            covered_length: c.covered_length,
            start: c.start.into(),
            end: c.end.into(),
            midpoint: c.midpoint.into(),
        }
    }
}

impl From<IntervalFailure> for FfiSkippedInterval {
    fn from(f: IntervalFailure) -> Self {
        FfiSkippedInterval {
            from: f.from,
            to: f.to,
            kind: f.error.kind().code().to_string(),
            message: f.error.to_string(),
        }
    }
}

impl From<BatchReport> for FfiBatchReport {
    fn from(report: BatchReport) -> Self {
        let summary = report.summary();
        let holes = report
            .holes
            .into_iter()
            .map(|h| FfiHoleResult {
                hole_id: h.hole_id.0,
                outcome: match h.outcome {
                    HoleOutcome::Success(success) => FfiHoleOutcome::Success {
                        composites: success.composites.into_iter().map(Into::into).collect(),
                        skipped_intervals: success
                            .skipped_intervals
                            .into_iter()
                            .map(Into::into)
                            .collect(),
                    },
                    HoleOutcome::Failure(failure) => FfiHoleOutcome::Failure {
                        kind: failure.kind.code().to_string(),
                        message: failure.message,
                    },
                },
            })
            .collect();
        FfiBatchReport {
            holes,
            succeeded: summary.succeeded as u64,
            failed: summary.failed as u64,
        }
    }
}

// ============================================================================
// Exported functions
// ============================================================================

/// Validate a TOML configuration document.
#[uniffi::export]
pub fn validate_config(config_toml: String) -> Result<(), FfiError> {
    AnalysisConfig::from_toml(&config_toml)?;
    Ok(())
}

/// Run a batch. Configuration errors fail the call; hole errors are
/// reported per hole.
#[uniffi::export]
pub fn analyze_holes(holes: Vec<FfiHole>, config_toml: String) -> Result<FfiBatchReport, FfiError> {
    let config = AnalysisConfig::from_toml(&config_toml)?;
    let analyzer = Analyzer::new(config)?;
    let cache = analyzer.new_cache();

    let input = holes
        .iter()
        .map(|h| (h.to_hole(), h.raw_samples()))
        .collect();
    Ok(analyzer.run_raw(input, &cache).into())
}

/// Trajectory points every `step` depth units, for display.
#[uniffi::export]
pub fn desurvey_hole(
    hole: FfiHole,
    step: f64,
    config_toml: String,
) -> Result<Vec<FfiTrajectoryPoint>, FfiError> {
    let config: AnalysisConfig = toml::from_str(&config_toml).map_err(|e| FfiError::Config {
        message: e.to_string(),
    })?;
    let trajectory = Trajectory::resolve(
        &hole.to_hole(),
        config.effective_desurvey_method(),
        config.effective_dip_convention(),
    )?;
    Ok(trajectory
        .polyline(step)?
        .into_iter()
        .map(|(depth, position)| FfiTrajectoryPoint {
            depth,
            position: position.into(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ffi_hole(id: &str, stations: Vec<FfiStation>) -> FfiHole {
        FfiHole {
            id: id.to_string(),
            collar: FfiPoint {
                x: 0.0,
                y: 0.0,
                z: 0.0,
            },
            stations,
            total_depth: None,
            samples: vec![FfiSample {
                from: 0.0,
                to: 10.0,
                readings: HashMap::from([("au".to_string(), "2.5 g/t".to_string())]),
            }],
        }
    }

    fn vertical(depth: f64) -> Vec<FfiStation> {
        vec![
            FfiStation {
                depth: 0.0,
                azimuth: 0.0,
                dip: -90.0,
            },
            FfiStation {
                depth,
                azimuth: 0.0,
                dip: -90.0,
            },
        ]
    }

    #[test]
    fn test_analyze_holes() {
        let holes = vec![
            ffi_hole("DH-1", vertical(10.0)),
            ffi_hole("DH-2", vec![]),
        ];

        let report = analyze_holes(holes, "composite_length = 5.0".to_string()).unwrap();

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        match &report.holes[0].outcome {
            FfiHoleOutcome::Success { composites, .. } => {
                assert_eq!(composites.len(), 2);
                assert_eq!(composites[0].values["au"], Some(2.5));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        match &report.holes[1].outcome {
            FfiHoleOutcome::Failure { kind, .. } => assert_eq!(kind, "invalid_survey_data"),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_config_error_fails_call() {
        let result = analyze_holes(vec![], r#"compositing_mode = "domain_bounded""#.to_string());
        assert!(matches!(result, Err(FfiError::Config { .. })));
        assert!(validate_config("composite_length = 1.0".to_string()).is_ok());
    }

    #[test]
    fn test_desurvey_hole_polyline() {
        let points = desurvey_hole(ffi_hole("DH-1", vertical(10.0)), 5.0, String::new()).unwrap();

        assert_eq!(points.len(), 3);
        assert!((points[2].position.z + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_desurvey_hole_tiny_step_is_error() {
        let result = desurvey_hole(ffi_hole("DH-1", vertical(100.0)), 1e-300, String::new());

        match result {
            Err(FfiError::Hole { kind, .. }) => assert_eq!(kind, "limit_exceeded"),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_analyze_holes_tiny_length_fails_per_hole() {
        let holes = vec![ffi_hole("DH-1", vertical(10.0)), ffi_hole("DH-2", vertical(10.0))];

        let report = analyze_holes(holes, "composite_length = 1e-300".to_string()).unwrap();

        assert_eq!(report.failed, 2);
        for hole in &report.holes {
            assert!(matches!(
                &hole.outcome,
                FfiHoleOutcome::Failure { kind, .. } if kind == "limit_exceeded"
            ));
        }
    }
}
