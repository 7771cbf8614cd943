pub mod analysis;
pub mod cache;
pub mod composite;
pub mod config;
pub mod error;
pub mod ffi;
pub mod ingest;
pub mod locate;
pub mod models;
pub mod report;
pub mod survey;

uniffi::setup_scaffolding!();

pub use analysis::Analyzer;
pub use cache::TrajectoryCache;
pub use composite::{composite, CompositeOptions, CompositingStrategy};
pub use config::{AnalysisConfig, CompositingMode};
pub use error::{ConfigError, ErrorKind, HoleError, ReadingError};
pub use ingest::{BelowDetectionPolicy, RawSample};
pub use locate::{locate, locate_all, IntervalFailure, LocatedInterval};
pub use models::{
    CompositeInterval, GroupedHoles, Hole, HoleId, HoleRecord, Measurement, Point3, SampleInterval,
    SurveyStation, Unit,
};
pub use report::{BatchReport, BatchSummary, HoleFailure, HoleOutcome, HoleReport, HoleSuccess};
pub use survey::{DesurveyMethod, DipConvention, Trajectory};
