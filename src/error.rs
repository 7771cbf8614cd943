use thiserror::Error;

/// Error raised while processing a single hole.
///
/// These never abort a batch; the orchestrator records them against the hole
/// that produced them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HoleError {
    #[error("invalid survey data: {0}")]
    InvalidSurveyData(String),

    #[error("depth range [{from}, {to}] outside trajectory coverage [0, {max_depth}]")]
    DepthOutOfRange { from: f64, to: f64, max_depth: f64 },

    #[error("inconsistent units for field {field}: expected {expected}, found {found}")]
    InconsistentUnits {
        field: String,
        expected: String,
        found: String,
    },

    #[error("invalid sample data: {0}")]
    InvalidSampleData(String),

    #[error("hole has no usable sample intervals")]
    EmptyInput,

    #[error("{what} would produce {requested} entries, limit is {limit}")]
    LimitExceeded {
        what: String,
        requested: f64,
        limit: usize,
    },

    #[error("hole id {0} appears more than once in the batch")]
    DuplicateHoleId(String),
}

impl HoleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HoleError::InvalidSurveyData(_) => ErrorKind::InvalidSurveyData,
            HoleError::DepthOutOfRange { .. } => ErrorKind::DepthOutOfRange,
            HoleError::InconsistentUnits { .. } => ErrorKind::InconsistentUnits,
            HoleError::InvalidSampleData(_) => ErrorKind::InvalidSampleData,
            HoleError::EmptyInput => ErrorKind::EmptyInput,
            HoleError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            HoleError::DuplicateHoleId(_) => ErrorKind::DuplicateHoleId,
        }
    }

    pub(crate) fn point_out_of_range(depth: f64, max_depth: f64) -> Self {
        HoleError::DepthOutOfRange {
            from: depth,
            to: depth,
            max_depth,
        }
    }
}

impl From<ReadingError> for HoleError {
    fn from(err: ReadingError) -> Self {
        HoleError::InvalidSampleData(err.to_string())
    }
}

/// Stable classification of [`HoleError`] used in batch reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    InvalidSurveyData,
    DepthOutOfRange,
    InconsistentUnits,
    InvalidSampleData,
    EmptyInput,
    LimitExceeded,
    DuplicateHoleId,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InvalidSurveyData => "invalid_survey_data",
            ErrorKind::DepthOutOfRange => "depth_out_of_range",
            ErrorKind::InconsistentUnits => "inconsistent_units",
            ErrorKind::InvalidSampleData => "invalid_sample_data",
            ErrorKind::EmptyInput => "empty_input",
            ErrorKind::LimitExceeded => "limit_exceeded",
            ErrorKind::DuplicateHoleId => "duplicate_hole_id",
        }
    }
}

/// Configuration errors. Fatal: surfaced before any hole is processed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required option {field}: {message}")]
    Missing { field: String, message: String },

    #[error("invalid value for {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("failed to parse configuration {path}: {message}")]
    Parse { path: String, message: String },
}

/// Error raised while ingesting raw textual readings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReadingError {
    #[error("malformed reading '{input}' at position {position}")]
    Malformed { input: String, position: usize },

    #[error("non-finite value {value} for field {field}")]
    NonFinite { field: String, value: f64 },

    #[error("empty field name")]
    EmptyFieldName,
}
