//! Analysis configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::composite::{CompositeOptions, CompositingStrategy};
use crate::error::ConfigError;
use crate::ingest::BelowDetectionPolicy;
use crate::survey::{DesurveyMethod, DipConvention};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositingMode {
    #[default]
    FixedLength,
    DomainBounded,
}

/// Options recognised by the analyzer. Unset options fall back to the
/// `effective_*` defaults.
///
/// ```toml
/// compositing_mode = "fixed_length"
/// composite_length = 2.0
/// desurvey_method = "minimum_curvature"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Compositing strategy. Default: fixed_length.
    pub compositing_mode: Option<CompositingMode>,
    /// Bin length, required for fixed_length.
    pub composite_length: Option<f64>,
    /// Ordered contact depths, required for domain_bounded.
    pub domain_boundaries: Vec<f64>,
    /// Default: minimum_curvature.
    pub desurvey_method: Option<DesurveyMethod>,
    /// Default: negative_down.
    pub dip_convention: Option<DipConvention>,
    /// Minimum covered fraction of a bin to report values. Default: 0.0.
    pub min_coverage: Option<f64>,
    /// Default: half_limit.
    pub below_detection: Option<BelowDetectionPolicy>,
    /// Worker threads. Default: available parallelism.
    pub threads: Option<usize>,
    /// Maximum cached trajectories. Default: 4096.
    pub cache_capacity: Option<u64>,
}

impl AnalysisConfig {
    pub fn fixed_length(length: f64) -> Self {
        AnalysisConfig {
            compositing_mode: Some(CompositingMode::FixedLength),
            composite_length: Some(length),
            ..Default::default()
        }
    }

    pub fn domain_bounded(boundaries: Vec<f64>) -> Self {
        AnalysisConfig {
            compositing_mode: Some(CompositingMode::DomainBounded),
            domain_boundaries: boundaries,
            ..Default::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config: AnalysisConfig = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn effective_compositing_mode(&self) -> CompositingMode {
        self.compositing_mode.unwrap_or_default()
    }

    pub fn effective_desurvey_method(&self) -> DesurveyMethod {
        self.desurvey_method.unwrap_or_default()
    }

    pub fn effective_dip_convention(&self) -> DipConvention {
        self.dip_convention.unwrap_or_default()
    }

    pub fn effective_min_coverage(&self) -> f64 {
        self.min_coverage.unwrap_or(0.0)
    }

    pub fn effective_below_detection(&self) -> BelowDetectionPolicy {
        self.below_detection.unwrap_or_default()
    }

    pub fn effective_cache_capacity(&self) -> u64 {
        self.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY)
    }

    /// Build the compositing strategy selected by `compositing_mode`.
    pub fn strategy(&self) -> Result<CompositingStrategy, ConfigError> {
        let strategy = match self.effective_compositing_mode() {
            CompositingMode::FixedLength => {
                let length = self.composite_length.ok_or_else(|| ConfigError::Missing {
                    field: "composite_length".to_string(),
                    message: "required when compositing_mode is fixed_length".to_string(),
                })?;
                CompositingStrategy::FixedLength { length }
            }
            CompositingMode::DomainBounded => {
                if self.domain_boundaries.is_empty() {
                    return Err(ConfigError::Missing {
                        field: "domain_boundaries".to_string(),
                        message: "required when compositing_mode is domain_bounded".to_string(),
                    });
                }
                CompositingStrategy::DomainBounded {
                    boundaries: self.domain_boundaries.clone(),
                }
            }
        };
        strategy.validate()?;
        Ok(strategy)
    }

    pub fn composite_options(&self) -> Result<CompositeOptions, ConfigError> {
        Ok(CompositeOptions {
            strategy: self.strategy()?,
            min_coverage: self.effective_min_coverage(),
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy()?;
        if let Some(coverage) = self.min_coverage {
            if !(0.0..=1.0).contains(&coverage) {
                return Err(ConfigError::Invalid {
                    field: "min_coverage".to_string(),
                    message: "must be between 0.0 and 1.0".to_string(),
                });
            }
        }
        if self.threads == Some(0) {
            return Err(ConfigError::Invalid {
                field: "threads".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        if self.cache_capacity == Some(0) {
            return Err(ConfigError::Invalid {
                field: "cache_capacity".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}
