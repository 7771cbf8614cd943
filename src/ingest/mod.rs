//! Ingestion of raw assay readings into typed sample intervals.
//!
//! Lab exports arrive as text: `1.25 g/t`, `<0.005 ppm`, `12%`, `-`. This
//! module parses them into [`Measurement`]s, canonicalises unit symbols and
//! validates each hole's samples before any geometry is computed.
//!
//! # Example
//!
//! ```
//! use drillhole_compute::ingest::{parse_reading, BelowDetectionPolicy};
//!
//! let m = parse_reading("<0.01 PPM", BelowDetectionPolicy::HalfLimit).unwrap();
//! assert_eq!(m.value, Some(0.005));
//! assert_eq!(m.unit.unwrap().0, "ppm");
//! ```

pub mod parser;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use parser::{ParsedReading, Qualifier};

use crate::error::{HoleError, ReadingError};
use crate::models::{HoleId, Measurement, SampleInterval, Unit};

/// How a below-detection reading (`<x`) becomes a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BelowDetectionPolicy {
    /// Treat as missing
    Null,
    /// Half the detection limit
    #[default]
    HalfLimit,
    /// The detection limit itself
    Limit,
}

/// Map a unit symbol to its canonical spelling. Unknown symbols are kept as
/// written.
pub fn canonical_unit(symbol: &str) -> Unit {
    let symbol = symbol.trim();
    let canonical = match symbol.to_ascii_lowercase().as_str() {
        "ppm" | "mg/kg" => "ppm",
        "ppb" | "ug/kg" => "ppb",
        "g/t" | "gpt" | "g/tonne" => "g/t",
        "kg/t" => "kg/t",
        "oz/t" | "opt" => "oz/t",
        "%" | "pct" | "percent" | "wt%" => "%",
        "m" | "metre" | "metres" | "meter" | "meters" => "m",
        "ft" | "feet" => "ft",
        _ => symbol,
    };
    Unit(canonical.to_string())
}

/// Parse one textual reading into a measurement.
pub fn parse_reading(text: &str, policy: BelowDetectionPolicy) -> Result<Measurement, ReadingError> {
    let parsed = parser::parse(text)?;
    let value = match (parsed.qualifier, parsed.value) {
        (Some(Qualifier::BelowDetection), Some(limit)) => match policy {
            BelowDetectionPolicy::Null => None,
            BelowDetectionPolicy::HalfLimit => Some(limit / 2.0),
            BelowDetectionPolicy::Limit => Some(limit),
        },
        (_, value) => value,
    };
    Ok(Measurement {
        value,
        unit: parsed.unit.map(canonical_unit),
    })
}

/// A sample interval as exported by the host application, with readings
/// still in text form.
#[derive(Clone, Debug, PartialEq)]
pub struct RawSample {
    pub hole_id: String,
    pub from: f64,
    pub to: f64,
    pub readings: BTreeMap<String, String>,
}

impl RawSample {
    pub fn new(hole_id: impl Into<String>, from: f64, to: f64) -> Self {
        RawSample {
            hole_id: hole_id.into(),
            from,
            to,
            readings: BTreeMap::new(),
        }
    }

    pub fn with_reading(mut self, field: impl Into<String>, text: impl Into<String>) -> Self {
        self.readings.insert(field.into(), text.into());
        self
    }

    /// Parse every reading. Depth ordering is left to the interval locator,
    /// which reports bad intervals individually.
    pub fn ingest(&self, policy: BelowDetectionPolicy) -> Result<SampleInterval, ReadingError> {
        let mut values = BTreeMap::new();
        for (field, text) in &self.readings {
            let field = field.trim();
            if field.is_empty() {
                return Err(ReadingError::EmptyFieldName);
            }
            values.insert(field.to_string(), parse_reading(text, policy)?);
        }
        Ok(SampleInterval {
            hole_id: HoleId(self.hole_id.clone()),
            from: self.from,
            to: self.to,
            values,
        })
    }
}

/// Validate the samples of one hole: field names must be non-empty, values
/// finite, and every field must use a single unit across the hole.
pub fn validate_samples(samples: &[SampleInterval]) -> Result<(), HoleError> {
    for sample in samples {
        for (field, measurement) in &sample.values {
            if field.trim().is_empty() {
                return Err(ReadingError::EmptyFieldName.into());
            }
            if let Some(v) = measurement.value {
                if !v.is_finite() {
                    return Err(ReadingError::NonFinite {
                        field: field.clone(),
                        value: v,
                    }
                    .into());
                }
            }
        }
    }
    check_unit_consistency(samples)
}

/// Every field must be reported in one unit per hole. Measurements without a
/// unit are compatible with any unit.
pub fn check_unit_consistency(samples: &[SampleInterval]) -> Result<(), HoleError> {
    let mut seen: BTreeMap<&str, &Unit> = BTreeMap::new();
    for sample in samples {
        for (field, measurement) in &sample.values {
            let Some(unit) = measurement.unit.as_ref() else {
                continue;
            };
            match seen.get(field.as_str()) {
                Some(expected) if *expected != unit => {
                    return Err(HoleError::InconsistentUnits {
                        field: field.clone(),
                        expected: expected.to_string(),
                        found: unit.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    seen.insert(field.as_str(), unit);
                }
            }
        }
    }
    Ok(())
}
