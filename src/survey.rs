//! Desurveying: converting directional survey stations into a 3D trajectory.
//!
//! A [`Trajectory`] is built once per hole from the collar coordinate and the
//! ordered survey stations, and answers `depth -> Point3` lookups anywhere in
//! `[0, max_depth]`.
//!
//! # Methods
//!
//! - [`DesurveyMethod::MinimumCurvature`] (default): each segment between two
//!   stations is a circular arc tangent to both station directions. Station
//!   positions use the ratio factor `RF = 2/β · tan(β/2)` where `β` is the
//!   dogleg angle. Depths inside a segment are resolved on the same arc, with
//!   the direction found by spherical interpolation, so a query at a station
//!   depth reproduces the station position exactly.
//! - [`DesurveyMethod::BalancedTangent`]: the first half of each segment runs
//!   along the upper station's direction and the second half along the lower
//!   station's direction.
//!
//! # Example
//!
//! ```
//! use drillhole_compute::models::{Hole, Point3, SurveyStation};
//! use drillhole_compute::survey::{DesurveyMethod, DipConvention, Trajectory};
//!
//! let hole = Hole::new(
//!     "DH-001",
//!     Point3::new(0.0, 0.0, 100.0),
//!     vec![SurveyStation::new(0.0, 0.0, -90.0), SurveyStation::new(100.0, 0.0, -90.0)],
//! );
//! let trajectory =
//!     Trajectory::resolve(&hole, DesurveyMethod::MinimumCurvature, DipConvention::NegativeDown)
//!         .unwrap();
//! let point = trajectory.point_at(40.0).unwrap();
//! assert!((point.z - 60.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::HoleError;
use crate::models::{Hole, Point3, SurveyStation};

/// Slack allowed when comparing query depths to the trajectory range.
pub const DEPTH_TOLERANCE: f64 = 1e-9;

/// Dogleg (radians) below which a segment is treated as straight.
const STRAIGHT_DOGLEG: f64 = 1e-9;

/// Upper bound on the points `Trajectory::polyline` generates.
pub const MAX_POLYLINE_POINTS: usize = 1_000_000;

/// `sin(β)` below which a segment reverses on itself and cannot be fitted
/// with an arc.
const REVERSAL_SIN: f64 = 1e-6;

// ============================================================================
// Options
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesurveyMethod {
    #[default]
    MinimumCurvature,
    BalancedTangent,
}

impl DesurveyMethod {
    pub fn label(&self) -> &'static str {
        match self {
            DesurveyMethod::MinimumCurvature => "minimum_curvature",
            DesurveyMethod::BalancedTangent => "balanced_tangent",
        }
    }
}

/// Sign convention of the dip angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DipConvention {
    /// −90 points straight down (common in mineral exploration)
    #[default]
    NegativeDown,
    /// +90 points straight down
    PositiveDown,
}

impl DipConvention {
    /// Elevation angle in degrees, positive up.
    fn elevation(&self, dip: f64) -> f64 {
        match self {
            DipConvention::NegativeDown => dip,
            DipConvention::PositiveDown => -dip,
        }
    }
}

/// Unit direction vector for a station orientation.
pub fn direction(azimuth: f64, dip: f64, convention: DipConvention) -> Point3 {
    let az = azimuth.to_radians();
    let el = convention.elevation(dip).to_radians();
    Point3::new(el.cos() * az.sin(), el.cos() * az.cos(), el.sin())
}

// ============================================================================
// Trajectory
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
struct Node {
    depth: f64,
    position: Point3,
    direction: Point3,
}

/// Resolved 3D path of a hole. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    method: DesurveyMethod,
    nodes: Vec<Node>,
}

impl Trajectory {
    /// Desurvey a hole.
    ///
    /// Fails with [`HoleError::InvalidSurveyData`] when the hole has no
    /// stations, station depths are not strictly increasing, or any angle is
    /// out of range. A first station below the collar implies the same
    /// orientation from depth 0.
    pub fn resolve(
        hole: &Hole,
        method: DesurveyMethod,
        convention: DipConvention,
    ) -> Result<Self, HoleError> {
        validate_stations(hole)?;

        let stations = &hole.stations;
        let mut nodes = Vec::with_capacity(stations.len() + 2);
        nodes.push(Node {
            depth: 0.0,
            position: hole.collar,
            direction: direction(stations[0].azimuth, stations[0].dip, convention),
        });

        for station in stations.iter().skip_while(|s| s.depth == 0.0) {
            let prev = nodes[nodes.len() - 1];
            let dir = direction(station.azimuth, station.dip, convention);
            let offset = segment_offset(
                method,
                prev.direction,
                dir,
                station.depth - prev.depth,
                1.0,
            );
            nodes.push(Node {
                depth: station.depth,
                position: prev.position + offset,
                direction: dir,
            });
        }

        let last = nodes[nodes.len() - 1];
        if let Some(total_depth) = hole.total_depth {
            if total_depth > last.depth + DEPTH_TOLERANCE {
                nodes.push(Node {
                    depth: total_depth,
                    position: last.position + last.direction * (total_depth - last.depth),
                    direction: last.direction,
                });
            }
        }

        Ok(Trajectory { method, nodes })
    }

    pub fn method(&self) -> DesurveyMethod {
        self.method
    }

    pub fn collar(&self) -> Point3 {
        self.nodes[0].position
    }

    /// Deepest depth the trajectory is defined for.
    pub fn max_depth(&self) -> f64 {
        self.nodes[self.nodes.len() - 1].depth
    }

    pub fn contains(&self, depth: f64) -> bool {
        depth.is_finite() && depth >= -DEPTH_TOLERANCE && depth <= self.max_depth() + DEPTH_TOLERANCE
    }

    /// 3D position at a measured depth.
    pub fn point_at(&self, depth: f64) -> Result<Point3, HoleError> {
        if !self.contains(depth) {
            return Err(HoleError::point_out_of_range(depth, self.max_depth()));
        }
        let depth = depth.clamp(0.0, self.max_depth());

        let idx = self.nodes.partition_point(|n| n.depth <= depth);
        if idx >= self.nodes.len() {
            return Ok(self.nodes[self.nodes.len() - 1].position);
        }
        let upper = self.nodes[idx - 1];
        let lower = self.nodes[idx];
        let length = lower.depth - upper.depth;
        let fraction = (depth - upper.depth) / length;

        Ok(upper.position
            + segment_offset(self.method, upper.direction, lower.direction, length, fraction))
    }

    /// Positions along the hole every `step` depth units, always including
    /// the survey stations and the end of the trajectory. A non-positive step
    /// yields the stations only. Fails with [`HoleError::LimitExceeded`] when
    /// `step` would generate more than [`MAX_POLYLINE_POINTS`] points.
    pub fn polyline(&self, step: f64) -> Result<Vec<(f64, Point3)>, HoleError> {
        let max_depth = self.max_depth();
        let mut depths: Vec<f64> = self.nodes.iter().map(|n| n.depth).collect();
        if step.is_finite() && step > 0.0 {
            let count = (max_depth / step).floor();
            if !count.is_finite() || count > MAX_POLYLINE_POINTS as f64 {
                return Err(HoleError::LimitExceeded {
                    what: format!("polyline step {} over depth {}", step, max_depth),
                    requested: count,
                    limit: MAX_POLYLINE_POINTS,
                });
            }
            depths.extend((1..=count as usize).map(|i| i as f64 * step));
        }
        depths.sort_by(f64::total_cmp);
        depths.dedup_by(|a, b| (*a - *b).abs() <= DEPTH_TOLERANCE);

        Ok(depths
            .into_iter()
            .filter_map(|d| self.point_at(d).ok().map(|p| (d, p)))
            .collect())
    }
}

fn validate_stations(hole: &Hole) -> Result<(), HoleError> {
    if hole.stations.is_empty() {
        return Err(HoleError::InvalidSurveyData(format!(
            "hole {} has no survey stations",
            hole.id
        )));
    }
    if !hole.collar.is_finite() {
        return Err(HoleError::InvalidSurveyData(format!(
            "hole {} has a non-finite collar coordinate",
            hole.id
        )));
    }

    let mut previous: Option<&SurveyStation> = None;
    for station in &hole.stations {
        if !station.depth.is_finite() || station.depth < 0.0 {
            return Err(HoleError::InvalidSurveyData(format!(
                "station depth {} must be a non-negative number",
                station.depth
            )));
        }
        if !(0.0..=360.0).contains(&station.azimuth) {
            return Err(HoleError::InvalidSurveyData(format!(
                "azimuth {} at depth {} outside 0-360",
                station.azimuth, station.depth
            )));
        }
        if !(-90.0..=90.0).contains(&station.dip) {
            return Err(HoleError::InvalidSurveyData(format!(
                "dip {} at depth {} outside -90-90",
                station.dip, station.depth
            )));
        }
        if let Some(prev) = previous {
            if station.depth <= prev.depth {
                return Err(HoleError::InvalidSurveyData(format!(
                    "station depths not strictly increasing: {} follows {}",
                    station.depth, prev.depth
                )));
            }
        }
        previous = Some(station);
    }

    if let Some(total_depth) = hole.total_depth {
        if !total_depth.is_finite() || total_depth < 0.0 {
            return Err(HoleError::InvalidSurveyData(format!(
                "total depth {} must be a non-negative number",
                total_depth
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Segment geometry
// ============================================================================

/// Displacement from the upper station after `fraction` of a segment of
/// `length` running from direction `t1` to `t2`.
fn segment_offset(
    method: DesurveyMethod,
    t1: Point3,
    t2: Point3,
    length: f64,
    fraction: f64,
) -> Point3 {
    match method {
        DesurveyMethod::MinimumCurvature => arc_offset(t1, t2, length, fraction),
        DesurveyMethod::BalancedTangent => tangent_offset(t1, t2, length, fraction),
    }
}

fn dogleg(t1: Point3, t2: Point3) -> f64 {
    t1.dot(&t2).clamp(-1.0, 1.0).acos()
}

fn ratio_factor(beta: f64) -> f64 {
    if beta < STRAIGHT_DOGLEG {
        1.0
    } else {
        2.0 / beta * (beta / 2.0).tan()
    }
}

fn arc_offset(t1: Point3, t2: Point3, length: f64, fraction: f64) -> Point3 {
    let beta = dogleg(t1, t2);
    if beta < STRAIGHT_DOGLEG {
        return t1 * (length * fraction);
    }
    let sin_beta = beta.sin();
    if sin_beta < REVERSAL_SIN {
        return tangent_offset(t1, t2, length, fraction);
    }

    // direction at the query depth, on the great circle from t1 to t2
    let tf = (t1 * ((1.0 - fraction) * beta).sin() + t2 * (fraction * beta).sin()) * (1.0 / sin_beta);
    let partial = length * fraction;
    (t1 + tf) * (partial / 2.0 * ratio_factor(fraction * beta))
}

fn tangent_offset(t1: Point3, t2: Point3, length: f64, fraction: f64) -> Point3 {
    let travelled = length * fraction;
    let half = length / 2.0;
    if travelled <= half {
        t1 * travelled
    } else {
        t1 * half + t2 * (travelled - half)
    }
}
