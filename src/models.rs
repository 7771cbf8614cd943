use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::ops::{Add, Mul, Sub};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HoleId(pub String);

impl fmt::Display for HoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HoleId {
    fn from(id: &str) -> Self {
        HoleId(id.to_string())
    }
}

/// Canonical unit symbol (e.g. `ppm`, `g/t`, `%`).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Unit(pub String);

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A point (or vector) in project coordinates.
///
/// `x` is easting, `y` northing and `z` elevation, positive up.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Point3 { x, y, z }
    }

    pub fn dot(&self, other: &Point3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn distance(&self, other: &Point3) -> f64 {
        (*self - *other).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Point3 {
    type Output = Point3;

    fn add(self, rhs: Point3) -> Point3 {
        Point3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Point3 {
    type Output = Point3;

    fn sub(self, rhs: Point3) -> Point3 {
        Point3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Point3 {
    type Output = Point3;

    fn mul(self, rhs: f64) -> Point3 {
        Point3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Directional survey measurement at a down-hole depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurveyStation {
    /// Measured depth along the hole
    pub depth: f64,
    /// Azimuth in degrees clockwise from grid north (0–360)
    pub azimuth: f64,
    /// Dip in degrees from horizontal (−90–90)
    pub dip: f64,
}

impl SurveyStation {
    pub const fn new(depth: f64, azimuth: f64, dip: f64) -> Self {
        SurveyStation {
            depth,
            azimuth,
            dip,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Hole {
    pub id: HoleId,
    pub collar: Point3,
    pub stations: Vec<SurveyStation>,
    /// End-of-hole depth; the trajectory extends straight past the last
    /// station down to this depth.
    pub total_depth: Option<f64>,
}

impl Hole {
    pub fn new(id: impl Into<String>, collar: Point3, stations: Vec<SurveyStation>) -> Self {
        Hole {
            id: HoleId(id.into()),
            collar,
            stations,
            total_depth: None,
        }
    }

    pub fn with_total_depth(mut self, depth: f64) -> Self {
        self.total_depth = Some(depth);
        self
    }
}

/// A single measured value; `value` is `None` when the lab reported nothing.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Measurement {
    pub value: Option<f64>,
    pub unit: Option<Unit>,
}

impl Measurement {
    pub fn new(value: Option<f64>, unit: Option<&str>) -> Self {
        Measurement {
            value,
            unit: unit.map(|u| Unit(u.to_string())),
        }
    }

    pub fn value(value: f64) -> Self {
        Measurement {
            value: Some(value),
            unit: None,
        }
    }

    pub fn missing() -> Self {
        Measurement::default()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SampleInterval {
    pub hole_id: HoleId,
    pub from: f64,
    pub to: f64,
    pub values: BTreeMap<String, Measurement>,
}

impl SampleInterval {
    pub fn new(hole_id: impl Into<String>, from: f64, to: f64) -> Self {
        SampleInterval {
            hole_id: HoleId(hole_id.into()),
            from,
            to,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, field: impl Into<String>, measurement: Measurement) -> Self {
        self.values.insert(field.into(), measurement);
        self
    }

    pub fn length(&self) -> f64 {
        self.to - self.from
    }
}

/// A hole together with the sample intervals collected from it.
#[derive(Clone, Debug)]
pub struct HoleRecord {
    pub hole: Hole,
    pub samples: Vec<SampleInterval>,
}

impl HoleRecord {
    pub fn new(hole: Hole, samples: Vec<SampleInterval>) -> Self {
        HoleRecord { hole, samples }
    }

    /// Assemble records from flat hole and sample lists, matching samples to
    /// holes by identifier. Samples go to the first hole with their id; later
    /// holes reusing an id are returned separately.
    pub fn group(holes: Vec<Hole>, samples: Vec<SampleInterval>) -> GroupedHoles {
        let mut index: HashMap<HoleId, usize> = HashMap::with_capacity(holes.len());
        let mut grouped = GroupedHoles::default();

        for (position, hole) in holes.into_iter().enumerate() {
            if index.contains_key(&hole.id) {
                grouped.duplicates.push((position, hole));
                continue;
            }
            index.insert(hole.id.clone(), grouped.records.len());
            grouped.positions.push(position);
            grouped.records.push(HoleRecord::new(hole, Vec::new()));
        }

        for sample in samples {
            match index.get(&sample.hole_id) {
                Some(&i) => grouped.records[i].samples.push(sample),
                None => grouped.orphan_samples += 1,
            }
        }
        grouped
    }
}

/// Output of [`HoleRecord::group`].
#[derive(Clone, Debug, Default)]
pub struct GroupedHoles {
    /// One record per distinct hole id, in input order
    pub records: Vec<HoleRecord>,
    /// Input position of each record
    pub positions: Vec<usize>,
    /// Holes whose id was already taken, with their input position
    pub duplicates: Vec<(usize, Hole)>,
    /// Samples whose hole id matched no hole
    pub orphan_samples: usize,
}

/// A composited interval produced for downstream storage or display.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeInterval {
    pub hole_id: HoleId,
    pub from: f64,
    pub to: f64,
    /// Length-weighted average per measured field; `None` when no sample
    /// with a value covers the bin.
    pub values: BTreeMap<String, Option<f64>>,
    /// Number of sample intervals overlapping the bin
    pub sample_count: u32,
    /// Length of the bin covered by at least one sample
    pub covered_length: f64,
    pub start: Point3,
    pub end: Point3,
    pub midpoint: Point3,
}

impl CompositeInterval {
    pub fn length(&self) -> f64 {
        self.to - self.from
    }

    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied().flatten()
    }
}
