use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::labels::parse_label;

/// Why a detection could not be turned into a [`DetectionRecord`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("confidence {0} is outside [0.0, 1.0]")]
    InvalidConfidence(f32),
    #[error("invalid bounding box ({x1}, {y1}, {x2}, {y2})")]
    InvalidBoundingBox { x1: f32, y1: f32, x2: f32, y2: f32 },
    #[error("team name is empty")]
    EmptyTeamName,
}

/// Axis-aligned box in source image pixels, `xyxy` layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Result<Self, RecordError> {
        let finite = [x1, y1, x2, y2].iter().all(|v| v.is_finite());
        if !finite || x1 >= x2 || y1 >= y2 {
            return Err(RecordError::InvalidBoundingBox { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn intersection(&self, other: &BoundingBox) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        w * h
    }

    /// Intersection over union, 0.0 for disjoint boxes
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = self.intersection(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            return 0.0;
        }
        inter / union
    }

    /// Clamp to `[0, width] x [0, height]`, `None` if nothing is left
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<BoundingBox> {
        let (w, h) = (width as f32, height as f32);
        BoundingBox::new(
            self.x1.clamp(0.0, w),
            self.y1.clamp(0.0, h),
            self.x2.clamp(0.0, w),
            self.y2.clamp(0.0, h),
        )
        .ok()
    }
}

impl TryFrom<(f32, f32, f32, f32)> for BoundingBox {
    type Error = RecordError;

    fn try_from((x1, y1, x2, y2): (f32, f32, f32, f32)) -> Result<Self, Self::Error> {
        BoundingBox::new(x1, y1, x2, y2)
    }
}

/// One classified shirt region in one image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionRecord {
    team_name: String,
    confidence: f32,
    bbox: BoundingBox,
    year: Option<String>,
    other_data: Option<String>,
}

impl DetectionRecord {
    /// Out-of-range confidence is rejected rather than clamped.
    pub fn new(
        team_name: impl Into<String>,
        confidence: f32,
        bbox: BoundingBox,
        year: Option<String>,
        other_data: Option<String>,
    ) -> Result<Self, RecordError> {
        let team_name = team_name.into();
        if team_name.is_empty() {
            return Err(RecordError::EmptyTeamName);
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(RecordError::InvalidConfidence(confidence));
        }
        Ok(Self {
            team_name,
            confidence,
            bbox,
            year,
            other_data,
        })
    }

    /// Build a record from a raw classifier label.
    ///
    /// The orientation is kept in front of the other data, so
    /// `Yankees-Home-1998-Jersey` yields other data `Home-Jersey`.
    pub fn from_label(raw_label: &str, confidence: f32, bbox: BoundingBox) -> Result<Self, RecordError> {
        let parsed = parse_label(raw_label);
        let other_data = match (parsed.orientation, parsed.other_data) {
            (Some(orientation), Some(other)) => Some(format!("{}-{}", orientation, other)),
            (Some(orientation), None) => Some(orientation),
            (None, other) => other,
        };
        Self::new(parsed.name, confidence, bbox, parsed.year, other_data)
    }

    pub fn team_name(&self) -> &str {
        &self.team_name
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn year(&self) -> Option<&str> {
        self.year.as_deref()
    }

    pub fn other_data(&self) -> Option<&str> {
        self.other_data.as_deref()
    }
}

#[derive(Debug, Clone)]
struct TeamGroup {
    name: String,
    records: Vec<DetectionRecord>,
}

impl Serialize for TeamGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("TeamGroup", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("occurrences", &self.records.len())?;
        state.serialize_field("records", &self.records)?;
        state.end()
    }
}

/// All detections for one source image, grouped by team.
///
/// Teams keep the order they were first seen in. Every `add` appends; the
/// occurrence count of a team is the length of its record list, so the two
/// cannot disagree.
#[derive(Debug, Clone, Serialize)]
pub struct ImageAggregate {
    image_path: PathBuf,
    teams: Vec<TeamGroup>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl ImageAggregate {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            teams: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn image_path(&self) -> &Path {
        &self.image_path
    }

    /// Register one detection under its team name
    pub fn add(&mut self, record: DetectionRecord) {
        match self.index.get(record.team_name()) {
            Some(&slot) => self.teams[slot].records.push(record),
            None => {
                self.index.insert(record.team_name.clone(), self.teams.len());
                self.teams.push(TeamGroup {
                    name: record.team_name.clone(),
                    records: vec![record],
                });
            }
        }
    }

    /// Parse `raw_label` and add the resulting record; leaves the aggregate
    /// untouched on error.
    pub fn add_label(&mut self, raw_label: &str, confidence: f32, bbox: BoundingBox) -> Result<(), RecordError> {
        let record = DetectionRecord::from_label(raw_label, confidence, bbox)?;
        self.add(record);
        Ok(())
    }

    /// Distinct team names in first-seen order
    pub fn team_names(&self) -> Vec<&str> {
        self.teams.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn records(&self, team_name: &str) -> &[DetectionRecord] {
        self.index
            .get(team_name)
            .map(|&slot| self.teams[slot].records.as_slice())
            .unwrap_or(&[])
    }

    pub fn occurrences(&self, team_name: &str) -> usize {
        self.records(team_name).len()
    }

    pub fn team_occurrences(&self) -> Vec<(&str, usize)> {
        self.teams
            .iter()
            .map(|t| (t.name.as_str(), t.records.len()))
            .collect()
    }

    pub fn teams(&self) -> impl Iterator<Item = (&str, &[DetectionRecord])> {
        self.teams
            .iter()
            .map(|t| (t.name.as_str(), t.records.as_slice()))
    }

    /// Team seen most often; the earliest team wins a tie
    pub fn top_team(&self) -> Option<(&str, usize)> {
        let mut best: Option<(&str, usize)> = None;
        for (name, count) in self.team_occurrences() {
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((name, count));
            }
        }
        best
    }

    /// Total number of records across all teams
    pub fn len(&self) -> usize {
        self.teams.iter().map(|t| t.records.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}
