//! Persisted track format
//!
//! A track is stored as an ordered JSON array of piece records:
//!
//! ```json
//! [
//!   { "type": "start_before_line", "rotation": 0, "physical_id": 34, "length": 339.0, "line_width": 20.0 },
//!   { "type": "curve", "rotation": 0, "physical_id": 17, "radius": 280.0, "mirrored": true }
//! ]
//! ```
//!
//! Unknown `type` values, missing geometry fields and rotations other than
//! 0/90/180/270 are decoding errors; nothing is defaulted except the
//! optional `physical_id`.

use crate::error::Result;
use crate::piece::{PhysicalId, PieceKind, Rotation, TrackPiece};
use crate::track::FullTrack;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PieceRecord {
    Straight {
        rotation: Rotation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        physical_id: Option<PhysicalId>,
        length: f64,
    },
    Curve {
        rotation: Rotation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        physical_id: Option<PhysicalId>,
        radius: f64,
        mirrored: bool,
    },
    StartBeforeLine {
        rotation: Rotation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        physical_id: Option<PhysicalId>,
        length: f64,
        line_width: f64,
    },
    StartAfterLine {
        rotation: Rotation,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        physical_id: Option<PhysicalId>,
        length: f64,
        line_width: f64,
    },
}

impl From<&TrackPiece> for PieceRecord {
    fn from(piece: &TrackPiece) -> Self {
        let rotation = piece.rotation;
        let physical_id = piece.physical_id;
        match piece.kind {
            PieceKind::Straight { length } => PieceRecord::Straight {
                rotation,
                physical_id,
                length,
            },
            PieceKind::Curve { radius, mirrored } => PieceRecord::Curve {
                rotation,
                physical_id,
                radius,
                mirrored,
            },
            PieceKind::StartBeforeLine { length, line_width } => PieceRecord::StartBeforeLine {
                rotation,
                physical_id,
                length,
                line_width,
            },
            PieceKind::StartAfterLine { length, line_width } => PieceRecord::StartAfterLine {
                rotation,
                physical_id,
                length,
                line_width,
            },
        }
    }
}

impl From<PieceRecord> for TrackPiece {
    fn from(record: PieceRecord) -> Self {
        match record {
            PieceRecord::Straight {
                rotation,
                physical_id,
                length,
            } => TrackPiece::new(PieceKind::Straight { length }, rotation, physical_id),
            PieceRecord::Curve {
                rotation,
                physical_id,
                radius,
                mirrored,
            } => TrackPiece::new(PieceKind::Curve { radius, mirrored }, rotation, physical_id),
            PieceRecord::StartBeforeLine {
                rotation,
                physical_id,
                length,
                line_width,
            } => TrackPiece::new(
                PieceKind::StartBeforeLine { length, line_width },
                rotation,
                physical_id,
            ),
            PieceRecord::StartAfterLine {
                rotation,
                physical_id,
                length,
                line_width,
            } => TrackPiece::new(
                PieceKind::StartAfterLine { length, line_width },
                rotation,
                physical_id,
            ),
        }
    }
}

impl FullTrack {
    pub fn to_records(&self) -> Vec<PieceRecord> {
        self.pieces().map(PieceRecord::from).collect()
    }

    pub fn from_records(records: Vec<PieceRecord>) -> Result<Self> {
        FullTrack::new(records.into_iter().map(TrackPiece::from).collect())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_records())?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<PieceRecord> = serde_json::from_str(json)?;
        FullTrack::from_records(records)
    }

    /// Load a track from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        FullTrack::from_json(&json)
    }
}
