//! Track piece geometry
//!
//! Every piece is described in its own unrotated frame: the vehicle enters
//! through the bottom edge heading "up" and the footprint's top-left corner
//! is the local origin. A piece's [`Rotation`] is the heading a vehicle has
//! when it enters the piece in the nominal direction; local positions are
//! rotated into that orientation before being placed on the track.
//!
//! Offsets are measured in the piece frame: positive = right of the nominal
//! driving direction.

use crate::geometry::Vector;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Hardware tag identifying a physical piece type
pub type PhysicalId = u8;

/// Width of every piece's road surface footprint
pub const PIECE_WIDTH: f64 = 186.0;

/// Length of a standard straight piece
pub const STRAIGHT_LENGTH: f64 = 559.0;

/// Centerline radius of a standard curved piece
pub const CURVE_RADIUS: f64 = 280.0;

/// Start piece section before the finish line
pub const START_BEFORE_LINE_LENGTH: f64 = 339.0;

/// Start piece section after the finish line
pub const START_AFTER_LINE_LENGTH: f64 = 220.0;

/// Painted width of the start/finish line
pub const START_LINE_WIDTH: f64 = 20.0;

/// Smallest radius a lane on a curve may have
const MIN_LANE_RADIUS: f64 = 1.0;

/// Quarter-turn placement of a piece (also used as a compass direction)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    /// Heading "up" (north)
    #[default]
    Deg0,
    /// Heading right (east)
    Deg90,
    /// Heading down (south)
    Deg180,
    /// Heading left (west)
    Deg270,
}

impl Rotation {
    pub fn degrees(&self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Rotate by a signed number of quarter turns (positive = clockwise)
    pub fn turn(&self, quarters: i32) -> Rotation {
        match (self.degrees() as i32 / 90 + quarters).rem_euclid(4) {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    /// Size of a `width` x `height` footprint after rotation
    pub fn dimensions(&self, size: Vector) -> Vector {
        match self {
            Rotation::Deg0 | Rotation::Deg180 => size,
            Rotation::Deg90 | Rotation::Deg270 => Vector::new(size.y, size.x),
        }
    }

    /// Map a point of an unrotated footprint of `size` into the rotated footprint
    pub fn apply(&self, point: Vector, size: Vector) -> Vector {
        match self {
            Rotation::Deg0 => point,
            Rotation::Deg90 => Vector::new(size.y - point.y, point.x),
            Rotation::Deg180 => Vector::new(size.x - point.x, size.y - point.y),
            Rotation::Deg270 => Vector::new(point.y, size.x - point.x),
        }
    }
}

impl TryFrom<u16> for Rotation {
    type Error = String;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(format!("invalid rotation {}, expected 0/90/180/270", other)),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> u16 {
        rotation.degrees()
    }
}

/// Per-variant geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PieceKind {
    Straight { length: f64 },
    /// Quarter circle. Unmirrored curves turn left, mirrored curves turn right.
    Curve { radius: f64, mirrored: bool },
    StartBeforeLine { length: f64, line_width: f64 },
    StartAfterLine { length: f64, line_width: f64 },
}

/// Result of moving along a piece
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Advance {
    /// New progress, clamped to [0, length]
    pub progress: f64,
    /// Signed distance that did not fit on this piece
    pub leftover: f64,
    /// Position in the piece's rotated local frame
    pub position: Vector,
}

/// A placed track piece
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPiece {
    pub kind: PieceKind,
    pub rotation: Rotation,
    pub physical_id: Option<PhysicalId>,
}

impl TrackPiece {
    pub fn new(kind: PieceKind, rotation: Rotation, physical_id: Option<PhysicalId>) -> Self {
        Self {
            kind,
            rotation,
            physical_id,
        }
    }

    pub fn straight(rotation: Rotation) -> Self {
        Self::new(
            PieceKind::Straight {
                length: STRAIGHT_LENGTH,
            },
            rotation,
            None,
        )
    }

    pub fn curve(rotation: Rotation, mirrored: bool) -> Self {
        Self::new(
            PieceKind::Curve {
                radius: CURVE_RADIUS,
                mirrored,
            },
            rotation,
            None,
        )
    }

    pub fn with_physical_id(mut self, id: PhysicalId) -> Self {
        self.physical_id = Some(id);
        self
    }

    pub fn is_curve(&self) -> bool {
        matches!(self.kind, PieceKind::Curve { .. })
    }

    /// Length of the lane at `offset`
    pub fn length(&self, offset: f64) -> f64 {
        match self.kind {
            PieceKind::Straight { length }
            | PieceKind::StartBeforeLine { length, .. }
            | PieceKind::StartAfterLine { length, .. } => length,
            PieceKind::Curve { radius, mirrored } => lane_radius(radius, mirrored, offset) * FRAC_PI_2,
        }
    }

    /// Unrotated footprint size (width, height)
    pub fn footprint(&self) -> Vector {
        match self.kind {
            PieceKind::Straight { length }
            | PieceKind::StartBeforeLine { length, .. }
            | PieceKind::StartAfterLine { length, .. } => Vector::new(PIECE_WIDTH, length),
            PieceKind::Curve { radius, .. } => {
                let side = radius + PIECE_WIDTH / 2.0;
                Vector::new(side, side)
            }
        }
    }

    /// Footprint size after rotation
    pub fn placed_footprint(&self) -> Vector {
        self.rotation.dimensions(self.footprint())
    }

    /// Heading on entry in the nominal direction
    pub fn incoming(&self) -> Rotation {
        self.rotation
    }

    /// Heading on exit in the nominal direction
    pub fn outgoing(&self) -> Rotation {
        match self.kind {
            PieceKind::Curve { mirrored: false, .. } => self.rotation.turn(-1),
            PieceKind::Curve { mirrored: true, .. } => self.rotation.turn(1),
            _ => self.rotation,
        }
    }

    /// Centerline entry point in the rotated local frame
    pub fn entry_point(&self) -> Vector {
        self.rotation.apply(self.local_point(0.0, 0.0), self.footprint())
    }

    /// Centerline exit point in the rotated local frame
    pub fn exit_point(&self) -> Vector {
        let end = self.length(0.0);
        self.rotation.apply(self.local_point(end, 0.0), self.footprint())
    }

    /// Move `distance` along the piece from `progress`
    ///
    /// Progress is clamped to [0, length(offset)]; any excess is returned
    /// as `leftover` (positive past the end, negative before the start).
    pub fn process(&self, progress: f64, distance: f64, offset: f64) -> Advance {
        let length = self.length(offset);
        let target = progress + distance;
        let (progress, leftover) = if target > length {
            (length, target - length)
        } else if target < 0.0 {
            (0.0, target)
        } else {
            (target, 0.0)
        };
        let position = self
            .rotation
            .apply(self.local_point(progress, offset), self.footprint());
        Advance {
            progress,
            leftover,
            position,
        }
    }

    /// Progress on the lane at `new_offset` that keeps the same fraction of
    /// the piece completed as `old_progress` had at `old_offset`
    pub fn equivalent_progress_for_offset(
        &self,
        old_offset: f64,
        new_offset: f64,
        old_progress: f64,
    ) -> f64 {
        match self.kind {
            PieceKind::Curve { .. } => {
                old_progress / self.length(old_offset) * self.length(new_offset)
            }
            _ => old_progress,
        }
    }

    /// Position in the unrotated local frame
    fn local_point(&self, progress: f64, offset: f64) -> Vector {
        match self.kind {
            PieceKind::Straight { length }
            | PieceKind::StartBeforeLine { length, .. }
            | PieceKind::StartAfterLine { length, .. } => {
                Vector::new(PIECE_WIDTH / 2.0 + offset, length - progress)
            }
            PieceKind::Curve { radius, mirrored } => {
                let side = radius + PIECE_WIDTH / 2.0;
                let r = lane_radius(radius, mirrored, offset);
                let theta = (progress / self.length(offset)).clamp(0.0, 1.0) * FRAC_PI_2;
                let (sin, cos) = theta.sin_cos();
                // Arc centered on the bottom-left corner, reflected for right turns
                let x = r * cos;
                let y = side - r * sin;
                if mirrored {
                    Vector::new(side - x, y)
                } else {
                    Vector::new(x, y)
                }
            }
        }
    }
}

/// Radius of the lane at `offset` on a curve of centerline `radius`
fn lane_radius(radius: f64, mirrored: bool, offset: f64) -> f64 {
    let signed = if mirrored { -offset } else { offset };
    (radius + signed).max(MIN_LANE_RADIUS)
}
