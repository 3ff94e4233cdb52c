//! Assembled closed-loop tracks
//!
//! A [`FullTrack`] is an ordered list of pieces with precomputed global
//! offsets (the top-left corner of each rotated footprint). Pieces are laid
//! out by walking their attachment directions: each piece's centerline entry
//! is attached to the previous piece's centerline exit. The whole layout is
//! then shifted so the bounding box's top-left corner is the origin.
//!
//! Index arithmetic is always modulo the number of pieces.

use crate::error::{Result, TrackError};
use crate::geometry::Vector;
use crate::piece::{
    PhysicalId, PieceKind, Rotation, TrackPiece, CURVE_RADIUS, START_AFTER_LINE_LENGTH,
    START_BEFORE_LINE_LENGTH, START_LINE_WIDTH, STRAIGHT_LENGTH,
};
use tracing::debug;

/// Exit-to-entry gap tolerated when checking geometric closure
const CLOSURE_TOLERANCE: f64 = 1.0;

/// A piece together with its placement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedPiece {
    pub piece: TrackPiece,
    /// Top-left corner of the rotated footprint in the track frame
    pub global_offset: Vector,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FullTrack {
    pieces: Vec<PlacedPiece>,
    size: Vector,
    closed: bool,
}

impl FullTrack {
    /// Lay out `pieces` using their stated rotations
    pub fn new(pieces: Vec<TrackPiece>) -> Result<Self> {
        if pieces.is_empty() {
            return Err(TrackError::Empty);
        }

        let mut cursor = Vector::ZERO;
        let mut placed = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let global_offset = cursor - piece.entry_point();
            cursor = global_offset + piece.exit_point();
            placed.push(PlacedPiece {
                piece,
                global_offset,
            });
        }

        let first = &placed[0];
        let closed = cursor.approx_eq(
            &(first.global_offset + first.piece.entry_point()),
            CLOSURE_TOLERANCE,
        );

        let mut min = Vector::new(f64::INFINITY, f64::INFINITY);
        let mut max = Vector::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in &placed {
            min = min.min(&p.global_offset);
            max = max.max(&(p.global_offset + p.piece.placed_footprint()));
        }
        for p in &mut placed {
            p.global_offset = p.global_offset - min;
        }

        let track = Self {
            pieces: placed,
            size: max - min,
            closed,
        };
        debug!(
            pieces = track.len(),
            width = track.size.x,
            height = track.size.y,
            closed = track.closed,
            "Track laid out"
        );
        Ok(track)
    }

    pub fn builder() -> TrackBuilder {
        TrackBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Piece at `index`, wrapping around the loop
    pub fn piece(&self, index: usize) -> &TrackPiece {
        &self.pieces[index % self.pieces.len()].piece
    }

    pub fn placed(&self, index: usize) -> &PlacedPiece {
        &self.pieces[index % self.pieces.len()]
    }

    pub fn pieces(&self) -> impl Iterator<Item = &TrackPiece> {
        self.pieces.iter().map(|p| &p.piece)
    }

    /// Bounding box size of the whole layout
    pub fn size(&self) -> Vector {
        self.size
    }

    /// Whether the last piece's exit meets the first piece's entry
    pub fn is_geometrically_closed(&self) -> bool {
        self.closed
    }

    /// `index + step`, modulo track length
    pub fn index_step(&self, index: usize, step: i64) -> usize {
        (index as i64 + step).rem_euclid(self.pieces.len() as i64) as usize
    }

    /// Convert a piece-local position into the track frame
    pub fn to_global(&self, index: usize, local: Vector) -> Vector {
        self.placed(index).global_offset + local
    }

    /// Sum of all piece lengths at `offset`
    pub fn lap_length(&self, offset: f64) -> f64 {
        self.pieces().map(|p| p.length(offset)).sum()
    }

    /// Distance from the start of piece 0 to `progress` on piece `index`
    pub fn distance_along(&self, index: usize, progress: f64, offset: f64) -> f64 {
        let index = index % self.len();
        self.pieces[..index]
            .iter()
            .map(|p| p.piece.length(offset))
            .sum::<f64>()
            + progress
    }

    /// Shortest signed along-track distance from `from` to `to`, measured in
    /// the driving direction (`direction` = +1 nominal, -1 reversed)
    ///
    /// Positive when `to` is ahead of `from`. The result lies in
    /// [-lap/2, lap/2).
    pub fn signed_gap(
        &self,
        from: (usize, f64),
        to: (usize, f64),
        offset: f64,
        direction: i8,
    ) -> f64 {
        let lap = self.lap_length(offset);
        let raw = self.distance_along(to.0, to.1, offset) - self.distance_along(from.0, from.1, offset);
        let forward = raw * f64::from(direction);
        (forward + lap / 2.0).rem_euclid(lap) - lap / 2.0
    }

    /// Whether the nominal direction goes clockwise around the loop
    ///
    /// Loops with no net turning (e.g. straight-only test tracks) count as
    /// clockwise.
    pub fn nominal_clockwise(&self) -> bool {
        let net: i32 = self
            .pieces()
            .map(|p| match p.kind {
                PieceKind::Curve { mirrored: true, .. } => 1,
                PieceKind::Curve { mirrored: false, .. } => -1,
                _ => 0,
            })
            .sum();
        net >= 0
    }

    /// Index of every piece carrying `id`
    pub fn find_physical(&self, id: PhysicalId) -> Vec<usize> {
        self.pieces()
            .enumerate()
            .filter(|(_, p)| p.physical_id == Some(id))
            .map(|(i, _)| i)
            .collect()
    }

    pub fn contains_physical(&self, id: PhysicalId) -> bool {
        self.pieces().any(|p| p.physical_id == Some(id))
    }
}

/// Incremental track assembly
///
/// Each appended piece is rotated to continue in the previous piece's
/// outgoing direction. The first piece heads "up".
#[derive(Debug, Default)]
pub struct TrackBuilder {
    pieces: Vec<TrackPiece>,
    heading: Rotation,
}

impl TrackBuilder {
    pub fn heading(mut self, heading: Rotation) -> Self {
        self.heading = heading;
        self
    }

    pub fn piece(mut self, kind: PieceKind, physical_id: Option<PhysicalId>) -> Self {
        let piece = TrackPiece::new(kind, self.heading, physical_id);
        self.heading = piece.outgoing();
        self.pieces.push(piece);
        self
    }

    pub fn straight(self, physical_id: Option<PhysicalId>) -> Self {
        self.piece(
            PieceKind::Straight {
                length: STRAIGHT_LENGTH,
            },
            physical_id,
        )
    }

    pub fn curve_left(self, physical_id: Option<PhysicalId>) -> Self {
        self.piece(
            PieceKind::Curve {
                radius: CURVE_RADIUS,
                mirrored: false,
            },
            physical_id,
        )
    }

    pub fn curve_right(self, physical_id: Option<PhysicalId>) -> Self {
        self.piece(
            PieceKind::Curve {
                radius: CURVE_RADIUS,
                mirrored: true,
            },
            physical_id,
        )
    }

    /// Start piece, split into the sections before and after the line
    pub fn start(self, before_id: Option<PhysicalId>, after_id: Option<PhysicalId>) -> Self {
        self.piece(
            PieceKind::StartBeforeLine {
                length: START_BEFORE_LINE_LENGTH,
                line_width: START_LINE_WIDTH,
            },
            before_id,
        )
        .piece(
            PieceKind::StartAfterLine {
                length: START_AFTER_LINE_LENGTH,
                line_width: START_LINE_WIDTH,
            },
            after_id,
        )
    }

    pub fn build(self) -> Result<FullTrack> {
        FullTrack::new(self.pieces)
    }
}
