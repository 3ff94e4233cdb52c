//! Rolling record of physical piece ids
//!
//! One slot per track index. A cursor follows the vehicle: it advances by the
//! direction multiplier on every transition, and location reports write the
//! observed id at the cursor. Alignment with the track is found by testing
//! every (start offset, reading direction) pair against the set slots.

use trackdrive_core::{FullTrack, PhysicalId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PieceHistory {
    slots: Vec<Option<PhysicalId>>,
    cursor: usize,
}

impl PieceHistory {
    pub fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
            cursor: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn slots(&self) -> &[Option<PhysicalId>] {
        &self.slots
    }

    pub fn reset(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn advance(&mut self, step: i8) {
        let len = self.slots.len() as i64;
        self.cursor = (self.cursor as i64 + i64::from(step)).rem_euclid(len) as usize;
    }

    /// Write `id` at the cursor
    ///
    /// Returns true if the slot held a different id, in which case the whole
    /// history was reset before recording.
    pub fn record(&mut self, id: PhysicalId) -> bool {
        let contradiction = matches!(self.slots[self.cursor], Some(existing) if existing != id);
        if contradiction {
            self.reset();
        }
        self.slots[self.cursor] = Some(id);
        contradiction
    }

    /// Whether slot `i` lines up with track piece `offset + direction * i`
    /// for every recorded slot
    pub fn matches(&self, track: &FullTrack, offset: usize, direction: i8) -> bool {
        self.slots.iter().enumerate().all(|(i, slot)| match slot {
            None => true,
            Some(id) => {
                let index = track.index_step(offset, i64::from(direction) * i as i64);
                track.piece(index).physical_id == Some(*id)
            }
        })
    }

    /// Every (offset, direction) alignment consistent with the history
    pub fn candidates(&self, track: &FullTrack) -> Vec<(usize, i8)> {
        (0..track.len())
            .flat_map(|offset| [(offset, 1), (offset, -1)])
            .filter(|&(offset, direction)| self.matches(track, offset, direction))
            .collect()
    }

    /// Track index the history slot `slot` corresponds to under an alignment
    pub fn track_index(&self, track: &FullTrack, slot: usize, offset: usize, direction: i8) -> usize {
        track.index_step(offset, i64::from(direction) * slot as i64)
    }

    /// Rewrite the history in track-index order under an alignment, so that
    /// afterwards the identity alignment (offset 0, forward) holds
    pub fn reindex(&mut self, track: &FullTrack, offset: usize, direction: i8) {
        let mut slots = vec![None; self.slots.len()];
        for (i, slot) in self.slots.iter().enumerate() {
            slots[self.track_index(track, i, offset, direction)] = *slot;
        }
        self.cursor = self.track_index(track, self.cursor, offset, direction);
        self.slots = slots;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track() -> FullTrack {
        FullTrack::builder()
            .straight(Some(10))
            .straight(Some(11))
            .straight(Some(12))
            .straight(Some(13))
            .build()
            .unwrap()
    }

    #[test]
    fn test_empty_history_matches_everything() {
        let history = PieceHistory::new(4);
        assert!(history.is_empty());
        assert_eq!(history.candidates(&track()).len(), 8);
    }

    #[test]
    fn test_record_contradiction_resets() {
        let mut history = PieceHistory::new(4);
        assert!(!history.record(10));
        history.advance(1);
        assert!(!history.record(11));
        history.advance(-1);
        assert!(history.record(12), "different id at the same slot");
        assert_eq!(history.slots(), &[Some(12), None, None, None]);
    }

    #[test]
    fn test_same_id_is_not_a_contradiction() {
        let mut history = PieceHistory::new(4);
        history.record(10);
        assert!(!history.record(10));
    }

    #[test]
    fn test_advance_wraps_both_ways() {
        let mut history = PieceHistory::new(4);
        history.advance(-1);
        assert_eq!(history.cursor(), 3);
        history.advance(1);
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn test_reversed_alignment_is_found_and_reindexed() {
        let track = track();
        let mut history = PieceHistory::new(4);
        // Cursor counts up while the car really drives 2 -> 1 -> 0
        history.record(12);
        history.advance(1);
        history.record(11);
        history.advance(1);
        history.record(10);

        assert_eq!(history.candidates(&track), vec![(2, -1)]);

        history.reindex(&track, 2, -1);
        assert_eq!(history.slots(), &[Some(10), Some(11), Some(12), None]);
        assert_eq!(history.cursor(), 0);
        assert!(history.matches(&track, 0, 1));
    }
}
