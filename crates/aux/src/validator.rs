//! Per-connection aux-data validator (§4.11).
//!
//! Holds the consuming end of the prefetcher's SPSC queue plus whatever
//! block it peeked past on a previous call. On each incoming sync packet it
//! walks the queue looking for the block whose `edit_unit_index` matches the
//! packet's `timelineEditUnitIndex`: earlier blocks are stale and dropped,
//! a later block isn't needed yet and is held for the next call.

use crate::codec::AuxDataBlock;
use rtrb::Consumer;

pub struct Validator {
    queue: Consumer<AuxDataBlock>,
    held: Option<AuxDataBlock>,
    last_validated_index: Option<u32>,
}

impl Validator {
    #[must_use]
    pub fn new(queue: Consumer<AuxDataBlock>) -> Self {
        Self { queue, held: None, last_validated_index: None }
    }

    #[must_use]
    pub fn last_validated_index(&self) -> Option<u32> {
        self.last_validated_index
    }

    /// Checks the queue against `timeline_edit_unit_index`. Returns the
    /// matching block on success; returns `None` (and leaves the validator
    /// invalid) if no block at that index is available yet.
    pub fn validate(&mut self, timeline_edit_unit_index: u32) -> Option<&AuxDataBlock> {
        loop {
            let block = self.held.take().or_else(|| self.queue.pop().ok())?;

            match block.edit_unit_index.cmp(&timeline_edit_unit_index) {
                std::cmp::Ordering::Less => {
                    tracing::warn!(
                        block_index = block.edit_unit_index,
                        timeline_index = timeline_edit_unit_index,
                        "dropping stale aux-data block"
                    );
                },
                std::cmp::Ordering::Equal => {
                    self.last_validated_index = Some(timeline_edit_unit_index);
                    self.held = Some(block);
                    return self.held.as_ref();
                },
                std::cmp::Ordering::Greater => {
                    self.held = Some(block);
                    return None;
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcsync_core::ids::Ul;
    use rtrb::RingBuffer;

    fn block(edit_unit_index: u32) -> AuxDataBlock {
        AuxDataBlock {
            edit_unit_index,
            edit_rate_num: 24,
            edit_rate_den: 1,
            source_data_essence_coding_ul: Ul::from_bytes([0; 16]),
            source_data_item: Vec::new(),
            source_cryptographic_context: Vec::new(),
        }
    }

    #[test]
    fn matching_block_validates() {
        let (mut producer, consumer) = RingBuffer::new(4);
        producer.push(block(5)).unwrap();
        let mut validator = Validator::new(consumer);
        let matched = validator.validate(5).unwrap();
        assert_eq!(matched.edit_unit_index, 5);
        assert_eq!(validator.last_validated_index(), Some(5));
    }

    #[test]
    fn stale_blocks_are_dropped_until_a_match_or_empty() {
        let (mut producer, consumer) = RingBuffer::new(4);
        producer.push(block(1)).unwrap();
        producer.push(block(2)).unwrap();
        producer.push(block(5)).unwrap();
        let mut validator = Validator::new(consumer);
        assert_eq!(validator.validate(5).unwrap().edit_unit_index, 5);
    }

    #[test]
    fn later_block_is_held_for_the_next_packet() {
        let (mut producer, consumer) = RingBuffer::new(4);
        producer.push(block(7)).unwrap();
        let mut validator = Validator::new(consumer);

        assert!(validator.validate(5).is_none());
        assert_eq!(validator.last_validated_index(), None);

        let matched = validator.validate(7).unwrap();
        assert_eq!(matched.edit_unit_index, 7);
    }

    #[test]
    fn empty_queue_is_invalid() {
        let (_producer, consumer) = RingBuffer::<AuxDataBlock>::new(4);
        let mut validator = Validator::new(consumer);
        assert!(validator.validate(0).is_none());
    }
}
