//! Real-time ring (§4.4): a pair of fixed-capacity SPSC queues of PCM
//! buffer handles connecting an audio I/O thread to a worker thread.
//!
//! Every buffer is allocated once, at construction, and cycles forever
//! between the "free" ring and the "filled" ring — neither the audio
//! callback nor the worker thread ever allocates, frees, or blocks.
//! Built on [`rtrb`], whose `Producer`/`Consumer` split already gives a
//! single-producer/single-consumer queue with no internal locking.

use rtrb::{Consumer, Producer, RingBuffer};

/// One cycled PCM chunk, handed between rings by value (moved, not copied).
pub type PcmBuffer = Box<[f32]>;

/// The ring endpoints a worker thread holds: it pops a free buffer, fills
/// it, and pushes the result onto the filled ring.
pub struct WorkerRingHandles {
    pub free_consumer: Consumer<PcmBuffer>,
    pub filled_producer: Producer<PcmBuffer>,
}

/// The ring endpoints an audio callback holds: it pops a filled buffer to
/// play (or pushes one to drain), and returns the buffer to the free ring
/// once done with it.
pub struct AudioRingHandles {
    pub free_producer: Producer<PcmBuffer>,
    pub filled_consumer: Consumer<PcmBuffer>,
}

/// Ring capacity holding a quarter second of audio at `sample_rate`,
/// chunked into callback buffers of `chunk_len` samples, rounded up.
#[must_use]
pub fn capacity_for_quarter_second(sample_rate: u32, chunk_len: usize) -> usize {
    let quarter_second_samples = (sample_rate as usize).div_ceil(4);
    quarter_second_samples.div_ceil(chunk_len.max(1))
}

/// Builds both rings and pre-allocates every chunk into the free ring.
/// `capacity` buffers of `chunk_len` samples each are allocated exactly
/// once here; no further allocation occurs on either side afterward.
#[must_use]
pub fn build_rings(capacity: usize, chunk_len: usize) -> (WorkerRingHandles, AudioRingHandles) {
    let (mut free_producer, free_consumer) = RingBuffer::<PcmBuffer>::new(capacity);
    let (filled_producer, filled_consumer) = RingBuffer::<PcmBuffer>::new(capacity);

    for _ in 0..capacity {
        let buffer: PcmBuffer = vec![0.0f32; chunk_len].into_boxed_slice();
        assert!(free_producer.push(buffer).is_ok(), "free ring undersized during pre-fill");
    }

    (
        WorkerRingHandles { free_consumer, filled_producer },
        AudioRingHandles { free_producer, filled_consumer },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_rounds_up_to_a_whole_chunk() {
        assert_eq!(capacity_for_quarter_second(48_000, 2_000), 6);
        assert_eq!(capacity_for_quarter_second(48_000, 4_000), 3);
        assert_eq!(capacity_for_quarter_second(1, 1), 1);
    }

    #[test]
    fn build_rings_pre_fills_the_free_ring() {
        let (worker, audio) = build_rings(4, 128);
        assert_eq!(worker.free_consumer.slots(), 4);
        assert_eq!(audio.filled_consumer.slots(), 0);
    }

    #[test]
    fn buffers_cycle_between_rings() {
        let (mut worker, mut audio) = build_rings(2, 8);

        let mut chunk = worker.free_consumer.pop().unwrap();
        chunk.fill(1.0);
        worker.filled_producer.push(chunk).unwrap();

        let filled = audio.filled_consumer.pop().unwrap();
        assert!(filled.iter().all(|&s| s == 1.0));
        audio.free_producer.push(filled).unwrap();

        assert_eq!(worker.free_consumer.slots(), 2);
    }
}
