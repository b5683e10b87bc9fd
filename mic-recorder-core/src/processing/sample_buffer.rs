use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// A batch the buffer refused because it would exceed the hard limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    pub rejected: usize,
}

/// Thread-safe accumulator for captured audio samples.
///
/// Shared as `Arc<SampleBuffer>` between the real-time callback (sole
/// appender) and the control thread (sole drainer).
///
/// Storage is a pre-reserved `Vec<f32>`. Appends within the reservation never
/// allocate; appends past it may reallocate. With a hard limit set, a batch
/// that does not fit is rejected whole and counted, never truncated.
#[derive(Debug)]
pub struct SampleBuffer {
    samples: Mutex<Vec<f32>>,
    reserve: usize,
    limit: Option<usize>,
    overflowed: AtomicU64,
}

impl SampleBuffer {
    /// Unbounded buffer with `reserve` samples of capacity up front.
    pub fn new(reserve: usize) -> Self {
        Self::with_limit(reserve, None)
    }

    pub fn with_limit(reserve: usize, limit: Option<usize>) -> Self {
        let reserve = match limit {
            Some(max) => reserve.min(max),
            None => reserve,
        };
        Self {
            samples: Mutex::new(Vec::with_capacity(reserve)),
            reserve,
            limit,
            overflowed: AtomicU64::new(0),
        }
    }

    /// Append one block in order, as a single critical section.
    pub fn append(&self, samples: &[f32]) -> Result<(), Overflow> {
        if samples.is_empty() {
            return Ok(());
        }

        let mut buffer = self.samples.lock();
        if let Some(limit) = self.limit {
            if buffer.len() + samples.len() > limit {
                drop(buffer);
                self.overflowed
                    .fetch_add(samples.len() as u64, Ordering::Relaxed);
                return Err(Overflow {
                    rejected: samples.len(),
                });
            }
        }
        buffer.extend_from_slice(samples);
        Ok(())
    }

    /// Take every buffered sample, leaving the buffer empty and re-reserved.
    ///
    /// The replacement storage is allocated before the lock is taken.
    pub fn drain_all(&self) -> Vec<f32> {
        let replacement = Vec::with_capacity(self.reserve);
        let mut buffer = self.samples.lock();
        std::mem::replace(&mut *buffer, replacement)
    }

    /// Discard buffered samples without returning them.
    pub fn clear(&self) {
        self.samples.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Samples that fit without reallocating.
    pub fn capacity(&self) -> usize {
        self.samples.lock().capacity()
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Total samples rejected by the hard limit since construction.
    pub fn overflowed_samples(&self) -> u64 {
        self.overflowed.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn append_then_drain() {
        let buf = SampleBuffer::new(16);
        buf.append(&[1.0, 2.0, 3.0]).unwrap();
        buf.append(&[4.0]).unwrap();

        assert_eq!(buf.len(), 4);
        assert_eq!(buf.drain_all(), vec![1.0, 2.0, 3.0, 4.0]);
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_restores_reservation() {
        let buf = SampleBuffer::new(32);
        buf.append(&[0.5; 8]).unwrap();
        let _ = buf.drain_all();
        assert!(buf.capacity() >= 32);
    }

    #[test]
    fn grows_past_reservation_when_unbounded() {
        let buf = SampleBuffer::new(2);
        buf.append(&[0.0; 10]).unwrap();
        assert_eq!(buf.len(), 10);
        assert_eq!(buf.overflowed_samples(), 0);
    }

    #[test]
    fn limit_rejects_whole_batch() {
        let buf = SampleBuffer::with_limit(4, Some(4));
        buf.append(&[1.0, 2.0, 3.0]).unwrap();

        let err = buf.append(&[4.0, 5.0]).unwrap_err();
        assert_eq!(err.rejected, 2);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.overflowed_samples(), 2);

        // A batch that still fits is accepted.
        buf.append(&[4.0]).unwrap();
        assert_eq!(buf.drain_all(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn empty_operations() {
        let buf = SampleBuffer::new(0);
        buf.append(&[]).unwrap();
        assert!(buf.is_empty());
        assert!(buf.drain_all().is_empty());
        buf.clear();
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn concurrent_batches_never_interleave() {
        let buf = Arc::new(SampleBuffer::new(0));
        let writers: Vec<_> = (0..4)
            .map(|id| {
                let buf = Arc::clone(&buf);
                thread::spawn(move || {
                    let block = [id as f32; 64];
                    for _ in 0..100 {
                        buf.append(&block).unwrap();
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        let samples = buf.drain_all();
        assert_eq!(samples.len(), 4 * 64 * 100);
        for block in samples.chunks(64) {
            assert!(block.iter().all(|&s| s == block[0]));
        }
    }
}
