/// Fixed-capacity circular buffer.
///
/// Not synchronized; wrap in `parking_lot::Mutex` for cross-thread access.
/// Overflow drops the oldest elements so a slow reader always sees the most
/// recent audio.
#[derive(Debug)]
pub struct RingBuffer<T> {
    buffer: Vec<T>,
    read_index: usize,
    available: usize,
    dropped: u64,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![T::default(); capacity.max(1)],
            read_index: 0,
            available: 0,
            dropped: 0,
        }
    }

    /// Append elements, dropping the oldest on overflow.
    ///
    /// If `items` alone exceeds the capacity only its tail is kept.
    pub fn write(&mut self, items: &[T]) {
        let capacity = self.capacity();
        let items = if items.len() > capacity {
            self.dropped += (items.len() - capacity) as u64;
            &items[items.len() - capacity..]
        } else {
            items
        };
        if items.is_empty() {
            return;
        }

        let overflow = (self.available + items.len()).saturating_sub(capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % capacity;
            self.available -= overflow;
            self.dropped += overflow as u64;
        }

        let write_index = (self.read_index + self.available) % capacity;
        let first = items.len().min(capacity - write_index);
        self.buffer[write_index..write_index + first].copy_from_slice(&items[..first]);
        self.buffer[..items.len() - first].copy_from_slice(&items[first..]);
        self.available += items.len();
    }

    /// Move up to `out.len()` elements into `out`. Returns how many were copied.
    pub fn read_into(&mut self, out: &mut [T]) -> usize {
        let capacity = self.capacity();
        let count = out.len().min(self.available);
        let first = count.min(capacity - self.read_index);
        out[..first].copy_from_slice(&self.buffer[self.read_index..self.read_index + first]);
        out[first..count].copy_from_slice(&self.buffer[..count - first]);
        self.read_index = (self.read_index + count) % capacity;
        self.available -= count;
        count
    }

    /// Number of elements available for reading.
    pub fn count(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    /// Total elements discarded by overflow since creation or the last reset.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn reset(&mut self) {
        self.read_index = 0;
        self.available = 0;
        self.dropped = 0;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}
