use rand::{Rng, seq::index};

/// One transition observed by a learner.
#[derive(Debug, Clone, PartialEq)]
pub struct Experience {
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Vec<f32>,
    pub terminal: bool,
}

/// Fixed-capacity FIFO ring buffer of experiences.
///
/// Once full, each push overwrites the oldest entry.
#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    buffer: Vec<Experience>,
    capacity: usize,
    position: usize,
}

impl ReplayBuffer {
    /// A buffer holding up to `capacity` experiences, at least one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: Vec::with_capacity(capacity),
            capacity,
            position: 0,
        }
    }

    pub fn push(&mut self, experience: Experience) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(experience);
        } else {
            self.buffer[self.position] = experience;
        }
        self.position = (self.position + 1) % self.capacity;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored experiences, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        let split = if self.buffer.len() < self.capacity {
            0
        } else {
            self.position
        };
        self.buffer[split..].iter().chain(&self.buffer[..split])
    }

    /// Uniform sample of `batch_size` distinct experiences.
    pub fn sample<R>(&self, rng: &mut R, batch_size: usize) -> Vec<&Experience>
    where
        R: Rng + ?Sized,
    {
        assert!(batch_size <= self.len(), "not enough experiences to sample");
        index::sample(rng, self.len(), batch_size)
            .iter()
            .map(|i| &self.buffer[i])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn experience(action: usize) -> Experience {
        Experience {
            state: vec![0.0; 4],
            action,
            reward: 0.0,
            next_state: vec![0.0; 4],
            terminal: false,
        }
    }

    #[test]
    fn test_len_bounded_by_capacity() {
        let mut buf = ReplayBuffer::new(3);
        assert!(buf.is_empty());
        for i in 0..10 {
            buf.push(experience(i));
            assert!(buf.len() <= 3);
        }
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let mut buf = ReplayBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        buf.push(experience(1));
        buf.push(experience(2));
        let actions = buf.iter().map(|e| e.action).collect::<Vec<_>>();
        assert_eq!(actions, vec![2]);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut buf = ReplayBuffer::new(4);
        for i in 0..5 {
            buf.push(experience(i));
        }
        let actions = buf.iter().map(|e| e.action).collect::<Vec<_>>();
        assert_eq!(actions, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_sample_distinct() {
        let mut buf = ReplayBuffer::new(10);
        for i in 0..10 {
            buf.push(experience(i));
        }
        let mut rng = Pcg32::seed_from_u64(0);
        let mut actions = buf
            .sample(&mut rng, 5)
            .into_iter()
            .map(|e| e.action)
            .collect::<Vec<_>>();
        actions.sort_unstable();
        actions.dedup();
        assert_eq!(actions.len(), 5);
    }
}
