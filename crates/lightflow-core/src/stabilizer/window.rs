//! Fixed-capacity rolling window used by every stabilizer.
//!
//! The window is allocated once and pre-seeded with a neutral value, so it is always
//! "full": the first frames after construction or `reset()` read the seed rather than
//! an undersized buffer.

/// Upper bound on window length (10 minutes at 60 fps)
pub const MAX_WINDOW_FRAMES: usize = 36_000;

/// Number of frames covering `seconds` at `frame_rate`, at least one
pub fn frames_for(seconds: f32, frame_rate: f32) -> usize {
    let frames = (seconds * frame_rate).round();
    if !frames.is_finite() || frames < 1.0 {
        return 1;
    }
    (frames as usize).min(MAX_WINDOW_FRAMES)
}

/// Ring buffer of the most recent `capacity` samples
#[derive(Debug, Clone)]
pub struct RollingWindow<T: Copy> {
    buffer: Vec<T>,
    /// Index of the oldest sample (and next write position)
    head: usize,
    seed: T,
}

impl<T: Copy> RollingWindow<T> {
    /// Create a window of `capacity` samples pre-filled with `seed`
    pub fn new(capacity: usize, seed: T) -> Self {
        let capacity = capacity.clamp(1, MAX_WINDOW_FRAMES);
        Self {
            buffer: vec![seed; capacity],
            head: 0,
            seed,
        }
    }

    /// Overwrite the oldest sample
    pub fn push(&mut self, value: T) {
        self.buffer[self.head] = value;
        self.head = (self.head + 1) % self.buffer.len();
    }

    /// Number of samples held
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Most recently pushed sample
    pub fn latest(&self) -> T {
        let idx = (self.head + self.buffer.len() - 1) % self.buffer.len();
        self.buffer[idx]
    }

    /// Samples from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let (newer, older) = self.buffer.split_at(self.head);
        older.iter().chain(newer.iter())
    }

    /// Refill with the seed value
    pub fn reset(&mut self) {
        let seed = self.seed;
        self.buffer.iter_mut().for_each(|slot| *slot = seed);
        self.head = 0;
    }
}

impl RollingWindow<f32> {
    /// Arithmetic mean of the window
    pub fn mean(&self) -> f32 {
        let sum: f32 = self.iter().sum();
        sum / self.buffer.len() as f32
    }

    /// Linearly weighted mean: the newest sample weighs `capacity`, the oldest 1
    pub fn weighted_mean(&self) -> f32 {
        let mut weighted = 0.0f64;
        let mut total = 0.0f64;
        for (i, value) in self.iter().enumerate() {
            let w = (i + 1) as f64;
            weighted += *value as f64 * w;
            total += w;
        }
        (weighted / total) as f32
    }
}
