//! Seeded random number generation.
//!
//! A small xorshift generator shared by weight initialization, epoch
//! shuffling, MADE degree assignment and Bernoulli sampling. Everything that
//! needs randomness takes a `&mut SimpleRng`, so a single seed reproduces a
//! whole experiment.

use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_STATE: u64 = 0x9e3779b97f4a7c15;

/// Xorshift64 generator. Not cryptographic.
#[derive(Debug, Clone)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    /// Create a new RNG with explicit seed (if zero, use a fixed value).
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { DEFAULT_STATE } else { seed };
        Self { state }
    }

    /// Create an RNG seeded from the current time.
    pub fn from_time() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self::new(nanos)
    }

    /// Seeded when `seed` is given, clock-seeded otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_time, Self::new)
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        (x >> 32) as u32
    }

    /// Uniform in [0, 1). Uses the top 24 bits so the result is exactly
    /// representable and never rounds up to 1.0.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }

    /// Uniform sample in [low, high).
    pub fn gen_range_f32(&mut self, low: f32, high: f32) -> f32 {
        low + (high - low) * self.next_f32()
    }

    /// Integer sample in [0, upper).
    pub fn gen_usize(&mut self, upper: usize) -> usize {
        if upper == 0 {
            0
        } else {
            (self.next_u32() as usize) % upper
        }
    }

    /// Integer sample in [low, high], both ends included.
    pub fn gen_inclusive(&mut self, low: usize, high: usize) -> usize {
        debug_assert!(low <= high);
        low + self.gen_usize(high - low + 1)
    }

    /// Draws 1 with probability `p`, 0 otherwise.
    pub fn bernoulli(&mut self, p: f32) -> u8 {
        u8::from(self.next_f32() < p)
    }

    /// Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, data: &mut [T]) {
        if data.len() <= 1 {
            return;
        }
        for i in (1..data.len()).rev() {
            let j = self.gen_usize(i + 1);
            data.swap(i, j);
        }
    }
}
