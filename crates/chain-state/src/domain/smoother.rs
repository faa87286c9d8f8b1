//! # Smoother
//!
//! Fixed-capacity FIFO of recent samples exposing their arithmetic mean.

use std::collections::VecDeque;

/// Moving average over the last `capacity` samples.
#[derive(Clone, Debug)]
pub struct Smoother {
    window: VecDeque<f64>,
    capacity: usize,
}

impl Smoother {
    /// Create an empty smoother. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Create a smoother whose window starts with the first observed value.
    pub fn seeded(capacity: usize, first: f64) -> Self {
        let mut smoother = Self::new(capacity);
        smoother.push(first);
        smoother
    }

    /// Append a sample, evicting the oldest once the window is full.
    pub fn push(&mut self, value: f64) {
        if !value.is_finite() {
            tracing::debug!(value, "Non-finite sample dropped");
            return;
        }
        self.window.push_back(value);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
    }

    /// Mean of the retained samples, rounded to `rounding_digits` decimals
    /// when given. An empty window reads as 0.
    pub fn value(&self, rounding_digits: Option<u32>) -> f64 {
        if self.window.is_empty() {
            return 0.0;
        }
        let mean = self.window.iter().sum::<f64>() / self.window.len() as f64;
        match rounding_digits {
            Some(digits) => round_to(mean, digits),
            None => mean,
        }
    }

    /// Most recently pushed sample.
    pub fn latest(&self) -> Option<f64> {
        self.window.back().copied()
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether no sample has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Window capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Round to a fixed number of decimal places.
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits.min(15) as i32);
    (value * factor).round() / factor
}
