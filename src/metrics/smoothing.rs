//! Rolling averages and power spike filtering.

use std::collections::VecDeque;

/// Fixed-window rolling average.
#[derive(Debug, Clone)]
pub struct RollingAverage {
    /// Buffer of recent values
    buffer: VecDeque<f32>,
    /// Window size in samples
    window_size: usize,
    /// Running sum
    sum: f64,
}

impl RollingAverage {
    /// Create a rolling average over `window_size` samples (at least one).
    pub fn new(window_size: usize) -> Self {
        let window_size = window_size.max(1);
        Self {
            buffer: VecDeque::with_capacity(window_size),
            window_size,
            sum: 0.0,
        }
    }

    /// 3-second window, used for the power readout.
    pub fn three_second() -> Self {
        Self::new(3)
    }

    /// 60-second window, used for threshold power estimation.
    pub fn sixty_second() -> Self {
        Self::new(60)
    }

    /// Add a value and return the current average.
    pub fn add(&mut self, value: f32) -> f32 {
        self.buffer.push_back(value);
        self.sum += value as f64;

        if self.buffer.len() > self.window_size {
            if let Some(old) = self.buffer.pop_front() {
                self.sum -= old as f64;
            }
        }

        self.average().unwrap_or_default()
    }

    /// Current average, `None` before the first value.
    pub fn average(&self) -> Option<f32> {
        if self.buffer.is_empty() {
            None
        } else {
            Some((self.sum / self.buffer.len() as f64) as f32)
        }
    }

    /// Whether a full window has been seen.
    pub fn is_full(&self) -> bool {
        self.buffer.len() >= self.window_size
    }

    /// Forget every value.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.sum = 0.0;
    }

    /// Number of values in the window.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Highest average over any `window` consecutive values.
///
/// Series shorter than the window are averaged whole.
pub fn best_window_average(values: &[f32], window: usize) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut rolling = RollingAverage::new(window);
    let mut best = f32::MIN;
    for &value in values {
        let avg = rolling.add(value);
        if rolling.is_full() {
            best = best.max(avg);
        }
    }
    if rolling.is_full() {
        Some(best)
    } else {
        rolling.average()
    }
}

/// Discards power readings above a noise ceiling.
#[derive(Debug, Clone)]
pub struct PowerFilter {
    /// Maximum valid power value
    max_power: f32,
    /// Previous valid value
    last_valid: Option<f32>,
}

impl PowerFilter {
    /// Filter with a 2000 W ceiling.
    pub fn new() -> Self {
        Self::with_max_power(2000.0)
    }

    /// Filter with a custom ceiling.
    pub fn with_max_power(max_power: f32) -> Self {
        Self {
            max_power,
            last_valid: None,
        }
    }

    /// Pass a reading through, replacing spikes with the last valid value.
    pub fn filter(&mut self, power: f32) -> f32 {
        if power.is_finite() && (0.0..=self.max_power).contains(&power) {
            self.last_valid = Some(power);
            power
        } else {
            tracing::debug!("Filtered power spike: {}", power);
            self.last_valid.unwrap_or_default()
        }
    }

    /// Reset the filter state.
    pub fn reset(&mut self) {
        self.last_valid = None;
    }
}

impl Default for PowerFilter {
    fn default() -> Self {
        Self::new()
    }
}
