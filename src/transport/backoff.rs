use rand::Rng;
use std::time::Duration;

/// Exponential reconnect backoff with randomized jitter.
///
/// Delay for attempt `n` is `min * factor^n`, shifted up or down by a random
/// share (`jitter`) of itself, then capped at `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    factor: f64,
    jitter: f64,
    attempts: u32,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration, factor: f64, jitter: f64) -> Self {
        Self {
            min,
            max,
            factor: factor.max(1.0),
            jitter: jitter.clamp(0.0, 1.0),
            attempts: 0,
        }
    }

    /// Delay before the next attempt; advances the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let mut millis = self.min.as_millis() as f64 * self.factor.powi(self.attempts as i32);
        self.attempts = self.attempts.saturating_add(1);

        if self.jitter > 0.0 {
            let mut rng = rand::thread_rng();
            let deviation = (rng.gen::<f64>() * self.jitter * millis).floor();
            millis = if rng.gen_bool(0.5) {
                millis + deviation
            } else {
                millis - deviation
            };
        }

        let capped = millis.min(self.max.as_millis() as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Attempts made since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
