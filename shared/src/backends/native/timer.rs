use std::time::{Duration, Instant};

/// A Timer with a given duration after which it will enter into a "Ringing"
/// state. The Timer can be reset at an given time, or manually set to start
/// "Ringing" again.
pub struct Timer {
    duration: Duration,
    last: Option<Instant>,
}

impl Timer {
    /// Creates a new Timer with a given Duration
    pub fn new(duration: Duration) -> Self {
        Timer {
            last: Some(Instant::now()),
            duration,
        }
    }

    /// Creates a new Timer that is already ringing
    pub fn new_ringing(duration: Duration) -> Self {
        let mut timer = Timer::new(duration);
        timer.ring_manual();
        timer
    }

    /// Reset the Timer to stop ringing and wait till 'Duration' has elapsed
    /// again
    pub fn reset(&mut self) {
        self.last = Some(Instant::now());
    }

    /// Gets whether or not the Timer is "Ringing" (i.e. the given Duration has
    /// elapsed since the last "reset")
    pub fn ringing(&self) -> bool {
        match self.last {
            Some(last) => Instant::now().saturating_duration_since(last) >= self.duration,
            None => true,
        }
    }

    /// Manually causes the Timer to enter into a "Ringing" state
    pub fn ring_manual(&mut self) {
        self.last = None;
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}
