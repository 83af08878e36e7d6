use crate::{Error, Result};
use core::time::Duration;
use tokio::time::Instant;

/// A start/stop timer.
///
/// Starting a running stopwatch or stopping an idle one is a usage error and
/// is reported instead of silently ignored. Reads go through
/// [`tokio::time::Instant`] so paused-clock tests observe the same time the
/// runtime does.
#[derive(Debug, Default)]
pub struct Stopwatch {
    started_at: Option<Instant>,
}

impl Stopwatch {
    pub const fn new() -> Self {
        Self { started_at: None }
    }

    /// # Errors
    ///
    /// Returns [`Error::TimerAlreadyStarted`] if the stopwatch is running.
    pub fn start(&mut self) -> Result<()> {
        if self.started_at.is_some() {
            return Err(Error::TimerAlreadyStarted);
        }
        self.started_at = Some(Instant::now());
        Ok(())
    }

    /// Stops the stopwatch and returns the time it ran for.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimerNotStarted`] if the stopwatch is not running.
    pub fn stop(&mut self) -> Result<Duration> {
        let started_at = self.started_at.take().ok_or(Error::TimerNotStarted)?;
        Ok(started_at.elapsed())
    }

    /// Moves the starting point to now, starting the stopwatch if needed.
    pub fn restart(&mut self) {
        self.started_at = Some(Instant::now());
    }

    pub const fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    /// Time since the last start or restart; zero when not running.
    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map_or(Duration::ZERO, |started_at| started_at.elapsed())
    }

    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed().as_secs_f64() / 60.0
    }
}
