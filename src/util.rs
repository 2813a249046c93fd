//! Utility functions for timing and debugging.

use std::fmt;
use std::time::Instant;

/// Scoped timer for one pipeline stage.
///
/// Close it with [`finish`](Self::finish) to log the stage outcome along
/// with the elapsed time. A timer dropped without finishing still logs
/// the bare elapsed time, so early returns are not lost.
///
/// ```ignore
/// let timer = StageTimer::stage("grow curve");
/// // ... work ...
/// timer.finish(format!("{} points", curve.len()));
/// ```
pub struct StageTimer {
    stage: &'static str,
    level: log::Level,
    start: Instant,
    done: bool,
}

impl StageTimer {
    /// Timer for a top-level pipeline stage; completion logs at INFO.
    pub fn stage(name: &'static str) -> Self {
        Self::at(log::Level::Info, name)
    }

    /// Timer for per-candidate inner work that runs many times per
    /// optimization; completion logs at DEBUG to keep INFO output small.
    pub fn inner(name: &'static str) -> Self {
        Self::at(log::Level::Debug, name)
    }

    fn at(level: log::Level, stage: &'static str) -> Self {
        log::trace!("{}...", stage);
        Self {
            stage,
            level,
            start: Instant::now(),
            done: false,
        }
    }

    /// Milliseconds since the stage began.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }

    /// Log the stage outcome and elapsed time, consuming the timer.
    pub fn finish(mut self, outcome: impl fmt::Display) {
        self.done = true;
        log::log!(
            self.level,
            "{}: {} in {:.1}ms",
            self.stage,
            outcome,
            self.elapsed_ms()
        );
    }
}

impl Drop for StageTimer {
    fn drop(&mut self) {
        if !self.done {
            log::log!(self.level, "{}: {:.1}ms", self.stage, self.elapsed_ms());
        }
    }
}
