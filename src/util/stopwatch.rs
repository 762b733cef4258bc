use std::time::{Duration, Instant};

/// Wall-clock stopwatch that starts running as soon as it is created.
#[derive(Debug, Clone, Copy)]
pub struct StopWatch {
    started_at: Instant,
}

impl StopWatch {
    pub fn start() -> Self {
        Self {
            started_at: Instant::now(),
        }
    }

    /// Reset the start point to now
    pub fn restart(&mut self) {
        self.started_at = Instant::now();
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Consume the stopwatch and return the measured duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl Default for StopWatch {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_stopwatch_measures_sleep() {
        let watch = StopWatch::start();
        thread::sleep(Duration::from_millis(20));
        assert!(watch.stop() >= Duration::from_millis(20));
    }

    #[test]
    fn test_stopwatch_restart() {
        let mut watch = StopWatch::start();
        thread::sleep(Duration::from_millis(30));
        watch.restart();
        assert!(watch.elapsed() < Duration::from_millis(30));
    }
}
