use std::time::{Duration, Instant};

/// Timing snapshot handed to timer callbacks.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StimTime {
    /// Seconds since the clock started.
    pub t: f64,
    /// Seconds since the previous tick.
    pub dt: f32,
    /// Tick counter, starting at 0.
    pub step: u64,
}

/// Clock driving the stimulus timer.
///
/// Elapsed time is measured from a fixed start, so it does not drift when ticks are late.
#[derive(Debug, Clone)]
pub struct StimClock {
    start: Instant,
    last: Instant,
    step: u64,
}

impl StimClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            start,
            last: start,
            step: 0,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.last.saturating_duration_since(self.start)
    }

    /// Seconds from the clock start to `instant`; zero for earlier instants.
    pub fn seconds_at(&self, instant: Instant) -> f64 {
        instant.saturating_duration_since(self.start).as_secs_f64()
    }

    pub fn tick(&mut self) -> StimTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`. Instants earlier than the last tick count as no time.
    pub fn tick_at(&mut self, now: Instant) -> StimTime {
        let now = now.max(self.last);
        let time = StimTime {
            t: now.duration_since(self.start).as_secs_f64(),
            dt: now.duration_since(self.last).as_secs_f32(),
            step: self.step,
        };
        self.last = now;
        self.step += 1;
        time
    }
}

impl Default for StimClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_count_from_start() {
        let start = Instant::now();
        let mut clock = StimClock::starting_at(start);

        let a = clock.tick_at(start + Duration::from_millis(50));
        assert_eq!(a.step, 0);
        assert!((a.t - 0.05).abs() < 1e-9);
        assert!((a.dt - 0.05).abs() < 1e-6);

        let b = clock.tick_at(start + Duration::from_millis(120));
        assert_eq!(b.step, 1);
        assert!((b.t - 0.12).abs() < 1e-9);
        assert!((b.dt - 0.07).abs() < 1e-6);
        assert_eq!(clock.elapsed(), Duration::from_millis(120));
    }

    #[test]
    fn instants_map_onto_the_clock() {
        let start = Instant::now() + Duration::from_secs(1);
        let clock = StimClock::starting_at(start);
        assert!((clock.seconds_at(start + Duration::from_millis(250)) - 0.25).abs() < 1e-9);
        assert_eq!(clock.seconds_at(start - Duration::from_millis(10)), 0.0);
    }

    #[test]
    fn time_never_goes_backwards() {
        let start = Instant::now();
        let mut clock = StimClock::starting_at(start);
        clock.tick_at(start + Duration::from_millis(100));
        let late = clock.tick_at(start + Duration::from_millis(10));
        assert_eq!(late.dt, 0.0);
        assert!((late.t - 0.1).abs() < 1e-9);
    }
}
