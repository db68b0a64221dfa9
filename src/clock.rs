//clock.rs - time sources for the stepper and the fps overlay

use std::time::{Duration, Instant};

pub trait Clock {
    //seconds since the previous call
    fn dt(&mut self) -> f64;
}

//wall clock at microsecond resolution
//the truncated remainder carries over to the next call instead of getting lost
pub struct TickCounter {
    last: Instant,
}

impl TickCounter {
    pub fn new() -> Self {
        Self { last: Instant::now() }
    }
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TickCounter {
    fn dt(&mut self) -> f64 {
        let micros = Instant::now().duration_since(self.last).as_micros() as u64;
        self.last += Duration::from_micros(micros);
        micros as f64 / 1e6
    }
}

//same step every call, for headless runs and tests
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub f64);

impl Clock for FixedClock {
    fn dt(&mut self) -> f64 {
        self.0
    }
}

//frames rendered in the last second and the best instantaneous rate seen
pub struct FramerateCounter {
    clock: Box<dyn Clock>,
    frames: usize,
    peak: usize,
    elapsed: f64,
    msg: String,
}

impl FramerateCounter {
    pub fn new(clock: Box<dyn Clock>) -> Self {
        Self { clock, frames: 0, peak: 0, elapsed: 0.0, msg: "unk/unk".to_string() }
    }

    pub fn update(&mut self) {
        let dt = self.clock.dt();
        self.elapsed += dt;
        if dt > 0.0 {
            let rate = (1.0 / dt) as usize;
            self.peak = self.peak.max(rate);
        }
        if self.elapsed > 1.0 {
            self.msg = format!("{}/{}", self.frames, self.peak);
            self.elapsed = 0.0;
            self.frames = 0;
            self.peak = 0;
        }
        self.frames += 1;
    }

    pub fn get(&self) -> &str {
        &self.msg
    }
}

impl Default for FramerateCounter {
    fn default() -> Self {
        Self::new(Box::new(TickCounter::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_repeats() {
        let mut clock = FixedClock(0.25);
        assert_eq!(clock.dt(), 0.25);
        assert_eq!(clock.dt(), 0.25);
    }

    #[test]
    fn tick_counter_is_monotonic() {
        let mut clock = TickCounter::new();
        let a = clock.dt();
        let b = clock.dt();
        assert!(a >= 0.0 && b >= 0.0);
    }

    #[test]
    fn framerate_reports_after_a_second() {
        let mut fps = FramerateCounter::new(Box::new(FixedClock(0.25)));
        assert_eq!(fps.get(), "unk/unk");
        for _ in 0..4 {
            fps.update();
        }
        assert_eq!(fps.get(), "unk/unk");
        fps.update();
        assert_eq!(fps.get(), "4/4");
    }
}
