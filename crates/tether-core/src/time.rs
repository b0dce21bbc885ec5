//! Fixed-rate simulation clock
//!
//! Servers and clients both step gameplay at a fixed tick rate. Frame deltas are
//! accumulated and converted into whole ticks; each tick is numbered so deltas and
//! snapshots can be ordered on the wire.

use serde::{Deserialize, Serialize};

/// Configuration for the simulation clock
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// How many simulated seconds pass per real second
    pub time_scale: f32,
    /// Maximum frame delta accepted, to prevent a spiral of death
    pub max_frame_delta: f32,
    /// Upper bound on ticks run for a single frame
    pub max_ticks_per_frame: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60,
            time_scale: 1.0,
            max_frame_delta: 0.25,
            max_ticks_per_frame: 8,
        }
    }
}

/// Fixed-step clock with a monotonically increasing tick counter
#[derive(Debug, Clone)]
pub struct TickClock {
    /// Configuration
    pub config: ClockConfig,
    /// Number of ticks simulated so far
    pub tick: u64,
    /// Simulated time in seconds
    pub elapsed: f64,
    /// Whether the clock is paused
    pub paused: bool,
    accumulator: f32,
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

impl TickClock {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            tick: 0,
            elapsed: 0.0,
            paused: false,
            accumulator: 0.0,
        }
    }

    /// Length of one tick in seconds
    pub fn tick_delta(&self) -> f32 {
        1.0 / self.config.tick_rate.max(1) as f32
    }

    /// Feed a raw frame delta and return how many ticks to simulate now
    pub fn advance(&mut self, raw_delta: f32) -> u32 {
        if self.paused {
            return 0;
        }

        let delta = raw_delta.clamp(0.0, self.config.max_frame_delta) * self.config.time_scale;
        self.accumulator += delta;

        let step = self.tick_delta();
        let mut ticks = 0;
        while self.accumulator >= step && ticks < self.config.max_ticks_per_frame {
            self.accumulator -= step;
            ticks += 1;
        }
        // Drop time that could not be simulated this frame rather than carrying it over.
        if ticks == self.config.max_ticks_per_frame {
            self.accumulator = self.accumulator.min(step);
        }

        self.tick += u64::from(ticks);
        self.elapsed += f64::from(ticks) * f64::from(step);
        ticks
    }

    /// Fraction of a tick left in the accumulator, for render interpolation
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.tick_delta()
    }

    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }
}
