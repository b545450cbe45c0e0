use std::time::Duration;

use serde::Deserialize;

// all times in seconds
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub sample_rate: u32, // offline rendering only; devices report their own
    pub lookahead_interval: f64, // scheduler wake-up period
    pub schedule_ahead: f64,
    pub start_offset: f64, // gap between play() and the first step
    pub smoothing: f64, // gain/pan time constant
    pub master_gain: f32,
    pub max_voices: usize,
    pub max_buses: usize, // tracks beyond this stay silent
    pub command_queue: usize,
    pub loop_horizon_bars: f64, // demo host rewinds past this bar
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            lookahead_interval: 0.025,
            schedule_ahead: 0.1,
            start_offset: 0.05,
            smoothing: 0.02,
            master_gain: 0.8,
            max_voices: 128,
            max_buses: 64,
            command_queue: 1024,
            loop_horizon_bars: 32.0,
        }
    }
}

impl EngineConfig {
    pub fn lookahead_duration(&self) -> Duration {
        Duration::from_secs_f64(self.lookahead_interval.max(0.001))
    }
}
