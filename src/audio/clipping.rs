//! Opt-in clipping flag: raised once the time-domain buffer has touched a
//! rail (byte 0 or 255) for a run of consecutive polls. Disabled, it always
//! reports false.

use crate::config::ClippingConfig;

#[derive(Clone, Debug)]
pub struct ClippingDetector {
    enabled: bool,
    required: u32,
    run: u32,
}

impl ClippingDetector {
    pub fn new(config: &ClippingConfig) -> Self {
        Self {
            enabled: config.enabled,
            required: config.consecutive_polls.max(1),
            run: 0,
        }
    }

    pub fn update(&mut self, time: &[u8]) -> bool {
        if !self.enabled {
            return false;
        }
        if time.iter().any(|&v| v == 0 || v == u8::MAX) {
            self.run = self.run.saturating_add(1);
        } else {
            self.run = 0;
        }
        self.run >= self.required
    }
}
