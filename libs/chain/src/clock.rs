//! Block clock driving interest accrual

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockClock {
    pub number: u64,
    pub timestamp: u64,
}

impl BlockClock {
    pub fn new(number: u64, timestamp: u64) -> Self {
        Self { number, timestamp }
    }

    /// Advance `blocks` blocks, each `interval_secs` apart
    pub fn mine(&mut self, blocks: u64, interval_secs: u64) {
        self.number = self.number.saturating_add(blocks);
        self.timestamp = self
            .timestamp
            .saturating_add(blocks.saturating_mul(interval_secs));
    }
}

impl Default for BlockClock {
    fn default() -> Self {
        Self::new(1, 1_700_000_000)
    }
}
