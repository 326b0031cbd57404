//! License and trial state.
//!
//! All time handling takes an explicit `now` in epoch milliseconds so the
//! logic can be tested without touching the wall clock; callers pass
//! `SystemTime`-derived values.

use serde::{Deserialize, Serialize};

const MS_PER_DAY: u64 = 86_400_000;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct License {
    pub pro: bool,
    /// Trial expiry as epoch milliseconds, if a trial was started.
    pub trial_expires_at: Option<u64>,
}

impl License {
    /// Pro features unlocked: either purchased or inside a running trial.
    pub fn is_active(&self, now_ms: u64) -> bool {
        self.pro || self.trial_expires_at.is_some_and(|expires| now_ms < expires)
    }

    /// Whole days of trial left, rounded up. Zero when no trial is running.
    pub fn trial_remaining_days(&self, now_ms: u64) -> u64 {
        match self.trial_expires_at {
            Some(expires) if expires > now_ms => (expires - now_ms).div_ceil(MS_PER_DAY),
            _ => 0,
        }
    }

    pub fn activate(&mut self) {
        self.pro = true;
        self.trial_expires_at = None;
    }

    pub fn start_trial(&mut self, now_ms: u64, days: u64) {
        self.pro = false;
        self.trial_expires_at = Some(now_ms + days * MS_PER_DAY);
    }

    pub fn revoke(&mut self) {
        *self = Self::default();
    }
}
