//! Percentage-complete computation for a run.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Expected number of function results when the caller configures nothing.
pub const DEFAULT_TOTAL_EXPECTED: NonZeroU32 = match NonZeroU32::new(90) {
    Some(n) => n,
    None => unreachable!(),
};

/// `floor(min(current, total) / total * 100)`.
///
/// `total` is non-zero by construction, so there is no division-by-zero path.
pub fn percentage(current: u32, total: NonZeroU32) -> u8 {
    let total = u64::from(total.get());
    let clamped = u64::from(current).min(total);
    #[expect(clippy::cast_possible_truncation)]
    let pct = (clamped * 100 / total) as u8;
    pct
}

/// Progress snapshot handed to the reporting side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub percentage: u8,
    pub current: u32,
    pub total: u32,
}

impl Progress {
    pub fn compute(current: u32, total: NonZeroU32) -> Self {
        Self {
            percentage: percentage(current, total),
            current,
            total: total.get(),
        }
    }

    /// Fully complete progress at `total/total`.
    pub fn complete(total: NonZeroU32) -> Self {
        Self::compute(total.get(), total)
    }

    /// `"current/total"` label.
    pub fn label(&self) -> String {
        format!("{}/{}", self.current, self.total)
    }
}
