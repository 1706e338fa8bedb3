/// Which percentages a [`PercentTracker`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStep {
    /// Every change of the whole percentage.
    EveryPercent,
    /// Only multiples of ten, bounding a transfer to ten events.
    Tens,
}

/// Turns a running byte count into a monotonic series of percentages.
///
/// Starts from 0 (which is never reported) and only reports values
/// strictly above the last one reported. With an unknown or zero total it
/// never reports anything.
#[derive(Debug, Clone)]
pub struct PercentTracker {
    total: u64,
    step: ProgressStep,
    ceiling: u8,
    last: u8,
}

impl PercentTracker {
    pub fn new(total: Option<u64>, step: ProgressStep) -> Self {
        Self {
            total: total.unwrap_or(0),
            step,
            ceiling: 100,
            last: 0,
        }
    }

    /// Caps reported values, e.g. at 99 to keep 100 for confirmed completion.
    pub fn with_ceiling(mut self, ceiling: u8) -> Self {
        self.ceiling = ceiling.min(100);
        self
    }

    /// Feeds the cumulative byte count; returns the percentage to report, if any.
    pub fn update(&mut self, transferred: u64) -> Option<u8> {
        if self.total == 0 {
            return None;
        }

        let done = transferred.min(self.total) as u128;
        let percent = ((done * 100) / self.total as u128) as u8;
        let percent = percent.min(self.ceiling);

        if percent <= self.last {
            return None;
        }
        if self.step == ProgressStep::Tens && percent % 10 != 0 {
            return None;
        }

        self.last = percent;
        Some(percent)
    }

    /// Last reported percentage (0 if none yet).
    pub fn last(&self) -> u8 {
        self.last
    }
}
