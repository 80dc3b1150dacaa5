use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// 半开区间 [start, end)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// 紧邻的前一个等长区间
    pub fn preceding(&self) -> DateRange {
        DateRange::new(self.start - self.duration(), self.start)
    }
}
