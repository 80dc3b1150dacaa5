use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 规范化订单状态 (由原始状态文本推导, 不落库)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
    Unknown,
}

impl CanonicalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalStatus::Pending => "pending",
            CanonicalStatus::Preparing => "preparing",
            CanonicalStatus::Ready => "ready",
            CanonicalStatus::Completed => "completed",
            CanonicalStatus::Cancelled => "cancelled",
            CanonicalStatus::Unknown => "unknown",
        }
    }

    /// 仍在厨房流程中 (可能延误)
    pub fn is_in_progress(&self) -> bool {
        matches!(self, CanonicalStatus::Pending | CanonicalStatus::Preparing)
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(CanonicalStatus::Pending),
            "preparing" => Ok(CanonicalStatus::Preparing),
            "ready" => Ok(CanonicalStatus::Ready),
            "completed" => Ok(CanonicalStatus::Completed),
            "cancelled" | "canceled" => Ok(CanonicalStatus::Cancelled),
            "unknown" => Ok(CanonicalStatus::Unknown),
            other => Err(format!("unknown status bucket: {}", other)),
        }
    }
}
