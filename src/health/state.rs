//! Channel status state machine.
//!
//! # State Transitions
//! ```text
//! Pending → Testing: channel picked up by the orchestrator
//! Testing → Pass:    window finished with no buffering or error events
//! Testing → Issue:   window finished with at least one event
//! Testing → Error:   the probe could not run at all
//! ```
//!
//! Anything else is rejected; a fresh iteration starts from a new record.

use serde::{Deserialize, Serialize};

use crate::probe::ContinuousStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    #[default]
    Pending,
    Testing,
    Pass,
    Issue,
    Error,
}

impl ChannelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelStatus::Pending => "pending",
            ChannelStatus::Testing => "testing",
            ChannelStatus::Pass => "pass",
            ChannelStatus::Issue => "issue",
            ChannelStatus::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChannelStatus::Pass | ChannelStatus::Issue | ChannelStatus::Error)
    }

    pub fn can_transition_to(&self, next: ChannelStatus) -> bool {
        matches!(
            (self, next),
            (ChannelStatus::Pending, ChannelStatus::Testing)
                | (ChannelStatus::Testing, ChannelStatus::Pass)
                | (ChannelStatus::Testing, ChannelStatus::Issue)
                | (ChannelStatus::Testing, ChannelStatus::Error)
        )
    }
}

impl From<ContinuousStatus> for ChannelStatus {
    fn from(status: ContinuousStatus) -> Self {
        match status {
            ContinuousStatus::Pass => ChannelStatus::Pass,
            ContinuousStatus::Issue => ChannelStatus::Issue,
            ContinuousStatus::Error => ChannelStatus::Error,
        }
    }
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
