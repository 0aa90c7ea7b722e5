//! Snapshot document written after every mutation.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::health::ChannelHealthRecord;

/// How many iterations a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LoopMode {
    Single,
    Times(u32),
    Infinite,
}

impl LoopMode {
    /// Whether iteration `n` (1-based) should run.
    pub fn allows(&self, iteration: u32) -> bool {
        match self {
            LoopMode::Single => iteration == 1,
            LoopMode::Times(n) => iteration <= *n,
            LoopMode::Infinite => true,
        }
    }
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopMode::Single => f.write_str("single"),
            LoopMode::Times(n) => write!(f, "loop-{}", n),
            LoopMode::Infinite => f.write_str("infinite"),
        }
    }
}

impl FromStr for LoopMode {
    type Err = String;

    /// Accepts `single`, `infinite`, `loop-N` and bare `N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "single" => return Ok(LoopMode::Single),
            "infinite" => return Ok(LoopMode::Infinite),
            _ => {}
        }
        let count = s.strip_prefix("loop-").unwrap_or(s);
        match count.parse::<u32>() {
            Ok(0) => Err("loop count must be at least 1".to_string()),
            Ok(1) => Ok(LoopMode::Single),
            Ok(n) => Ok(LoopMode::Times(n)),
            Err(_) => Err(format!("invalid loop mode '{}': expected single, infinite, loop-N or N", s)),
        }
    }
}

impl TryFrom<String> for LoopMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LoopMode> for String {
    fn from(mode: LoopMode) -> Self {
        mode.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub channels: Vec<ChannelHealthRecord>,
    /// Unix seconds.
    pub session_start: u64,
    /// Per-channel window in seconds.
    pub session_duration: u64,
    pub loop_mode: LoopMode,
    pub iteration: u32,
}

impl SessionSnapshot {
    pub fn new(
        channels: Vec<ChannelHealthRecord>,
        session_start: u64,
        session_duration: Duration,
        loop_mode: LoopMode,
        iteration: u32,
    ) -> Self {
        Self {
            channels,
            session_start,
            session_duration: session_duration.as_secs(),
            loop_mode,
            iteration: iteration.max(1),
        }
    }
}
