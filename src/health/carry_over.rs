//! Longitudinal history carried between iterations.

use std::collections::HashMap;

use crate::health::record::ChannelHealthRecord;
use crate::storage::Channel;

#[derive(Debug, Clone, Default, PartialEq)]
struct History {
    disconnects: Vec<u64>,
    buffering_events: Vec<f64>,
}

/// Disconnect and buffering history from a previous iteration, by stream URL.
///
/// Ids are handed out per process, so a resumed snapshot can only be
/// matched on the URL the store dedups on.
#[derive(Debug, Clone, Default)]
pub struct CarryOver {
    history: HashMap<String, History>,
}

impl CarryOver {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_records(records: &[ChannelHealthRecord]) -> Self {
        let history = records
            .iter()
            .map(|r| {
                (
                    r.url.clone(),
                    History {
                        disconnects: r.disconnects.clone(),
                        buffering_events: r.buffering_events.clone(),
                    },
                )
            })
            .collect();
        Self { history }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// A pending record for `channel`, keeping any prior history.
    pub fn seed(&self, channel: &Channel) -> ChannelHealthRecord {
        let mut record = ChannelHealthRecord::pending(channel);
        if let Some(prior) = self.history.get(&channel.url) {
            record.disconnects = prior.disconnects.clone();
            record.buffering_events = prior.buffering_events.clone();
            record.finish_window();
        }
        record
    }
}
