//! Message records and the per-epoch sent log.

use serde::{Deserialize, Serialize};
use shroud_graph::NodeId;

/// One logged message, real or dummy.
///
/// `path` starts at the sender and ends at the recipient; hop `i` of the
/// path is traversed at epoch `t + i`. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    /// Epoch at which the message originated.
    pub t: u64,
    pub sender: NodeId,
    pub recipient: NodeId,
    pub id: u64,
    pub path: Vec<NodeId>,
    /// Epoch at which each path position is reached, truncated at the
    /// simulation horizon.
    pub hop_times: Vec<u64>,
    /// True iff emitted by the cover-traffic manager.
    pub dummy: bool,
    /// True iff emitted through a conversation thread.
    pub is_reply: bool,
}

/// Messages grouped by origination epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentLog {
    epochs: Vec<Vec<MessageRecord>>,
}

impl SentLog {
    /// An empty log covering `horizon` epochs.
    pub fn new(horizon: u64) -> Self {
        Self {
            epochs: vec![Vec::new(); horizon as usize],
        }
    }

    /// Number of epochs covered.
    pub fn horizon(&self) -> u64 {
        self.epochs.len() as u64
    }

    /// Append a record under its origination epoch.
    pub fn push(&mut self, record: MessageRecord) {
        let t = record.t as usize;
        debug_assert!(t < self.epochs.len());
        self.epochs[t].push(record);
    }

    /// Messages originated at epoch `t`.
    pub fn epoch(&self, t: u64) -> &[MessageRecord] {
        self.epochs
            .get(t as usize)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All messages in epoch order.
    pub fn iter(&self) -> impl Iterator<Item = &MessageRecord> {
        self.epochs.iter().flatten()
    }

    /// Total message count.
    pub fn total(&self) -> usize {
        self.epochs.iter().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(t: u64, id: u64) -> MessageRecord {
        MessageRecord {
            t,
            sender: NodeId(0),
            recipient: NodeId(1),
            id,
            path: vec![NodeId(0), NodeId(1)],
            hop_times: vec![t, t + 1],
            dummy: false,
            is_reply: false,
        }
    }

    #[test]
    fn push_groups_by_epoch() {
        let mut log = SentLog::new(5);
        log.push(record(2, 0));
        log.push(record(2, 1));
        log.push(record(4, 2));

        assert_eq!(log.epoch(2).len(), 2);
        assert_eq!(log.epoch(3).len(), 0);
        assert_eq!(log.epoch(4).len(), 1);
        assert_eq!(log.total(), 3);
    }

    #[test]
    fn out_of_range_epoch_is_empty() {
        let log = SentLog::new(2);
        assert!(log.epoch(10).is_empty());
    }

    #[test]
    fn record_serializes_camel_case() {
        let json = serde_json::to_string(&record(1, 9)).unwrap();
        assert!(json.contains("hopTimes"));
        assert!(json.contains("isReply"));
        assert!(json.contains("\"dummy\":false"));
    }
}
