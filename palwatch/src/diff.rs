use std::collections::HashSet;

use crate::snapshot::{PlayerRecord, Snapshot};

/// A change in presence between two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Joined(PlayerRecord),
    Left(PlayerRecord),
}

impl Event {
    pub fn record(&self) -> &PlayerRecord {
        match self {
            Event::Joined(record) | Event::Left(record) => record,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Joined(_) => "joined",
            Event::Left(_) => "left",
        }
    }
}

/// Joins and leaves between `previous` and `current`, keyed by player uid.
///
/// Joins come first in `current` order, then leaves in `previous` order.
/// Players present in both snapshots produce nothing, even if their other
/// fields changed.
pub fn diff(previous: &Snapshot, current: &Snapshot) -> Vec<Event> {
    let before: HashSet<u64> = previous.iter().map(PlayerRecord::uid).collect();
    let after: HashSet<u64> = current.iter().map(PlayerRecord::uid).collect();

    let joined = current
        .iter()
        .filter(|r| !before.contains(&r.uid()))
        .cloned()
        .map(Event::Joined);
    let left = previous
        .iter()
        .filter(|r| !after.contains(&r.uid()))
        .cloned()
        .map(Event::Left);

    joined.chain(left).collect()
}
