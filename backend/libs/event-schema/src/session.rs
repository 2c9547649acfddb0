use crate::{EventRecord, EventType, ItemId, SessionId};
use std::collections::BTreeMap;

/// All events of one session, ordered by ascending timestamp.
///
/// Events sharing a timestamp keep the order they had in the chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionBatch {
    session_id: SessionId,
    events: Vec<EventRecord>,
}

impl SessionBatch {
    pub fn new(session_id: SessionId, mut events: Vec<EventRecord>) -> Self {
        events.retain(|event| event.session_id == session_id);
        events.sort_by_key(|event| event.timestamp);
        Self { session_id, events }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// The last `n` events of the session (all of them if shorter)
    pub fn tail(&self, n: usize) -> &[EventRecord] {
        let start = self.events.len().saturating_sub(n);
        &self.events[start..]
    }

    /// Chronological `(item, type)` history used on the serving path
    pub fn history(&self) -> SessionHistory {
        SessionHistory {
            session_id: self.session_id,
            events: self
                .events
                .iter()
                .map(|event| HistoryEvent::new(event.item_id, event.event_type))
                .collect(),
        }
    }
}

/// Group a chunk's records into per-session batches, ascending by session id
pub fn group_sessions<I>(records: I) -> Vec<SessionBatch>
where
    I: IntoIterator<Item = EventRecord>,
{
    let mut by_session: BTreeMap<SessionId, Vec<EventRecord>> = BTreeMap::new();
    for record in records {
        by_session.entry(record.session_id).or_default().push(record);
    }

    by_session
        .into_iter()
        .map(|(session_id, events)| SessionBatch::new(session_id, events))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEvent {
    pub item_id: ItemId,
    pub event_type: EventType,
}

impl HistoryEvent {
    pub fn new(item_id: ItemId, event_type: EventType) -> Self {
        Self {
            item_id,
            event_type,
        }
    }
}

/// A session request on the serving path: chronological interactions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHistory {
    pub session_id: SessionId,
    pub events: Vec<HistoryEvent>,
}

impl SessionHistory {
    pub fn new(session_id: SessionId, events: Vec<HistoryEvent>) -> Self {
        Self { session_id, events }
    }
}
