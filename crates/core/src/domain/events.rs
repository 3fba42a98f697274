use super::head::{CloneInformation, Head};

/// Kind of change an event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    Created,
    Updated,
    Removed,
}

/// Notification from the server that heads of a repository changed.
///
/// Only used to pick between a targeted refresh and a full scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadEvent {
    event_type: EventType,
    heads: Vec<Head>,
}

impl HeadEvent {
    pub fn new(event_type: EventType, heads: Vec<Head>) -> Self {
        Self { event_type, heads }
    }

    /// Event for branches reported by name
    pub fn for_branches<I, S>(event_type: EventType, clone: &CloneInformation, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let heads = names
            .into_iter()
            .map(|name| Head::branch(clone.clone(), name))
            .collect();
        Self::new(event_type, heads)
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn heads(&self) -> &[Head] {
        &self.heads
    }

    pub fn is_removal(&self) -> bool {
        self.event_type == EventType::Removed
    }
}
