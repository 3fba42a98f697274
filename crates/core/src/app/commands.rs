use crate::domain::events::HeadEvent;
use crate::domain::head::Head;

/// Commands that can be sent to the sync service
#[derive(Debug, Clone)]
pub enum Command {
    /// List every enabled category and prune heads that disappeared
    FullScan,

    /// Refresh one known head without pruning
    Refresh { head: Head },

    /// React to a change notification from the server
    HandleEvent { event: HeadEvent },

    /// Produce the checkout configuration of a known head
    Build { head: Head },
}

