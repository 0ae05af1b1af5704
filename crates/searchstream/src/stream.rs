use std::time::Duration;

use uuid::Uuid;

use crate::errors::StreamFailure;
use crate::models::{SearchOutcome, SearchUpdate};

/// Normalized stream events exposed by `SearchStream`.
///
/// Every started stream emits `SearchStarted`, then zero or more `Update`
/// events in arrival order, then exactly one terminal event: `Completed`,
/// `TimedOut`, or `Failed`. Nothing is delivered after a terminal event for
/// that stream generation.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// First event for every stream.
    SearchStarted {
        stream_id: Uuid,
        query: String,
        thread_id: Option<Uuid>,
    },
    /// One decoded search record. `seq` starts at 0 and is strictly
    /// increasing within a generation.
    Update {
        stream_id: Uuid,
        seq: u64,
        update: SearchUpdate,
    },
    /// Terminal: the stream body ended normally (zero or more updates).
    Completed {
        stream_id: Uuid,
        outcome: SearchOutcome,
    },
    /// Terminal: no data arrived within the inactivity window. Carries the
    /// updates accumulated before the stream went silent.
    TimedOut {
        stream_id: Uuid,
        idle: Duration,
        partial: SearchOutcome,
    },
    /// Terminal: transport or service failure. Carries the updates
    /// accumulated before the failure.
    Failed {
        stream_id: Uuid,
        error: StreamFailure,
        partial: SearchOutcome,
    },
}

impl StreamEvent {
    /// Returns true if this event terminates the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::TimedOut { .. } | Self::Failed { .. }
        )
    }

    /// Returns the stream generation this event belongs to.
    pub fn stream_id(&self) -> Uuid {
        match self {
            Self::SearchStarted { stream_id, .. }
            | Self::Update { stream_id, .. }
            | Self::Completed { stream_id, .. }
            | Self::TimedOut { stream_id, .. }
            | Self::Failed { stream_id, .. } => *stream_id,
        }
    }

    /// Convenience accessor for `Update` contents.
    pub fn as_update(&self) -> Option<&SearchUpdate> {
        match self {
            Self::Update { update, .. } => Some(update),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_classification() {
        let stream_id = Uuid::from_u128(7);
        let started = StreamEvent::SearchStarted {
            stream_id,
            query: "q".into(),
            thread_id: None,
        };
        assert!(!started.is_terminal());
        assert!(started.as_update().is_none());

        let completed = StreamEvent::Completed {
            stream_id,
            outcome: SearchOutcome::default(),
        };
        assert!(completed.is_terminal());

        let timed_out = StreamEvent::TimedOut {
            stream_id,
            idle: Duration::from_secs(5),
            partial: SearchOutcome::default(),
        };
        assert!(timed_out.is_terminal());
        assert_eq!(timed_out.stream_id(), stream_id);
    }
}
