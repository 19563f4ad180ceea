//! Audit event history.
//!
//! Every operationally meaningful transition (a device appearing, going
//! silent, being commanded, confirming) is recorded as an [`Event`]. The
//! history is bounded; the oldest events are dropped first.

use std::collections::VecDeque;
use std::time::SystemTime;

use log::info;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
pub enum EventAction {
    /// A device was auto-discovered and appended to the registry.
    Added,
    /// A known device reported after being silent.
    Detected,
    /// A device stopped reporting.
    Silent,
    /// A new desired state was requested.
    Set,
    /// An unacknowledged command was sent again.
    Retry,
    /// A command was abandoned.
    Timeout,
    /// A device acknowledged the commanded state.
    Confirmed,
    /// A device changed state on its own.
    Changed,
    /// A device was switched on by hand.
    Operated,
    /// A pulse reached its deadline.
    Reset,
    /// The configuration was (re)applied.
    Activating,
}

/// A recorded audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: SystemTime,
    /// Either `DEVICE` or `CONFIG`.
    pub category: String,
    /// Name of the device (or subsystem) the event is about.
    pub name: String,
    pub action: EventAction,
    pub detail: String,
}

/// Bounded record of audit events.
#[derive(Debug, Clone)]
pub struct EventHistory {
    entries: VecDeque<Event>,
    max_entries: usize,
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHistory {
    pub const DEFAULT_MAX_ENTRIES: usize = 256;

    pub fn new() -> Self {
        Self::with_max_entries(Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries,
        }
    }

    /// Record an event and log it.
    pub fn record(
        &mut self,
        timestamp: SystemTime,
        category: &str,
        name: &str,
        action: EventAction,
        detail: impl Into<String>,
    ) {
        let detail = detail.into();
        info!("{category} {name} {action} {detail}");

        self.entries.push_back(Event {
            timestamp,
            category: category.to_string(),
            name: name.to_string(),
            action,
            detail,
        });

        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &Event> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&Event> {
        self.entries.back()
    }

    /// Number of recorded events with the given action.
    pub fn count(&self, action: EventAction) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_record_event() {
        let mut history = EventHistory::new();
        history.record(SystemTime::UNIX_EPOCH, "DEVICE", "porch", EventAction::Set, "on");

        assert_eq!(history.len(), 1);
        let event = history.last().unwrap();
        assert_eq!(event.name, "porch");
        assert_eq!(event.action, EventAction::Set);
        assert_eq!(event.detail, "on");
    }

    #[test]
    fn test_max_entries() {
        let mut history = EventHistory::with_max_entries(2);
        for i in 0..5 {
            history.record(
                SystemTime::UNIX_EPOCH,
                "DEVICE",
                &format!("wiz{i}"),
                EventAction::Added,
                "",
            );
        }
        assert_eq!(history.len(), 2);
        assert_eq!(history.entries().next().unwrap().name, "wiz3");
    }

    #[test]
    fn test_action_names() {
        let names: Vec<String> = EventAction::iter().map(|a| a.to_string()).collect();
        assert_eq!(names[0], "ADDED");
        assert!(names.contains(&"CONFIRMED".to_string()));
        assert!(names.iter().all(|n| n.chars().all(|c| c.is_ascii_uppercase())));
    }
}
