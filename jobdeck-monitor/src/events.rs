//! Session state-change signals
//!
//! The refresh loop and the action coordinator publish these on a broadcast
//! channel; the presentation layer re-renders when one arrives.

use jobdeck_core::domain::job::JobId;
use tokio::sync::broadcast;

use crate::scheduler::PollReport;

/// Capacity of the session event channel
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A POLLING cycle began
    PollStarted,
    /// A POLLING cycle finished and the cache holds its results
    PollCompleted(PollReport),
    /// A pending action for this job was created, resolved or cleared
    ActionUpdated(JobId),
}

pub type EventSender = broadcast::Sender<SessionEvent>;

/// Publishes an event; having no subscriber is not an error
pub(crate) fn publish(sender: &EventSender, event: SessionEvent) {
    let _ = sender.send(event);
}
