//! Scheduler layer for the dashboard
//!
//! Drives polling of every registered job, on demand or on a timer, and
//! reconciles pending actions after each cycle. It is the only place where
//! cache entries are refreshed from the remote API.

pub mod refresh;

pub use refresh::{AutoRefresh, LoopState, PollReport, RefreshLoop};
