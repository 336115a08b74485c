//! Core domain types
//!
//! These types are what the monitor caches and what the presentation layer
//! renders. They are produced from the wire DTOs by the client crate and are
//! never mutated once received.

pub mod job;
pub mod run;
