//! Jobdeck Core
//!
//! Core types shared by the Jobdeck crates.
//!
//! This crate contains:
//! - Domain types: monitored jobs, runs and their states
//! - DTOs: wire representations of the remote Jobs API

pub mod domain;
pub mod dto;
