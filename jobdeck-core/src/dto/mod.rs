//! Data Transfer Objects for the remote Jobs API
//!
//! Wire shapes of the Jobs 2.1 REST endpoints. Conversions into domain types
//! live next to the DTOs so the mapping rules stay in one place.

pub mod job;
pub mod run;
