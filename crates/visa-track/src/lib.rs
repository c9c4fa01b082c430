//! Employee onboarding visa tracking: the four-step OPT document pipeline,
//! its progression engine, and the service facade consumed by HTTP and CLI
//! front ends.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
