//! CBC performance-scale engine: raw marks to percentages, percentages to
//! competency levels, and formative/summative composites for report cards.
//!
//! [`calc`] is the pure engine. [`ipc`] hosts it behind the `cbcgraded`
//! sidecar's JSON-lines protocol, seeded from an optional [`config`] preset.

pub mod calc;
pub mod config;
pub mod ipc;
