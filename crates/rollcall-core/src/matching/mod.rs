//! Matching model output against the known lots and student roster.

pub mod lots;
pub mod names;
