//! Raw roster parsing and per-run aggregation.
//!
//! # Responsibility
//! - Parse course descriptors and absent-student lists scraped from the portal.
//! - Produce one aggregated absence record per student for a time slot.
//!
//! # Invariants
//! - Parsing problems are dropped per roster row and never abort a run.

pub mod normalizer;
pub mod parse;
