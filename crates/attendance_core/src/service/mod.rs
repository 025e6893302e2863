//! Use-case services of the absence engine.
//!
//! # Responsibility
//! - Orchestrate sheet access into the per-run pipeline:
//!   normalize, filter cancellations, reconcile, notify.
//! - Keep callers (CLI, schedulers) decoupled from storage details.

pub mod cancellation;
pub mod notification;
pub mod reconcile_service;
pub mod run_service;
