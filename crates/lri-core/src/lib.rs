//! # lri-core
//!
//! The authorize-then-commit cycle engine for LRI agents.
//!
//! This crate provides:
//! - The collaborator traits (`ContinuityLedger`, `AuthorityPolicy`,
//!   `Transmitter`, `DecisionRecorder`, `Clock`)
//! - The drift scorer and the per-agent metrics cache
//! - The `CycleEngine` that sequences them per action
//!
//! ## Usage
//!
//! ```rust,ignore
//! use lri_core::{CycleEngine, MetricsStore};
//!
//! let engine = CycleEngine::new(ledger, gate, Arc::new(MetricsStore::new()));
//! let snapshot = engine.run_cycle(&ActionRequest::new("a1", "study").with_intention("learn"))?;
//! ```

pub mod drift;
pub mod engine;
pub mod metrics;
pub mod traits;

pub use engine::CycleEngine;
pub use metrics::MetricsStore;
