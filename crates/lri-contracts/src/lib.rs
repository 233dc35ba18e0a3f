//! # lri-contracts
//!
//! Shared types, records, and error contracts for the LRI identity
//! continuity runtime.
//!
//! Every crate in the workspace imports from here. No business logic lives
//! in this crate, only data definitions and error types.

pub mod audit;
pub mod authority;
pub mod cycle;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod outbound;
