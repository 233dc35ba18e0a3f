//! # lri-observer
//!
//! Read-only audit views over LRI state.
//!
//! [`Observer`] exposes `snapshot`, `continuity`, `drift`, and
//! `authority_claims` for any subject, seen or not. Chain breakage shows up
//! as a `VerificationStatus` inside the report and as a missing
//! `continuity_verified` claim; it is never raised as an error.

pub mod claims;
pub mod observer;

pub use observer::Observer;

// ── Tests ─────────────────────────────────────────────────────────────────────
