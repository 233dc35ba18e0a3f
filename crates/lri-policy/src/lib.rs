//! # lri-policy
//!
//! A TOML-configurable authority gate for the LRI runtime.
//!
//! [`TomlAuthorityGate`] implements
//! [`AuthorityPolicy`](lri_core::traits::AuthorityPolicy). The built-in
//! drift rule always runs first; rules declared in the policy file follow in
//! order and the first one to return a verdict wins. Anything no rule
//! objects to is authorized.
//!
//! ```rust,ignore
//! use lri_policy::TomlAuthorityGate;
//!
//! let gate = TomlAuthorityGate::from_toml_str(r#"drift_threshold = 0.4"#)?;
//! ```

pub mod engine;
pub mod rule;

pub use engine::TomlAuthorityGate;
pub use rule::{AuthorityRule, PolicyConfig, RuleInput, RuleSpec};

// ── Tests ─────────────────────────────────────────────────────────────────────
