//! TOML-driven authority gate.
//!
//! `TomlAuthorityGate` loads a `PolicyConfig` from a TOML string or file and
//! implements the `AuthorityPolicy` trait from lri-core.
//!
//! Evaluation algorithm:
//!
//! 1. Run the built-in drift rule: critical actions are refused while the
//!    pre-action drift is strictly above the threshold.
//! 2. Run each configured rule in declaration order. The first one that
//!    returns a verdict decides.
//! 3. If no rule decides → `Authorized`.

use std::path::Path;

use tracing::{debug, warn};

use lri_contracts::{
    authority::{Context, Verdict},
    error::{LriError, LriResult},
    identity::IdentityRecord,
};
use lri_core::traits::AuthorityPolicy;

use crate::rule::{AuthorityRule, DriftCriticalRule, PolicyConfig, RuleInput};

/// An `AuthorityPolicy` built from an ordered chain of rules.
///
/// ```rust,ignore
/// use lri_policy::TomlAuthorityGate;
///
/// let gate = TomlAuthorityGate::from_file(Path::new("policy.toml"))?;
/// ```
pub struct TomlAuthorityGate {
    threshold: f64,
    rules: Vec<Box<dyn AuthorityRule>>,
}

impl TomlAuthorityGate {
    /// Build a gate from an already-parsed config.
    ///
    /// Returns `LriError::ConfigError` if the threshold is outside `[0, 1]`
    /// or the critical prefix is empty.
    pub fn from_config(config: PolicyConfig) -> LriResult<Self> {
        if !(0.0..=1.0).contains(&config.drift_threshold) {
            return Err(LriError::ConfigError {
                reason: format!(
                    "drift_threshold must be within [0, 1], got {}",
                    config.drift_threshold
                ),
            });
        }
        if config.critical_prefix.is_empty() {
            return Err(LriError::ConfigError {
                reason: "critical_prefix must not be empty".to_string(),
            });
        }

        let mut rules: Vec<Box<dyn AuthorityRule>> = Vec::with_capacity(config.rules.len() + 1);
        rules.push(Box::new(DriftCriticalRule {
            threshold: config.drift_threshold,
            critical_prefix: config.critical_prefix.clone(),
        }));
        for (position, spec) in config.rules.iter().enumerate() {
            rules.push(spec.build(position + 1));
        }

        Ok(Self {
            threshold: config.drift_threshold,
            rules,
        })
    }

    /// Parse `s` as TOML and build a gate.
    pub fn from_toml_str(s: &str) -> LriResult<Self> {
        let config: PolicyConfig = toml::from_str(s).map_err(|e| LriError::ConfigError {
            reason: format!("failed to parse policy TOML: {}", e),
        })?;
        Self::from_config(config)
    }

    /// Read the file at `path` and parse it as a TOML policy.
    pub fn from_file(path: &Path) -> LriResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| LriError::ConfigError {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Append a custom rule to the end of the chain.
    pub fn push_rule(&mut self, rule: Box<dyn AuthorityRule>) {
        self.rules.push(rule);
    }

    /// Rule identifiers in evaluation order.
    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }
}

impl Default for TomlAuthorityGate {
    /// The reference policy: threshold 0.5, prefix `critical_`, no extra rules.
    fn default() -> Self {
        Self {
            threshold: crate::rule::DEFAULT_DRIFT_THRESHOLD,
            rules: vec![Box::new(DriftCriticalRule {
                threshold: crate::rule::DEFAULT_DRIFT_THRESHOLD,
                critical_prefix: crate::rule::DEFAULT_CRITICAL_PREFIX.to_string(),
            })],
        }
    }
}

impl std::fmt::Debug for TomlAuthorityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TomlAuthorityGate")
            .field("threshold", &self.threshold)
            .field("rules", &self.rule_ids())
            .finish()
    }
}

impl AuthorityPolicy for TomlAuthorityGate {
    fn authorize(
        &self,
        record: &IdentityRecord,
        action: &str,
        context: &Context,
        drift_score: f64,
    ) -> LriResult<Verdict> {
        debug!(
            subject_id = %record.subject_id,
            action = %action,
            drift_score,
            "evaluating authority"
        );

        let input = RuleInput {
            record,
            action,
            context,
            drift_score,
        };

        for rule in &self.rules {
            if let Some(verdict) = rule.evaluate(&input) {
                if let Verdict::Denied { reason, .. } = &verdict {
                    warn!(
                        subject_id = %record.subject_id,
                        rule_id = %rule.id(),
                        action = %action,
                        reason = %reason,
                        "authority rule denied action"
                    );
                }
                return Ok(verdict);
            }
        }

        Ok(Verdict::Authorized)
    }

    fn drift_threshold(&self) -> f64 {
        self.threshold
    }
}
