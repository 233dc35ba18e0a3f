//! Authority rules and their TOML configuration schema.
//!
//! A rule looks at one `RuleInput` and either passes (`None`) or produces a
//! verdict (`Some`). The gate evaluates rules in order and the first `Some`
//! wins. The drift rule is built in and always runs first; every other rule
//! is declared in the policy file.

use serde::{Deserialize, Serialize};

use lri_contracts::{
    authority::{Context, Verdict},
    identity::IdentityRecord,
};

/// Default drift threshold above which critical actions are refused.
pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.5;

/// Default prefix that marks an action as critical.
pub const DEFAULT_CRITICAL_PREFIX: &str = "critical_";

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub record: &'a IdentityRecord,
    pub action: &'a str,
    pub context: &'a Context,
    pub drift_score: f64,
}

/// One predicate → verdict step in the authority chain.
pub trait AuthorityRule: Send + Sync {
    /// Stable identifier, reported in denials and logs.
    fn id(&self) -> &str;

    /// `Some(verdict)` if this rule decides the request, `None` to pass.
    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Verdict>;
}

fn deny(rule_id: &str, reason: String) -> Option<Verdict> {
    Some(Verdict::Denied {
        rule_id: rule_id.to_string(),
        reason,
    })
}

// ── Built-in rules ────────────────────────────────────────────────────────────

/// Refuse critical actions while drift is above `threshold`.
///
/// Strictly greater-than: a drift exactly at the threshold is allowed.
#[derive(Debug, Clone)]
pub struct DriftCriticalRule {
    pub threshold: f64,
    pub critical_prefix: String,
}

impl AuthorityRule for DriftCriticalRule {
    fn id(&self) -> &str {
        "drift-critical"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Verdict> {
        if input.drift_score > self.threshold && input.action.starts_with(&self.critical_prefix) {
            return deny(
                self.id(),
                format!(
                    "critical action '{}' refused: drift {:.3} exceeds threshold {:.3}",
                    input.action, input.drift_score, self.threshold
                ),
            );
        }
        None
    }
}

/// While `context[flag]` is `true`, refuse every action not in `allow`.
#[derive(Debug, Clone)]
pub struct ContextLockdownRule {
    pub id: String,
    pub flag: String,
    pub allow: Vec<String>,
}

impl AuthorityRule for ContextLockdownRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Verdict> {
        let locked = input
            .context
            .get(&self.flag)
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if locked && !self.allow.iter().any(|a| a == input.action) {
            return deny(
                &self.id,
                format!("context flag '{}' is set; '{}' is not permitted", self.flag, input.action),
            );
        }
        None
    }
}

/// Refuse actions with `action_prefix` until the trajectory has at least
/// `min_length` committed transitions.
#[derive(Debug, Clone)]
pub struct MinHistoryRule {
    pub id: String,
    pub action_prefix: String,
    pub min_length: usize,
}

impl AuthorityRule for MinHistoryRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Verdict> {
        if input.action.starts_with(&self.action_prefix) && input.record.len() < self.min_length {
            return deny(
                &self.id,
                format!(
                    "'{}' requires {} committed actions, subject has {}",
                    input.action,
                    self.min_length,
                    input.record.len()
                ),
            );
        }
        None
    }
}

/// Unconditionally refuse one action name.
#[derive(Debug, Clone)]
pub struct DenyActionRule {
    pub id: String,
    pub action: String,
    pub reason: Option<String>,
}

impl AuthorityRule for DenyActionRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> Option<Verdict> {
        if input.action == self.action {
            return deny(
                &self.id,
                self.reason
                    .clone()
                    .unwrap_or_else(|| format!("denied by rule '{}'", self.id)),
            );
        }
        None
    }
}

// ── TOML schema ───────────────────────────────────────────────────────────────

/// A rule as declared in the policy file.
///
/// ```toml
/// [[rules]]
/// kind = "context-lockdown"
/// flag = "lockdown"
/// allow = ["emergency_stop"]
///
/// [[rules]]
/// kind = "min-history"
/// action_prefix = "high_trust_"
/// min_length = 5
///
/// [[rules]]
/// kind = "deny-action"
/// action = "self_modify"
/// reason = "agents may not rewrite their own policy"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RuleSpec {
    ContextLockdown {
        id: Option<String>,
        flag: String,
        #[serde(default)]
        allow: Vec<String>,
    },
    MinHistory {
        id: Option<String>,
        action_prefix: String,
        min_length: usize,
    },
    DenyAction {
        id: Option<String>,
        action: String,
        reason: Option<String>,
    },
}

impl RuleSpec {
    /// Build the runtime rule, defaulting `id` to `<kind>-<position>`.
    pub fn build(&self, position: usize) -> Box<dyn AuthorityRule> {
        let default_id = |kind: &str| format!("{}-{}", kind, position);
        match self {
            RuleSpec::ContextLockdown { id, flag, allow } => Box::new(ContextLockdownRule {
                id: id.clone().unwrap_or_else(|| default_id("context-lockdown")),
                flag: flag.clone(),
                allow: allow.clone(),
            }),
            RuleSpec::MinHistory { id, action_prefix, min_length } => Box::new(MinHistoryRule {
                id: id.clone().unwrap_or_else(|| default_id("min-history")),
                action_prefix: action_prefix.clone(),
                min_length: *min_length,
            }),
            RuleSpec::DenyAction { id, action, reason } => Box::new(DenyActionRule {
                id: id.clone().unwrap_or_else(|| default_id("deny-action")),
                action: action.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_DRIFT_THRESHOLD
}

fn default_prefix() -> String {
    DEFAULT_CRITICAL_PREFIX.to_string()
}

/// The top-level structure deserialized from a TOML policy file.
///
/// Every field is optional; an empty document is the reference policy.
///
/// ```toml
/// drift_threshold = 0.5
/// critical_prefix = "critical_"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_threshold")]
    pub drift_threshold: f64,
    #[serde(default = "default_prefix")]
    pub critical_prefix: String,
    /// Evaluated in order after the drift rule. First match wins.
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            drift_threshold: DEFAULT_DRIFT_THRESHOLD,
            critical_prefix: DEFAULT_CRITICAL_PREFIX.to_string(),
            rules: Vec::new(),
        }
    }
}
