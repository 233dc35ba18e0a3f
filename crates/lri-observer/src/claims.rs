//! Derivation of authority claims from an agent's committed state.

/// Held by every agent known to the runtime.
pub const AUTHORIZED_AGENT: &str = "authorized_agent";

/// Held while drift stays below `LOW_DRIFT_BOUND`.
pub const LOW_DRIFT_CERTIFIED: &str = "low_drift_certified";

/// Held while the agent's hash chain recomputes exactly.
pub const CONTINUITY_VERIFIED: &str = "continuity_verified";

pub const LOW_DRIFT_BOUND: f64 = 0.2;

/// Claims for an agent with the given drift and chain status, in a fixed
/// order.
pub fn derive(drift_score: f64, chain_verified: bool) -> Vec<String> {
    let mut claims = vec![AUTHORIZED_AGENT.to_string()];
    if drift_score < LOW_DRIFT_BOUND {
        claims.push(LOW_DRIFT_CERTIFIED.to_string());
    }
    if chain_verified {
        claims.push(CONTINUITY_VERIFIED.to_string());
    }
    claims
}
