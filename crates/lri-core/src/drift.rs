//! Identity drift: how far an agent's declared intentions diverge.
//!
//! `score = |distinct(intentions)| / |intentions|`, or `0.0` for an empty
//! history. The window is the whole history with no decay. A single sample
//! scores `1.0`; this is kept as-is rather than smoothed.

use std::collections::HashSet;

/// Compute the drift score of an intention sequence. Always in `[0, 1]`.
pub fn calculate<S: AsRef<str>>(intentions: &[S]) -> f64 {
    if intentions.is_empty() {
        return 0.0;
    }
    let distinct: HashSet<&str> = intentions.iter().map(|s| s.as_ref()).collect();
    distinct.len() as f64 / intentions.len() as f64
}
