//! Tunables of the logical core

use serde::{Deserialize, Serialize};

/// Logical core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Tolerance for every comparison of numeric shadows
    pub epsilon: f64,

    /// Largest denominator a fractional angle offset may have. Exact candidates
    /// closer than `1 / max_denominator` could not be told apart by the shadows.
    pub max_denominator: i64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-9,
            max_denominator: 10_000,
        }
    }
}

impl CoreConfig {
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}
