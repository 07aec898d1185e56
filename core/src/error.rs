//! Rejections returned by the logical core
//!
//! Only two outcomes are recoverable: an assertion the numeric shadows refute,
//! and a check the exact structures cannot prove yet. Every other failure is an
//! internal invariant violation and panics with the context it was detected in.

use thiserror::Error;

/// Reasons an assertion or a check is not accepted
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The floating-point shadows do not satisfy the claim within epsilon.
    /// Raised before any exact structure is touched.
    #[error("numerically refuted: {claim} (residual {residual:.3e})")]
    Numeric { claim: String, residual: f64 },

    /// The claim is not (yet) implied by the exact knowledge. Not a proof of
    /// falsity.
    #[error("not proven: {claim}")]
    Logical { claim: String },
}

impl CoreError {
    pub fn numeric(claim: impl Into<String>, residual: f64) -> Self {
        CoreError::Numeric {
            claim: claim.into(),
            residual,
        }
    }

    pub fn logical(claim: impl Into<String>) -> Self {
        CoreError::Logical {
            claim: claim.into(),
        }
    }

    /// Whether the rejection came from the numeric model
    pub fn is_numeric(&self) -> bool {
        matches!(self, CoreError::Numeric { .. })
    }
}

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;
