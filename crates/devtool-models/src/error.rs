//! Error types for the `devtool-models` crate.
//!
//! The challenge codec returns variants of [`ModelError`].

/// Errors produced when encoding or decoding model types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    /// The login challenge public key could not be encoded or decoded.
    #[error("invalid public key: {reason}")]
    InvalidPublicKey {
        /// Human-readable explanation.
        reason: String,
    },

    /// A sealed token could not be produced or opened.
    #[error("invalid sealed token: {reason}")]
    InvalidSealedToken {
        /// Human-readable explanation.
        reason: String,
    },
}

impl ModelError {
    pub(crate) fn public_key(reason: impl Into<String>) -> Self {
        Self::InvalidPublicKey {
            reason: reason.into(),
        }
    }

    pub(crate) fn sealed_token(reason: impl Into<String>) -> Self {
        Self::InvalidSealedToken {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_public_key() {
        let err = ModelError::public_key("modulus is not a decimal integer");
        assert_eq!(
            err.to_string(),
            "invalid public key: modulus is not a decimal integer"
        );
    }

    #[test]
    fn error_display_sealed_token() {
        let err = ModelError::sealed_token("not base64");
        assert_eq!(err.to_string(), "invalid sealed token: not base64");
    }
}
