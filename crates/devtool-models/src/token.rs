//! Auth tokens, kubeconfig output and API error bodies.

use serde::{Deserialize, Serialize};

/// A token record as returned by `/v3-public/authTokens/{id}` and `/v3/tokens`.
///
/// During a browser login the `token` field stays empty until the operator
/// completes the login; afterwards it holds the sealed (encrypted, base64)
/// token.  Tokens created through `/v3/tokens` carry the plaintext
/// `access:secret` pair instead.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    /// Token identifier.
    #[serde(default)]
    pub id: String,
    /// Token name (the access-key part for API tokens).
    #[serde(default)]
    pub name: String,
    /// Token value; empty while a login is still pending.
    #[serde(default)]
    pub token: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

impl TokenRecord {
    /// `true` while the login behind this record has not completed.
    pub fn is_pending(&self) -> bool {
        self.token.is_empty()
    }
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("token", &if self.token.is_empty() { "" } else { "<redacted>" })
            .field("description", &self.description)
            .finish()
    }
}

/// Request body for `POST /v3/tokens`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewToken {
    /// Free-form description shown in the server UI.
    pub description: String,
}

/// Output of the `generateKubeconfig` cluster action.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct KubeConfigOutput {
    /// The kubeconfig document, verbatim.
    pub config: String,
}

/// Error body returned by the management API on non-2xx responses.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ApiErrorBody {
    /// HTTP status code.
    pub status: u16,
    /// Machine-readable code (e.g. `NotFound`).
    pub code: String,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_token_is_pending() {
        let record: TokenRecord = serde_json::from_str(r#"{"id": "abc"}"#).unwrap();
        assert!(record.is_pending());
    }

    #[test]
    fn debug_redacts_token() {
        let record = TokenRecord {
            token: "token-abc:s3cret".into(),
            ..TokenRecord::default()
        };
        let rendered = format!("{record:?}");
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("<redacted>"));
    }
}
