//! SDK error types.
//!
//! [`SdkError`] is the single error type returned by every fallible
//! operation in the SDK.  Callers branch on [`SdkError::kind`] rather than
//! on message text; the reconciler in particular only ever consumes
//! [`ErrorKind::NotFound`] and lets every other kind propagate.

use std::fmt;

use devtool_models::ModelError;
use reqwest::StatusCode;

/// The kind of resource a lookup was looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A downstream cluster.
    Cluster,
    /// A project inside a cluster.
    Project,
    /// A namespace inside a project.
    Namespace,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cluster => "cluster",
            Self::Project => "project",
            Self::Namespace => "namespace",
        })
    }
}

/// Machine-checkable classification of an [`SdkError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A lookup by name matched nothing.
    NotFound,
    /// A lookup by name matched more than one resource.
    Ambiguous,
    /// Malformed server URL or credential.
    Configuration,
    /// Network failure or non-success HTTP response.
    Transport,
    /// Key generation, decoding or decryption failure.
    Crypto,
    /// No way to open a browser on this OS.
    UnsupportedPlatform,
    /// Malformed JSON.
    Serialization,
    /// Local I/O failure.
    Io,
}

/// Error type for all SDK operations.
#[derive(Debug, thiserror::Error)]
pub enum SdkError {
    /// A lookup by name matched nothing.
    #[error("could not find {kind}: {name}")]
    NotFound {
        /// What was looked up.
        kind: ResourceKind,
        /// The name that matched nothing.
        name: String,
    },

    /// A lookup by name matched several resources.
    #[error("{matches} {kind}s are named {name}")]
    Ambiguous {
        /// What was looked up.
        kind: ResourceKind,
        /// The shared name.
        name: String,
        /// How many resources carry it.
        matches: usize,
    },

    /// Invalid or missing configuration (e.g. bad URL, malformed token).
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP request failure at the transport level.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server returned {status}: {body}")]
    Api {
        /// Response status.
        status: StatusCode,
        /// Response body, as text.
        body: String,
    },

    /// Cryptographic failure (key generation, decoding, decryption).
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Opening a browser is not implemented for this OS.
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// JSON serialization / deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Another error, annotated with the operation that failed.
    #[error("{context}: {source}")]
    Context {
        /// The failing operation and its target.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<SdkError>,
    },
}

impl SdkError {
    /// Classify this error, looking through any [`SdkError::Context`] wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Ambiguous { .. } => ErrorKind::Ambiguous,
            Self::Config(_) => ErrorKind::Configuration,
            Self::Http(_) | Self::Api { .. } => ErrorKind::Transport,
            Self::Crypto(_) => ErrorKind::Crypto,
            Self::UnsupportedPlatform(_) => ErrorKind::UnsupportedPlatform,
            Self::Serialization(_) => ErrorKind::Serialization,
            Self::Io(_) => ErrorKind::Io,
            Self::Context { source, .. } => source.kind(),
        }
    }

    /// `true` when a lookup found nothing and the caller may create the resource.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Wrap this error with text naming the failing operation.
    #[must_use]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    pub(crate) fn not_found(kind: ResourceKind, name: &str) -> Self {
        Self::NotFound {
            kind,
            name: name.to_string(),
        }
    }
}

impl From<ModelError> for SdkError {
    fn from(e: ModelError) -> Self {
        SdkError::Crypto(e.to_string())
    }
}

impl From<rsa::Error> for SdkError {
    fn from(e: rsa::Error) -> Self {
        SdkError::Crypto(e.to_string())
    }
}

/// Attach context to the error side of a `Result`.
pub trait ResultExt<T> {
    /// Wrap the error, if any, with text naming the failing operation.
    fn context<C: Into<String>>(self, context: impl FnOnce() -> C) -> Result<T, SdkError>;
}

impl<T, E: Into<SdkError>> ResultExt<T> for Result<T, E> {
    fn context<C: Into<String>>(self, context: impl FnOnce() -> C) -> Result<T, SdkError> {
        self.map_err(|e| e.into().context(context()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_is_classified() {
        let err = SdkError::not_found(ResourceKind::Project, "team-x");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "could not find project: team-x");
    }

    #[test]
    fn context_preserves_kind() {
        let err = SdkError::not_found(ResourceKind::Cluster, "cluster-a").context("ensuring project team-x");
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "ensuring project team-x: could not find cluster: cluster-a"
        );
    }

    #[test]
    fn api_errors_are_transport_not_not_found() {
        let err = SdkError::Api {
            status: StatusCode::NOT_FOUND,
            body: "no such collection".into(),
        }
        .context("listing clusters");
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(!err.is_not_found());
    }

    #[test]
    fn model_errors_are_crypto() {
        let err: SdkError = ModelError::InvalidSealedToken {
            reason: "not base64".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Crypto);
    }

    #[test]
    fn result_ext_wraps_errors() {
        let res: Result<(), SdkError> = Err(SdkError::Config("bad".into()));
        let err = res.context(|| "parsing server URL").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(err.to_string(), "parsing server URL: configuration error: bad");
    }

    #[test]
    fn ambiguous_display() {
        let err = SdkError::Ambiguous {
            kind: ResourceKind::Cluster,
            name: "shared".into(),
            matches: 2,
        };
        assert_eq!(err.to_string(), "2 clusters are named shared");
        assert_eq!(err.kind(), ErrorKind::Ambiguous);
    }
}
