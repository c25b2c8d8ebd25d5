//! API credentials derived from a Rancher bearer token.

use std::fmt;
use std::str::FromStr;

use crate::error::SdkError;

/// Separator between the access key and the secret key of a token.
const TOKEN_SEPARATOR: char = ':';

/// Credentials used to authenticate management API calls.
///
/// * `token`      – the raw bearer token, `{access_key}:{secret_key}`.
/// * `access_key` – the part before the separator (the token name).
/// * `secret_key` – the part after the separator.
///
/// # Examples
///
/// ```
/// use devtool_sdk::RancherCredentials;
///
/// let creds = RancherCredentials::parse("token-abc12:s3cret").unwrap();
/// assert_eq!(creds.access_key(), "token-abc12");
/// assert_eq!(creds.secret_key(), "s3cret");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct RancherCredentials {
    token: String,
    access_key: String,
    secret_key: String,
}

impl RancherCredentials {
    /// Split a bearer token into its access and secret keys.
    ///
    /// The token must contain exactly one `:` with text on both sides.
    pub fn parse(token: &str) -> Result<Self, SdkError> {
        let mut parts = token.split(TOKEN_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(access), Some(secret), None) if !access.is_empty() && !secret.is_empty() => {
                Ok(Self {
                    token: token.to_string(),
                    access_key: access.to_string(),
                    secret_key: secret.to_string(),
                })
            }
            _ => Err(SdkError::Config(
                "token must have the form <access-key>:<secret-key>".into(),
            )),
        }
    }

    /// The raw bearer token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The access key (token name).
    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// The secret key.
    pub fn secret_key(&self) -> &str {
        &self.secret_key
    }
}

impl FromStr for RancherCredentials {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for RancherCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RancherCredentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}
