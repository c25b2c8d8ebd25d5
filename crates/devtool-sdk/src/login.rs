//! Browser-assisted login.
//!
//! The CLI cannot receive a redirect, so the login is driven out of band:
//!
//! 1. Generate an RSA key pair and a random request id.
//! 2. Open `/login?requestId=…&publicKey=…` in the operator's browser.
//! 3. Poll `/v3-public/authTokens/{requestId}` every 10 seconds.  Once the
//!    operator has logged in, the server answers with the token sealed
//!    against our public key.
//! 4. Open the token locally, then delete it on the server (best effort).
//!
//! The poll loop ends in exactly one of three ways, reported as a
//! [`LoginOutcome`]: a token was obtained, 15 minutes passed, or the
//! operator cancelled.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use devtool_models::challenge::{self, REQUEST_ID_ALPHABET, REQUEST_ID_LEN};
use devtool_models::TokenRecord;
use rand::rngs::OsRng;
use rand::{CryptoRng, Rng};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use rsa::RsaPrivateKey;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{decode_json, http_client, normalize_server_url};
use crate::browser::{SystemBrowser, UrlOpener};
use crate::credentials::RancherCredentials;
use crate::error::{ErrorKind, SdkError};
use crate::paths::ApiPaths;

/// Delay between two polls of the token endpoint.
pub const POLL_INTERVAL: Duration = Duration::from_secs(10);

/// How long the operator has to complete the login.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Timeout of a single poll request.
pub const POLL_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout of the request deleting the consumed token.
pub const INVALIDATE_REQUEST_TIMEOUT: Duration = Duration::from_secs(150);

/// Size of the challenge key pair.
pub const KEY_BITS: usize = 2048;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Tunables of a token exchange.
#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    /// Delay between polls.
    pub poll_interval: Duration,
    /// Deadline for the whole login, measured from challenge issuance.
    pub timeout: Duration,
    /// Timeout of one poll request.
    pub request_timeout: Duration,
    /// Timeout of the token deletion request.
    pub invalidate_timeout: Duration,
    /// RSA modulus size.
    pub key_bits: usize,
    /// Skip TLS certificate verification on the login endpoints.
    pub insecure_skip_tls_verify: bool,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        Self {
            poll_interval: POLL_INTERVAL,
            timeout: LOGIN_TIMEOUT,
            request_timeout: POLL_REQUEST_TIMEOUT,
            invalidate_timeout: INVALIDATE_REQUEST_TIMEOUT,
            key_bits: KEY_BITS,
            insecure_skip_tls_verify: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Challenge
// ---------------------------------------------------------------------------

/// Draw a login request id from [`REQUEST_ID_ALPHABET`].
///
/// Each character is chosen independently and uniformly.
pub fn generate_request_id<R: Rng + CryptoRng>(rng: &mut R) -> String {
    (0..REQUEST_ID_LEN)
        .map(|_| char::from(REQUEST_ID_ALPHABET[rng.gen_range(0..REQUEST_ID_ALPHABET.len())]))
        .collect()
}

/// Key material and login URL of one login attempt.
pub struct LoginChallenge {
    request_id: String,
    private_key: RsaPrivateKey,
    encoded_public_key: String,
    login_url: String,
}

impl LoginChallenge {
    /// Generate a fresh key pair and request id for the server at `paths`.
    pub fn generate(paths: &ApiPaths, key_bits: usize) -> Result<Self, SdkError> {
        let mut rng = OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, key_bits)?;
        let encoded_public_key = challenge::encode_public_key(&private_key.to_public_key());
        let request_id = generate_request_id(&mut rng);
        let login_url = paths.login(&request_id, &encoded_public_key);
        Ok(Self {
            request_id,
            private_key,
            encoded_public_key,
            login_url,
        })
    }

    /// The random request id the token is polled under.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Base64 public key document sent to the login page.
    pub fn encoded_public_key(&self) -> &str {
        &self.encoded_public_key
    }

    /// URL the operator logs in at.
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Decrypt a sealed token issued for this challenge.
    pub fn open(&self, sealed: &str) -> Result<String, SdkError> {
        Ok(challenge::open_token(&self.private_key, sealed)?)
    }
}

impl fmt::Debug for LoginChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginChallenge")
            .field("request_id", &self.request_id)
            .field("login_url", &self.login_url)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// A decrypted login token.
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    id: String,
    token: String,
}

impl Token {
    /// Identifier the token was polled under.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The plaintext bearer token.
    pub fn secret(&self) -> &str {
        &self.token
    }

    /// Split the token into API credentials.
    pub fn credentials(&self) -> Result<RancherCredentials, SdkError> {
        RancherCredentials::parse(&self.token)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// How a token exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// The operator logged in and the token was decrypted.
    Obtained(Token),
    /// No login within the deadline.
    TimedOut,
    /// The operator interrupted the wait.
    Cancelled,
}

impl LoginOutcome {
    /// The token, if one was obtained.
    pub fn token(self) -> Option<Token> {
        match self {
            Self::Obtained(token) => Some(token),
            Self::TimedOut | Self::Cancelled => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Token endpoint
// ---------------------------------------------------------------------------

/// The server side of the exchange: poll for and delete a login token.
pub trait TokenEndpoint: Send + Sync {
    /// Fetch the token record for `request_id`.
    ///
    /// A record with an empty token means the login is still pending.
    fn fetch(&self, request_id: &str) -> impl Future<Output = Result<TokenRecord, SdkError>> + Send;

    /// Delete the token stored under `request_id`.
    fn invalidate(&self, request_id: &str) -> impl Future<Output = Result<(), SdkError>> + Send;
}

/// [`TokenEndpoint`] over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTokenEndpoint {
    http: reqwest::Client,
    paths: ApiPaths,
    invalidate_timeout: Duration,
}

impl HttpTokenEndpoint {
    /// Endpoint for the server at `paths`.
    pub fn new(paths: ApiPaths, settings: &ExchangeSettings) -> Result<Self, SdkError> {
        Ok(Self {
            http: http_client(settings.insecure_skip_tls_verify, settings.request_timeout)?,
            paths,
            invalidate_timeout: settings.invalidate_timeout,
        })
    }
}

impl TokenEndpoint for HttpTokenEndpoint {
    async fn fetch(&self, request_id: &str) -> Result<TokenRecord, SdkError> {
        let res = self
            .http
            .get(self.paths.auth_token(request_id))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        // The record only exists once the operator has logged in.
        if res.status() == StatusCode::NOT_FOUND {
            return Ok(TokenRecord::default());
        }
        decode_json(res).await
    }

    async fn invalidate(&self, request_id: &str) -> Result<(), SdkError> {
        let res = self
            .http
            .delete(self.paths.auth_token(request_id))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .timeout(self.invalidate_timeout)
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(SdkError::Api { status, body });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Exchange
// ---------------------------------------------------------------------------

/// One browser login attempt.
///
/// [`run`](Self::run) consumes the exchange, so an attempt cannot be
/// restarted; start a new one instead.
#[derive(Debug)]
pub struct TokenExchange<E, O> {
    paths: ApiPaths,
    endpoint: E,
    opener: O,
    settings: ExchangeSettings,
}

impl<E: TokenEndpoint, O: UrlOpener> TokenExchange<E, O> {
    /// Prepare a login against the server at `paths`.
    pub fn new(paths: ApiPaths, endpoint: E, opener: O, settings: ExchangeSettings) -> Self {
        Self {
            paths,
            endpoint,
            opener,
            settings,
        }
    }

    /// Issue the challenge and wait for the operator.
    ///
    /// `cancel` resolving ends the wait with [`LoginOutcome::Cancelled`].
    /// A poll already in flight finishes first; no request is sent after
    /// that.  Failed polls abort with an error; a failed token deletion
    /// is only logged.
    pub async fn run(self, cancel: impl Future<Output = ()>) -> Result<LoginOutcome, SdkError> {
        let paths = self.paths.clone();
        let key_bits = self.settings.key_bits;
        let challenge = tokio::task::spawn_blocking(move || LoginChallenge::generate(&paths, key_bits))
            .await
            .map_err(|e| SdkError::Crypto(format!("key generation task failed: {e}")))??;
        let issued = Instant::now();
        info!(request_id = %challenge.request_id(), "login challenge issued");

        match self.opener.open(challenge.login_url()).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnsupportedPlatform => return Err(e),
            Err(e) => warn!(error = %e, "could not open a browser, open the login URL manually"),
        }

        let mut poll = interval_at(issued + self.settings.poll_interval, self.settings.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = sleep_until(issued + self.settings.timeout);
        tokio::pin!(deadline);
        tokio::pin!(cancel);

        loop {
            tokio::select! {
                biased;

                () = &mut cancel => {
                    info!("login cancelled");
                    return Ok(LoginOutcome::Cancelled);
                }
                () = &mut deadline => {
                    warn!(timeout = ?self.settings.timeout, "login timed out");
                    return Ok(LoginOutcome::TimedOut);
                }
                _ = poll.tick() => {
                    let record = self.endpoint.fetch(challenge.request_id()).await?;
                    if record.is_pending() {
                        debug!("login still pending");
                        continue;
                    }
                    let token = Token {
                        id: challenge.request_id().to_string(),
                        token: challenge.open(&record.token)?,
                    };
                    if let Err(e) = self.endpoint.invalidate(challenge.request_id()).await {
                        warn!(error = %e, "could not delete the login token on the server");
                    }
                    info!("login token obtained");
                    return Ok(LoginOutcome::Obtained(token));
                }
            }
        }
    }
}

/// Log in at `server_url` through the system browser.
///
/// Ctrl-C cancels the wait.
pub async fn get_token(server_url: &str, settings: ExchangeSettings) -> Result<LoginOutcome, SdkError> {
    let paths = ApiPaths::new(&normalize_server_url(server_url)?);
    let endpoint = HttpTokenEndpoint::new(paths.clone(), &settings)?;
    TokenExchange::new(paths, endpoint, SystemBrowser, settings)
        .run(interrupted())
        .await
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed.
async fn interrupted() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
