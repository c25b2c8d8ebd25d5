//! Opening the login page in the operator's browser.

use std::future::Future;
use std::io;

use tracing::debug;

use crate::error::SdkError;

/// Something that can show a URL to the operator.
pub trait UrlOpener: Send + Sync {
    /// Present `url` to the operator.
    ///
    /// Returns [`SdkError::UnsupportedPlatform`] when the OS has no known
    /// way of opening it.
    fn open(&self, url: &str) -> impl Future<Output = Result<(), SdkError>> + Send;
}

/// Prints the URL and launches the default system browser on it.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    async fn open(&self, url: &str) -> Result<(), SdkError> {
        eprintln!("\nLogin to Rancher Server at {url}\n");
        debug!("launching browser");
        // Launching may wait on a child process.
        let target = url.to_string();
        tokio::task::spawn_blocking(move || webbrowser::open(&target))
            .await
            .map_err(|e| SdkError::Io(io::Error::other(e)))?
            .map_err(launch_error)
    }
}

/// `webbrowser` reports an OS it cannot drive as [`io::ErrorKind::Unsupported`].
fn launch_error(e: io::Error) -> SdkError {
    if e.kind() == io::ErrorKind::Unsupported {
        SdkError::UnsupportedPlatform(std::env::consts::OS.to_string())
    } else {
        SdkError::Io(e)
    }
}
