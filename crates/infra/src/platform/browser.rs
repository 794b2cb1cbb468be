//! System browser integration.

use loopauth_domain::{LoopauthError, Result};
use tracing::debug;

/// Opens a URL outside the process, typically in the user's browser.
pub trait UrlOpener: Send + Sync {
    /// # Errors
    /// Returns `PlatformError` when no handler could be launched.
    fn open(&self, url: &str) -> Result<()>;
}

/// [`UrlOpener`] backed by the desktop's default URL handler.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        debug!("Launching system browser");
        open::that_detached(url)
            .map_err(|err| LoopauthError::Platform(format!("failed to launch browser: {err}")))
    }
}
