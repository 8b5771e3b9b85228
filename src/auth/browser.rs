//! Handing the authorization URL to the user
//!
//! The flow opens the authorization URL through a [`BrowserLauncher`].
//! [`SystemBrowser`] starts the platform's default browser;
//! [`ManualBrowser`] prints the URL so the user can open it themselves.

use url::Url;

use crate::auth::error::AuthError;
use crate::error::Result;

/// Opens an authorization URL for the user.
pub trait BrowserLauncher: Send + Sync + std::fmt::Debug {
    /// Opens `url`. Returns once the request has been handed off; it does
    /// not wait for the browser.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::BrowserLaunchUnsupported`] when the URL cannot
    /// be opened.
    fn open(&self, url: &Url) -> Result<()>;
}

/// Launches the platform's default browser.
///
/// - macOS: `open <url>`
/// - Linux: `xdg-open <url>`
/// - Windows: `rundll32 url.dll,FileProtocolHandler <url>`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl SystemBrowser {
    fn command(url: &str) -> Result<std::process::Command> {
        #[cfg(target_os = "macos")]
        {
            let mut cmd = std::process::Command::new("open");
            cmd.arg(url);
            Ok(cmd)
        }
        #[cfg(target_os = "linux")]
        {
            let mut cmd = std::process::Command::new("xdg-open");
            cmd.arg(url);
            Ok(cmd)
        }
        #[cfg(target_os = "windows")]
        {
            let mut cmd = std::process::Command::new("rundll32");
            cmd.arg("url.dll,FileProtocolHandler").arg(url);
            Ok(cmd)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            let _ = url;
            Err(AuthError::BrowserLaunchUnsupported(format!(
                "no default browser launcher for {}",
                std::env::consts::OS
            ))
            .into())
        }
    }
}

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &Url) -> Result<()> {
        let mut cmd = Self::command(url.as_str())?;
        cmd.stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null());

        tracing::info!("Opening browser for authorization");
        cmd.spawn().map_err(|e| {
            AuthError::BrowserLaunchUnsupported(format!("failed to launch browser: {e}"))
        })?;
        Ok(())
    }
}

/// Prints the URL to stderr instead of launching anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualBrowser;

impl BrowserLauncher for ManualBrowser {
    fn open(&self, url: &Url) -> Result<()> {
        eprintln!("Open the following URL in your browser to sign in:\n\n  {url}\n");
        Ok(())
    }
}
