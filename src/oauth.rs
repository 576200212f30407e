use crate::config::Config;
use crate::error::Result;
use crate::session::{SessionJar, GH_UPGRADE_PREV_PATH};

/// Sends the user to an external authorization page.
pub trait Redirector {
    fn redirect(&self, url: &str) -> Result<()>;
}

/// Opens the authorization page in the system browser.
pub struct BrowserRedirector;

impl Redirector for BrowserRedirector {
    fn redirect(&self, url: &str) -> Result<()> {
        tracing::info!(%url, "opening browser for scope upgrade");
        webbrowser::open(url)?;
        Ok(())
    }
}

/// Remembers `return_path` and redirects to the private-repo scope upgrade.
///
/// The return path is persisted before the redirect so the OAuth callback
/// can send the user back to where they were.
pub fn request_scope_upgrade(
    jar: &mut SessionJar,
    config: &Config,
    redirector: &dyn Redirector,
    return_path: &str,
) -> Result<String> {
    jar.set(GH_UPGRADE_PREV_PATH, return_path);
    jar.save()?;
    let url = config.scope_upgrade_url();
    redirector.redirect(&url)?;
    Ok(url)
}
