use crate::activity::sync::FeedSynchronizer;
use crate::config::Config;
use crate::error::Result;
use crate::oauth::{self, Redirector};
use crate::session::SessionJar;
use crate::ui::webhook_dialog::WebhookDialogState;

#[derive(Debug)]
pub enum SettingsAccess {
    /// Elevated token missing; the user was sent to this authorization URL.
    Redirected(String),
    Open(WebhookDialogState),
}

/// Opens webhook settings, or starts the private-repo scope upgrade when the
/// elevated token is missing. The check only reads the local jar.
pub fn request_settings_access(
    jar: &mut SessionJar,
    config: &Config,
    redirector: &dyn Redirector,
    sync: &FeedSynchronizer,
    current_path: &str,
) -> Result<SettingsAccess> {
    if !jar.has_private_repo_token() {
        let url = oauth::request_scope_upgrade(jar, config, redirector, current_path)?;
        return Ok(SettingsAccess::Redirected(url));
    }

    Ok(SettingsAccess::Open(WebhookDialogState::new(
        sync.hook_id().cloned(),
        sync.subscriptions(),
        &config.event_categories,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::sync::WebhookMutator;
    use crate::activity::types::HookId;
    use crate::session::{GH_PRIVATE_REPO_TOKEN, GH_UPGRADE_PREV_PATH};
    use crate::test_utils::*;

    #[tokio::test]
    async fn missing_scope_redirects_once_and_opens_nothing() {
        let backend = MockBackend::new();
        let (sync, _rx) = make_synchronizer(&backend);
        let mut jar = SessionJar::in_memory();
        let redirector = RecordingRedirector::default();

        let access = request_settings_access(
            &mut jar,
            &Config::default(),
            &redirector,
            &sync,
            "/channel/org_repo",
        )
        .unwrap();

        assert!(matches!(access, SettingsAccess::Redirected(_)));
        assert_eq!(redirector.urls().len(), 1);
        assert_eq!(jar.get(GH_UPGRADE_PREV_PATH), Some("/channel/org_repo"));
    }

    #[tokio::test]
    async fn elevated_token_opens_dialog_without_redirect() {
        let backend = MockBackend::new();
        let (mut sync, _rx) = make_synchronizer(&backend);
        sync.set_hook_id(Some(HookId::new("h1")));
        sync.set_subscriptions(&["push".to_string()]);
        let mut jar = SessionJar::in_memory();
        jar.set(GH_PRIVATE_REPO_TOKEN, "ghp_x");
        let redirector = RecordingRedirector::default();

        let access = request_settings_access(
            &mut jar,
            &Config::default(),
            &redirector,
            &sync,
            "/channel/org_repo",
        )
        .unwrap();

        let SettingsAccess::Open(dialog) = access else {
            panic!("expected dialog");
        };
        assert!(redirector.urls().is_empty());
        assert_eq!(dialog.hook_id(), Some(&HookId::new("h1")));
        assert!(dialog.is_selected("push"));
        assert!(!dialog.is_selected("issues"));
    }

    #[tokio::test]
    async fn dialog_for_room_without_webhook_has_no_hook() {
        let backend = MockBackend::new();
        let (sync, _rx) = make_synchronizer(&backend);
        let mut jar = SessionJar::in_memory();
        jar.set(GH_PRIVATE_REPO_TOKEN, "ghp_x");

        let access = request_settings_access(
            &mut jar,
            &Config::default(),
            &RecordingRedirector::default(),
            &sync,
            "/channel/org_repo",
        )
        .unwrap();

        let SettingsAccess::Open(dialog) = access else {
            panic!("expected dialog");
        };
        assert!(dialog.hook_id().is_none());
    }
}
