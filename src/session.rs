use crate::error::{Rc4GitError, Result};
use base64::Engine;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const RC4GIT_TOKEN: &str = "rc4git_token";
pub const RC_TOKEN: &str = "rc_token";
pub const RC_UID: &str = "rc_uid";
pub const GH_LOGIN_TOKEN: &str = "gh_login_token";
pub const GH_PRIVATE_REPO_TOKEN: &str = "gh_private_repo_token";
pub const GH_UPGRADE_PREV_PATH: &str = "gh_upgrade_prev_path";

const GITHUB_USERNAME_SUFFIX: &str = "_github";

/// Cookie-style credential store shared with the login and OAuth flows.
///
/// Values are written by those external flows into `session.toml`; this crate
/// only ever writes [`GH_UPGRADE_PREV_PATH`] before a scope-upgrade redirect.
#[derive(Debug, Default, Clone)]
pub struct SessionJar {
    values: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl SessionJar {
    #[cfg(test)]
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let values = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| Rc4GitError::Session(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            values,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn save(&self) -> Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        let content = toml::to_string_pretty(&self.values)
            .map_err(|e| Rc4GitError::Session(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Empty values count as absent, like an unset cookie.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn require(&self, key: &'static str) -> Result<&str> {
        self.get(key).ok_or(Rc4GitError::MissingCredential(key))
    }

    pub fn has_private_repo_token(&self) -> bool {
        self.get(GH_PRIVATE_REPO_TOKEN).is_some()
    }

    /// `Cookie` header value mirroring what a browser would send.
    pub fn cookie_header(&self) -> String {
        self.values
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// GitHub login of the signed-in user, read from the `rc4git_token` JWT.
    pub fn username(&self) -> Result<String> {
        let token = self.require(RC4GIT_TOKEN)?;
        username_from_jwt(token)
    }
}

fn username_from_jwt(token: &str) -> Result<String> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| Rc4GitError::Session("malformed rc4git token".to_string()))?;
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| Rc4GitError::Session(format!("rc4git token payload: {e}")))?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes)?;
    let username = claims
        .get("username")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Rc4GitError::Session("rc4git token has no username".to_string()))?;
    Ok(username
        .strip_suffix(GITHUB_USERNAME_SUFFIX)
        .unwrap_or(username)
        .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_jwt;

    #[test]
    fn missing_file_loads_empty_jar() {
        let dir = tempfile::tempdir().unwrap();
        let jar = SessionJar::load(&dir.path().join("session.toml")).unwrap();
        assert!(jar.get(RC4GIT_TOKEN).is_none());
        assert!(!jar.has_private_repo_token());
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.toml");
        let mut jar = SessionJar::load(&path).unwrap();
        jar.set(GH_PRIVATE_REPO_TOKEN, "ghp_private");
        jar.set(GH_UPGRADE_PREV_PATH, "/channel/org_repo");
        jar.save().unwrap();

        let reloaded = SessionJar::load(&path).unwrap();
        assert!(reloaded.has_private_repo_token());
        assert_eq!(reloaded.get(GH_UPGRADE_PREV_PATH), Some("/channel/org_repo"));
    }

    #[test]
    fn empty_value_is_absent() {
        let mut jar = SessionJar::in_memory();
        jar.set(GH_PRIVATE_REPO_TOKEN, "");
        assert!(!jar.has_private_repo_token());
        assert!(matches!(
            jar.require(GH_PRIVATE_REPO_TOKEN),
            Err(Rc4GitError::MissingCredential(GH_PRIVATE_REPO_TOKEN))
        ));
    }

    #[test]
    fn username_strips_github_suffix() {
        let mut jar = SessionJar::in_memory();
        jar.set(RC4GIT_TOKEN, make_jwt("octocat_github"));
        assert_eq!(jar.username().unwrap(), "octocat");
    }

    #[test]
    fn cookie_header_joins_pairs() {
        let mut jar = SessionJar::in_memory();
        jar.set(RC_UID, "u1");
        jar.set(RC_TOKEN, "t1");
        assert_eq!(jar.cookie_header(), "rc_token=t1; rc_uid=u1");
    }
}
