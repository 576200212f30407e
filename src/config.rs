use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use crate::error::{Rc4GitError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use url::Url;

#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Origin serving `/api/webhooks` and the activity stream.
    pub api_base_url: String,
    /// Chat backend used for provisioning (`/userInfo`, `/createChannel`).
    pub rc_api_url: String,
    pub github_api_url: String,
    /// Public web client, used to build channel embed links.
    pub web_base_url: String,
    pub rc_api_domain: String,
    pub oauth_authorize_url: String,
    pub private_repo_client_id: String,
    pub snackbar_ttl_ms: u64,
    #[serde(default = "default_event_categories")]
    pub event_categories: Vec<String>,
    pub session_file: Option<PathBuf>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_base_url", &self.api_base_url)
            .field("rc_api_url", &self.rc_api_url)
            .field("github_api_url", &self.github_api_url)
            .field("web_base_url", &self.web_base_url)
            .field("rc_api_domain", &self.rc_api_domain)
            .field("oauth_authorize_url", &self.oauth_authorize_url)
            .field("private_repo_client_id", &"[REDACTED]")
            .field("snackbar_ttl_ms", &self.snackbar_ttl_ms)
            .field("event_categories", &self.event_categories)
            .field("session_file", &self.session_file)
            .finish()
    }
}

fn default_event_categories() -> Vec<String> {
    [
        "push",
        "issues",
        "issue_comment",
        "pull_request",
        "pull_request_review",
        "create",
        "delete",
        "fork",
        "release",
        "star",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3002".to_string(),
            rc_api_url: "http://localhost:3030".to_string(),
            github_api_url: "https://api.github.com".to_string(),
            web_base_url: "http://localhost:3002".to_string(),
            rc_api_domain: "http://localhost:3030".to_string(),
            oauth_authorize_url: "https://github.com/login/oauth/authorize".to_string(),
            private_repo_client_id: String::new(),
            snackbar_ttl_ms: 3000,
            event_categories: default_event_categories(),
            session_file: None,
        }
    }
}

impl Config {
    pub fn load(api_base_url: Option<String>) -> Self {
        let config_file = config_dir().join("rc4git").join("config.toml");

        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        if config_file.exists() {
            figment = figment.merge(Toml::file(&config_file));
        }

        figment = figment.merge(Env::prefixed("RC4GIT_").ignore(&["log"]));

        if let Some(url) = api_base_url {
            figment = figment.merge(Serialized::default("api_base_url", url));
        }

        match figment.extract() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("warning: config parse error, using defaults: {e}");
                Config::default()
            }
        }
    }

    pub fn session_path(&self) -> PathBuf {
        self.session_file
            .clone()
            .unwrap_or_else(|| config_dir().join("rc4git").join("session.toml"))
    }

    pub fn log_path(&self) -> PathBuf {
        config_dir().join("rc4git").join("rc4git.log")
    }

    /// Authorization URL requesting the private-repo (`repo`) scope.
    pub fn scope_upgrade_url(&self) -> String {
        format!(
            "{}?scope=repo&client_id={}",
            self.oauth_authorize_url, self.private_repo_client_id
        )
    }
}

pub fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Parses a configured service URL as a join base. The path always ends in `/`
/// so relative endpoints keep any prefix the service is mounted under.
pub fn endpoint_base(raw: &str, key: &str) -> Result<Url> {
    let mut url = Url::parse(raw).map_err(|e| Rc4GitError::Config(format!("{key}: {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
