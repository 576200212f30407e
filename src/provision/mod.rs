//! Creates chat channels and communities mirrored from GitHub repositories and owners.

pub mod channel;
pub mod chat;
pub mod community;

use crate::config::Config;
use crate::error::Result;
use crate::github::client::GitHubClient;
use crate::session::{SessionJar, GH_LOGIN_TOKEN, GH_PRIVATE_REPO_TOKEN, RC_TOKEN, RC_UID};
use chat::{ChatClient, ChatSession};

pub const CHANNEL_CREATED: &str = "Channel created successfully!";
pub const CHANNEL_FAILED: &str = "Error Creating Channel!";
pub const COMMUNITY_CREATED: &str = "Community created successfully!";
pub const COMMUNITY_FAILED: &str = "Error Creating Community!";

/// Chat accounts mirroring a GitHub login carry this suffix.
const MEMBER_SUFFIX: &str = "_github_rc4git";

pub fn member_name(login: &str) -> String {
    format!("{login}{MEMBER_SUFFIX}")
}

pub struct Provisioner {
    login: GitHubClient,
    private: Option<GitHubClient>,
    chat: ChatClient,
    username: String,
    web_base_url: String,
    rc_api_domain: String,
}

impl Provisioner {
    pub fn from_session(config: &Config, jar: &SessionJar) -> Result<Self> {
        let login = GitHubClient::new(jar.require(GH_LOGIN_TOKEN)?, &config.github_api_url)?;
        let private = jar
            .get(GH_PRIVATE_REPO_TOKEN)
            .map(|token| GitHubClient::new(token, &config.github_api_url))
            .transpose()?;
        let session = ChatSession {
            token: jar.require(RC_TOKEN)?.to_string(),
            uid: jar.require(RC_UID)?.to_string(),
        };

        Ok(Self {
            login,
            private,
            chat: ChatClient::new(&config.rc_api_url, session)?,
            username: jar.username()?,
            web_base_url: config.web_base_url.trim_end_matches('/').to_string(),
            rc_api_domain: config.rc_api_domain.trim_end_matches('/').to_string(),
        })
    }

    /// Elevated client when available, login client otherwise.
    fn best_client(&self) -> &GitHubClient {
        self.private.as_ref().unwrap_or(&self.login)
    }

    pub async fn organizations(&self) -> Result<Vec<String>> {
        Ok(self
            .login
            .list_orgs()
            .await?
            .into_iter()
            .map(|a| a.login)
            .collect())
    }
}
