use crate::error::{Rc4GitError, Result};
use crate::github::types::Visibility;
use crate::provision::chat::{ChannelType, CreateChannelRequest, Room};
use crate::provision::{member_name, Provisioner};
use crate::room::{channel_room_name, community_owner};

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedChannel {
    pub room: Room,
    pub embed_link: String,
}

impl Provisioner {
    /// Owners (the user and their orgs) that already have a `_community` room.
    pub async fn communities(&self, organizations: &[String]) -> Result<Vec<String>> {
        let rooms = self.chat.room_names().await?;
        Ok(intersect_communities(&self.username, organizations, &rooms))
    }

    /// `owner/name` of every repository the user can mirror.
    pub async fn repositories(&self, include_private: bool) -> Result<Vec<String>> {
        let mut repos: Vec<String> = self
            .login
            .list_user_repos(Visibility::Public)
            .await?
            .into_iter()
            .map(|r| r.full_name)
            .collect();

        if include_private {
            if let Some(ref private) = self.private {
                repos.extend(
                    private
                        .list_user_repos(Visibility::Private)
                        .await?
                        .into_iter()
                        .map(|r| r.full_name),
                );
            }
        }
        Ok(repos)
    }

    /// Creates `<community>_<repo>`, seeded with collaborators and the repo description.
    pub async fn create_channel(
        &self,
        community: &str,
        repo: &str,
        public: bool,
    ) -> Result<CreatedChannel> {
        let mut members = Vec::new();
        // collaborator listing needs the repo scope
        if let Some(ref private) = self.private {
            members = private
                .list_collaborators(community, repo)
                .await?
                .iter()
                .map(|c| member_name(&c.login))
                .collect();
        }

        let description = self
            .best_client()
            .repo(community, repo)
            .await?
            .description
            .unwrap_or_default();

        let request = CreateChannelRequest {
            rc_token: &self.chat.session().token,
            rc_uid: &self.chat.session().uid,
            channel: channel_room_name(community, repo),
            members,
            topic: format!("GitHub: https://github.com/{community}/{repo}"),
            kind: if public {
                ChannelType::Public
            } else {
                ChannelType::Private
            },
            description: None,
        };
        let room = self
            .chat
            .create_channel(&request)
            .await?
            .ok_or_else(|| Rc4GitError::Backend("createChannel returned no channel".to_string()))?;

        let embed_link = format!("{}/channel/{}", self.web_base_url, room.name);
        let description = format!(
            "{description}{}",
            embed_snippet(&embed_link, &self.rc_api_domain)
        );
        self.chat
            .set_channel_description(&room.id, &description)
            .await?;

        tracing::info!(room = %room.name, "channel created");
        Ok(CreatedChannel { room, embed_link })
    }
}

pub fn intersect_communities(
    username: &str,
    organizations: &[String],
    room_names: &[String],
) -> Vec<String> {
    let existing: Vec<&str> = room_names.iter().filter_map(|n| community_owner(n)).collect();
    std::iter::once(username)
        .chain(organizations.iter().map(String::as_str))
        .filter(|owner| existing.contains(owner))
        .map(String::from)
        .collect()
}

/// Repository names under `community`, without the owner prefix, sorted.
pub fn repo_options(repositories: &[String], community: &str) -> Vec<String> {
    let prefix = format!("{community}/");
    let mut options: Vec<String> = repositories
        .iter()
        .filter_map(|r| r.strip_prefix(&prefix))
        .map(String::from)
        .collect();
    options.sort();
    options
}

/// HTML badge appended to a channel description so it can be embedded elsewhere.
pub fn embed_snippet(channel_link: &str, rc_api_domain: &str) -> String {
    format!(
        "\n\n-----\nEmbed this channel\n\
         <pre><code>&lt;a&nbsp;href=&quot;{channel_link}&quot;&gt;\n\
         &lt;img&nbsp;src=&quot;{rc_api_domain}/images/join-chat.svg&quot;/&gt;\n\
         &lt;/a&gt;</code></pre>\n"
    )
}
