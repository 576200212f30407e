use crate::error::Result;
use crate::provision::chat::{ChannelType, CreateChannelRequest, Room};
use crate::provision::{member_name, Provisioner};
use crate::room::community_room_name;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommunityTarget {
    /// The signed-in user's own community.
    User,
    Organization(String),
}

impl Provisioner {
    /// Creates `<owner>_community`, seeded with org members or the user's bio.
    /// The backend's `success` flag decides the outcome; the room echo is optional.
    pub async fn create_community(&self, target: &CommunityTarget) -> Result<Option<Room>> {
        let (owner, members, description) = match target {
            CommunityTarget::Organization(org) => {
                let members = self
                    .login
                    .list_org_members(org)
                    .await?
                    .iter()
                    .map(|m| member_name(&m.login))
                    .collect();
                let description = self.login.org(org).await?.description;
                (org.as_str(), members, description)
            }
            CommunityTarget::User => {
                let bio = self.login.current_user().await?.bio;
                (self.username.as_str(), Vec::new(), bio)
            }
        };

        let request = CreateChannelRequest {
            rc_token: &self.chat.session().token,
            rc_uid: &self.chat.session().uid,
            channel: community_room_name(owner),
            members,
            topic: format!("GitHub: https://github.com/{owner}"),
            kind: ChannelType::Public,
            description: Some(description.unwrap_or_default()),
        };
        let room = self.chat.create_channel(&request).await?;

        tracing::info!(channel = %request.channel, "community created");
        Ok(room)
    }
}
