use crate::config::endpoint_base;
use crate::error::{Rc4GitError, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Channel visibility on the chat server: `c` public, `p` private group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChannelType {
    #[serde(rename = "c")]
    Public,
    #[serde(rename = "p")]
    Private,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateChannelRequest<'a> {
    pub rc_token: &'a str,
    pub rc_uid: &'a str,
    pub channel: String,
    pub members: Vec<String>,
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Room {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    user: UserRooms,
}

#[derive(Debug, Deserialize)]
struct UserRooms {
    #[serde(default)]
    rooms: Vec<RoomName>,
}

#[derive(Debug, Deserialize)]
struct RoomName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreateChannelData {
    success: bool,
    channel: Option<Room>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SetDescriptionRequest<'a> {
    rc_token: &'a str,
    rc_uid: &'a str,
    room_id: &'a str,
    description: &'a str,
}

/// Chat-server session: the `rc_token`/`rc_uid` pair from the jar.
#[derive(Debug, Clone)]
pub struct ChatSession {
    pub token: String,
    pub uid: String,
}

/// Provisioning endpoints of the chat backend.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    base_url: Url,
    session: ChatSession,
}

impl ChatClient {
    pub fn new(base_url: &str, session: ChatSession) -> Result<Self> {
        let base_url = endpoint_base(base_url, "rc_api_url")?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("rc4git/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Rc4GitError::Config(format!("{path}: {e}")))
    }

    /// Names of every room the user belongs to.
    pub async fn room_names(&self) -> Result<Vec<String>> {
        let envelope: Envelope<UserInfo> = self
            .http
            .get(self.url("userInfo")?)
            .query(&[
                ("rc_token", self.session.token.as_str()),
                ("rc_uid", self.session.uid.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope.data.user.rooms.into_iter().map(|r| r.name).collect())
    }

    pub async fn create_channel(&self, request: &CreateChannelRequest<'_>) -> Result<Option<Room>> {
        tracing::info!(channel = %request.channel, members = request.members.len(), "creating channel");
        let envelope: Envelope<CreateChannelData> = self
            .http
            .post(self.url("createChannel")?)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if !envelope.data.success {
            return Err(Rc4GitError::Backend(format!(
                "createChannel refused {}",
                request.channel
            )));
        }
        Ok(envelope.data.channel)
    }

    pub async fn set_channel_description(&self, room_id: &str, description: &str) -> Result<()> {
        let body = SetDescriptionRequest {
            rc_token: &self.session.token,
            rc_uid: &self.session.uid,
            room_id,
            description,
        };
        self.http
            .post(self.url("setChannelDescription")?)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}
