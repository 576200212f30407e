use crate::activity::types::{ActivityEvent, HookId, WebhookEnvelope, WebhookRecord};
use crate::config::{endpoint_base, Config};
use crate::error::{Rc4GitError, Result};
use crate::room::RoomId;
use crate::session::{SessionJar, RC4GIT_TOKEN};
use async_trait::async_trait;
use eventsource_client::{Client, ClientBuilder, ReconnectOptions, SSE};
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use url::Url;

pub type ActivityStream = BoxStream<'static, Result<ActivityEvent>>;

/// Webhook state and live activity for rooms, as served by the chat backend.
#[async_trait]
pub trait ActivityBackend: Send + Sync {
    /// Snapshot of the room's webhook; `None` when the room has no webhook.
    async fn fetch_webhook(&self, room: &RoomId) -> Result<Option<WebhookRecord>>;

    /// Opens the push stream for one webhook. Dropping the stream closes it.
    fn subscribe(&self, hook_id: &HookId) -> Result<ActivityStream>;

    async fn save_webhook(
        &self,
        room: &RoomId,
        subscriptions: &[String],
    ) -> Result<Option<WebhookRecord>>;

    async fn delete_webhook(&self, hook_id: &HookId) -> Result<()>;
}

#[derive(Serialize)]
struct SaveWebhookRequest<'a> {
    room_name: &'a str,
    subscriptions: &'a [String],
}

pub struct HttpActivityBackend {
    http: reqwest::Client,
    base_url: Url,
    bearer: Option<String>,
    cookies: String,
}

impl HttpActivityBackend {
    pub fn new(config: &Config, jar: &SessionJar) -> Result<Self> {
        let base_url = endpoint_base(&config.api_base_url, "api_base_url")?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("rc4git/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            bearer: jar.get(RC4GIT_TOKEN).map(String::from),
            cookies: jar.cookie_header(),
        })
    }

    fn url(&self, path: &str, query: (&str, &str)) -> Result<Url> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| Rc4GitError::Config(format!("{path}: {e}")))?;
        url.query_pairs_mut().append_pair(query.0, query.1);
        Ok(url)
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.bearer {
            Some(ref token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl ActivityBackend for HttpActivityBackend {
    async fn fetch_webhook(&self, room: &RoomId) -> Result<Option<WebhookRecord>> {
        let url = self.url("api/webhooks", ("room_name", room.name()))?;
        let envelope: WebhookEnvelope = self
            .authorized(self.http.get(url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope.data.webhook)
    }

    fn subscribe(&self, hook_id: &HookId) -> Result<ActivityStream> {
        let url = self.url("api/activities/github", ("hook_id", hook_id.as_str()))?;
        let stream_err = |e: eventsource_client::Error| Rc4GitError::Stream(format!("{e:?}"));

        let mut builder = ClientBuilder::for_url(url.as_str())
            .map_err(stream_err)?
            .reconnect(ReconnectOptions::reconnect(false).build());
        if let Some(ref token) = self.bearer {
            builder = builder
                .header("Authorization", &format!("Bearer {token}"))
                .map_err(stream_err)?;
        }
        if !self.cookies.is_empty() {
            builder = builder.header("Cookie", &self.cookies).map_err(stream_err)?;
        }

        let hook = hook_id.clone();
        let messages = builder.build().stream().filter_map(move |item| {
            let hook = hook.clone();
            async move {
                match item {
                    Ok(SSE::Event(ev)) => match serde_json::from_str::<ActivityEvent>(&ev.data) {
                        Ok(event) => Some(Ok(event)),
                        Err(e) => {
                            tracing::warn!(%hook, error = %e, "skipping malformed activity message");
                            None
                        }
                    },
                    Ok(_) => None,
                    Err(e) => Some(Err(Rc4GitError::Stream(format!("{e:?}")))),
                }
            }
        });

        // The client replays the connection after Eof even with reconnect off, so the
        // stream ends at its first error instead.
        let stream = futures::stream::unfold(Some(messages.boxed()), |state| async move {
            let mut messages = state?;
            let item = messages.next().await?;
            let rest = if item.is_ok() { Some(messages) } else { None };
            Some((item, rest))
        });
        Ok(stream.boxed())
    }

    async fn save_webhook(
        &self,
        room: &RoomId,
        subscriptions: &[String],
    ) -> Result<Option<WebhookRecord>> {
        let url = self
            .base_url
            .join("api/webhooks")
            .map_err(|e| Rc4GitError::Config(format!("api/webhooks: {e}")))?;
        let body = SaveWebhookRequest {
            room_name: room.name(),
            subscriptions,
        };
        let envelope: WebhookEnvelope = self
            .authorized(self.http.post(url).json(&body))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(envelope.data.webhook)
    }

    async fn delete_webhook(&self, hook_id: &HookId) -> Result<()> {
        let url = self.url("api/webhooks", ("hook_id", hook_id.as_str()))?;
        self.authorized(self.http.delete(url))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend_for(server: &MockServer) -> HttpActivityBackend {
        let config = Config {
            api_base_url: server.uri(),
            ..Config::default()
        };
        let mut jar = SessionJar::in_memory();
        jar.set(RC4GIT_TOKEN, "jwt-token");
        HttpActivityBackend::new(&config, &jar).unwrap()
    }

    #[tokio::test]
    async fn fetches_webhook_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/webhooks"))
            .and(query_param("room_name", "org_repo"))
            .and(header("authorization", "Bearer jwt-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"webhook": {
                    "hook_id": "42",
                    "subscriptions": ["push", "issues"],
                    "events": []
                }}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let room = RoomId::from_path("/channel/org_repo").unwrap();
        let record = backend.fetch_webhook(&room).await.unwrap().unwrap();

        assert_eq!(record.hook_id, HookId::new("42"));
        assert_eq!(record.subscriptions, vec!["push", "issues"]);
    }

    #[tokio::test]
    async fn malformed_snapshot_event_keeps_the_webhook() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/webhooks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"webhook": {
                    "hook_id": "42",
                    "subscriptions": ["push"],
                    "events": [
                        {"_id": "e1", "updated_at": "2024-05-01T10:00:00Z"},
                        {"_id": "e2", "created_at": "2024-05-01T11:00:00Z"}
                    ]
                }}
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let room = RoomId::from_path("/channel/org_repo").unwrap();
        let record = backend.fetch_webhook(&room).await.unwrap().unwrap();

        assert_eq!(record.hook_id, HookId::new("42"));
        let ids: Vec<_> = record.events.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e1"]);
    }

    #[tokio::test]
    async fn base_url_path_prefix_is_kept() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rc4git/api/webhooks"))
            .and(query_param("room_name", "org_repo"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"webhook": null}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = Config {
            api_base_url: format!("{}/rc4git", server.uri()),
            ..Config::default()
        };
        let backend = HttpActivityBackend::new(&config, &SessionJar::in_memory()).unwrap();
        let room = RoomId::from_path("/channel/org_repo").unwrap();
        assert!(backend.fetch_webhook(&room).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stream_sends_credentials_and_ends_at_first_error() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"_id\":\"s1\",\"updated_at\":\"2024-05-01T10:00:00Z\"}\n\n",
            "data: not json\n\n",
            "data: {\"_id\":\"s2\",\"updated_at\":\"2024-05-01T10:01:00Z\"}\n\n",
        );
        Mock::given(method("GET"))
            .and(path("/api/activities/github"))
            .and(query_param("hook_id", "42"))
            .and(header("authorization", "Bearer jwt-token"))
            .and(header("cookie", "rc4git_token=jwt-token"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let stream = backend.subscribe(&HookId::new("42")).unwrap();
        let items: Vec<_> = tokio::time::timeout(Duration::from_secs(5), stream.collect())
            .await
            .expect("stream did not end after its first error");

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap().id, "s1");
        assert_eq!(items[1].as_ref().unwrap().id, "s2");
        assert!(matches!(items[2], Err(Rc4GitError::Stream(_))));
    }

    #[tokio::test]
    async fn missing_webhook_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/webhooks"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"data": {"webhook": null}})),
            )
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let room = RoomId::from_path("/channel/org_repo").unwrap();
        assert!(backend.fetch_webhook(&room).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn server_error_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/webhooks"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let room = RoomId::from_path("/channel/org_repo").unwrap();
        assert!(matches!(
            backend.fetch_webhook(&room).await,
            Err(Rc4GitError::Http(_))
        ));
    }

    #[tokio::test]
    async fn save_posts_room_and_subscriptions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/webhooks"))
            .and(body_json(json!({"room_name": "org_repo", "subscriptions": ["push"]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"webhook": {"hook_id": "7", "subscriptions": ["push"]}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        let room = RoomId::from_path("/channel/org_repo").unwrap();
        let record = backend
            .save_webhook(&room, &["push".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.hook_id, HookId::new("7"));
        assert!(record.events.is_empty());
    }

    #[tokio::test]
    async fn delete_targets_hook_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/webhooks"))
            .and(query_param("hook_id", "7"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let backend = backend_for(&server).await;
        backend.delete_webhook(&HookId::new("7")).await.unwrap();
    }
}
