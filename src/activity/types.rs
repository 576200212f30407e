use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HookId(String);

impl HookId {
    #[cfg(test)]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Event categories a webhook reports. Order is irrelevant and duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subscriptions(BTreeSet<String>);

impl Subscriptions {
    pub fn from_slice(categories: &[String]) -> Self {
        Self(categories.iter().cloned().collect())
    }

    /// True when `incoming` names a different set of categories.
    pub fn differs_from(&self, incoming: &[String]) -> bool {
        let incoming: BTreeSet<&str> = incoming.iter().map(String::as_str).collect();
        self.0.len() != incoming.len() || self.0.iter().any(|c| !incoming.contains(c.as_str()))
    }

    #[cfg(test)]
    pub fn contains(&self, category: &str) -> bool {
        self.0.contains(category)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[cfg(test)]
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    #[serde(rename = "_id")]
    pub id: String,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookRecord {
    pub hook_id: HookId,
    #[serde(default)]
    pub subscriptions: Vec<String>,
    #[serde(default, deserialize_with = "skip_malformed_events")]
    pub events: Vec<ActivityEvent>,
}

/// One unreadable event must not cost the whole snapshot.
fn skip_malformed_events<'de, D>(deserializer: D) -> Result<Vec<ActivityEvent>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<ActivityEvent>(value) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed snapshot event");
                None
            }
        })
        .collect())
}

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub webhook: Option<WebhookRecord>,
}

/// One-line view of an event for the feed list.
#[derive(Debug, Clone, PartialEq)]
pub struct EventSummary {
    pub kind: String,
    pub actor: Option<String>,
    pub title: String,
}

impl ActivityEvent {
    pub fn summary(&self) -> EventSummary {
        let field = |key: &str| self.payload.get(key).and_then(|v| v.as_str());

        let base = field("event").or_else(|| field("type")).unwrap_or("activity");
        let kind = match field("action") {
            Some(action) => format!("{base}/{action}"),
            None => base.to_string(),
        };

        let actor = self.payload.get("sender").and_then(|s| match s {
            serde_json::Value::String(login) => Some(login.clone()),
            serde_json::Value::Object(obj) => {
                obj.get("login").and_then(|l| l.as_str()).map(String::from)
            }
            _ => None,
        });

        let title = field("title")
            .or_else(|| field("message"))
            .or_else(|| field("ref"))
            .map(|s| s.lines().next().unwrap_or("").to_string())
            .unwrap_or_else(|| self.id.clone());

        EventSummary { kind, actor, title }
    }
}
