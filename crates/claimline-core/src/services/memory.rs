//! In-process service implementations backed by a JSON fixture, used for
//! offline runs of the CLI and by the tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use anyhow::{anyhow, Context, Result};
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde::Deserialize;

use super::{CallLogService, ConversationService, ReplySink, UserDirectory};
use crate::models::{CallLogEntry, Conversation, RawMessage, ReplyPayload, UserRecord};

/// Fixture data keyed by contact identifier
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryBackend {
    /// identifier (phone or email) -> conversation
    #[serde(default)]
    pub conversations: HashMap<String, Conversation>,
    /// conversation id -> messages
    #[serde(default)]
    pub messages: HashMap<String, Vec<RawMessage>>,
    /// phone number -> call log
    #[serde(default)]
    pub call_logs: HashMap<String, Vec<CallLogEntry>>,
    #[serde(default)]
    pub users: Vec<UserRecord>,
    /// Identifiers whose lookups fail, to exercise degraded streams
    #[serde(default)]
    pub failing_identifiers: Vec<String>,
}

impl MemoryBackend {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse fixture file: {}", path.display()))
    }

    fn check_available(&self, identifier: &str) -> Result<()> {
        if self.failing_identifiers.iter().any(|f| f == identifier) {
            return Err(anyhow!("service unavailable for {}", identifier));
        }
        Ok(())
    }
}

impl ConversationService for MemoryBackend {
    fn get_conversation_by_identifier<'a>(
        &'a self,
        phone_or_email: &'a str,
    ) -> BoxFuture<'a, Result<Option<Conversation>>> {
        let result = self
            .check_available(phone_or_email)
            .map(|_| self.conversations.get(phone_or_email).cloned());
        future::ready(result).boxed()
    }

    fn get_messages_by_conversation<'a>(
        &'a self,
        conversation_id: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<RawMessage>>> {
        let messages = self
            .messages
            .get(conversation_id)
            .map(|m| m.iter().take(limit).cloned().collect())
            .unwrap_or_default();
        future::ready(Ok(messages)).boxed()
    }
}

impl CallLogService for MemoryBackend {
    fn get_call_logs<'a>(&'a self, phone_number: &'a str, limit: usize) -> BoxFuture<'a, Result<Vec<CallLogEntry>>> {
        let result = self.check_available(phone_number).map(|_| {
            self.call_logs
                .get(phone_number)
                .map(|calls| calls.iter().take(limit).cloned().collect())
                .unwrap_or_default()
        });
        future::ready(result).boxed()
    }
}

impl UserDirectory for MemoryBackend {
    fn search_users<'a>(&'a self, query: &'a str, limit: usize) -> BoxFuture<'a, Result<Vec<UserRecord>>> {
        let needle = query.to_lowercase();
        let users = self
            .users
            .iter()
            .filter(|u| {
                [u.name.as_deref(), u.first_name.as_deref(), u.last_name.as_deref(), u.email.as_deref()]
                    .into_iter()
                    .flatten()
                    .any(|field| field.to_lowercase().contains(&needle))
            })
            .take(limit)
            .cloned()
            .collect();
        future::ready(Ok(users)).boxed()
    }
}

/// Reply sink that records what it was given
#[derive(Debug, Default)]
pub struct MemoryReplySink {
    sent: Mutex<Vec<(String, ReplyPayload)>>,
    failure: Option<String>,
}

impl MemoryReplySink {
    /// A sink that rejects every reply with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failure: Some(message.into()),
        }
    }

    pub fn sent(&self) -> Vec<(String, ReplyPayload)> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ReplySink for MemoryReplySink {
    fn add_reply<'a>(&'a self, opportunity_id: &'a str, reply: &'a ReplyPayload) -> BoxFuture<'a, Result<()>> {
        let result = match &self.failure {
            Some(message) => Err(anyhow!("{}", message)),
            None => self
                .sent
                .lock()
                .map(|mut sent| sent.push((opportunity_id.to_string(), reply.clone())))
                .map_err(|_| anyhow!("reply log poisoned")),
        };
        future::ready(result).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fetch_conversation_messages;
    use std::io::Write;

    const FIXTURE: &str = r#"{
        "conversations": {"+15550100": {"id": "conv-sms"}},
        "messages": {"conv-sms": [{"id": "m1", "body": "hi"}, {"id": "m2", "body": "there"}]},
        "callLogs": {"+15550100": [{"id": "c1", "status": "missed"}]},
        "users": [{"id": "u1", "name": "Joan Harris", "email": "joan@example.com"}, {"id": "u2", "firstName": "Bo"}],
        "failingIdentifiers": ["broken@example.com"]
    }"#;

    fn backend() -> MemoryBackend {
        serde_json::from_str(FIXTURE).unwrap()
    }

    #[tokio::test]
    async fn test_messages_respect_limit() {
        let backend = backend();
        let msgs = fetch_conversation_messages(&backend, "+15550100", 1).await.unwrap();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].id.as_deref(), Some("m1"));
        let none = fetch_conversation_messages(&backend, "nobody", 10).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_failing_identifier() {
        let backend = backend();
        assert!(backend.get_conversation_by_identifier("broken@example.com").await.is_err());
    }

    #[tokio::test]
    async fn test_user_search_single_char() {
        let backend = backend();
        let users = backend.search_users("b", 10).await.unwrap();
        assert_eq!(users.iter().map(|u| u.id.as_str()).collect::<Vec<_>>(), vec!["u2"]);
        let users = backend.search_users("J", 10).await.unwrap();
        assert_eq!(users.len(), 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FIXTURE.as_bytes()).unwrap();
        let backend = MemoryBackend::load(file.path()).unwrap();
        assert_eq!(backend.users.len(), 2);
        assert!(MemoryBackend::load(Path::new("/nonexistent/fixture.json")).is_err());
    }

    #[tokio::test]
    async fn test_sent_readable_after_poisoned_lock() {
        let sink = MemoryReplySink::default();
        let reply = ReplyPayload {
            content: "hi".into(),
            parent_id: "m1".into(),
            mentions: Vec::new(),
            channel: crate::models::Channel::Sms,
        };
        sink.add_reply("opp-1", &reply).await.unwrap();

        let joined = std::thread::scope(|scope| {
            scope
                .spawn(|| {
                    let _guard = sink.sent.lock().unwrap();
                    panic!("writer died holding the lock");
                })
                .join()
        });
        assert!(joined.is_err());

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "opp-1");
        assert!(sink.add_reply("opp-1", &reply).await.is_err());
    }
}
