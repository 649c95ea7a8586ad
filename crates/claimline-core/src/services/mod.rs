//! External collaborators the timeline reads from and the reply sink it
//! writes to. Transport and wire formats belong to the implementations.

pub mod http;
pub mod memory;

use anyhow::Result;
use futures::future::BoxFuture;

use crate::models::{CallLogEntry, Conversation, RawMessage, ReplyPayload, UserRecord};

pub use http::HttpCrmClient;
pub use memory::{MemoryBackend, MemoryReplySink};

pub trait ConversationService: Send + Sync {
    fn get_conversation_by_identifier<'a>(
        &'a self,
        phone_or_email: &'a str,
    ) -> BoxFuture<'a, Result<Option<Conversation>>>;

    fn get_messages_by_conversation<'a>(
        &'a self,
        conversation_id: &'a str,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<RawMessage>>>;
}

pub trait CallLogService: Send + Sync {
    fn get_call_logs<'a>(&'a self, phone_number: &'a str, limit: usize) -> BoxFuture<'a, Result<Vec<CallLogEntry>>>;
}

pub trait UserDirectory: Send + Sync {
    /// `query` may be a single character
    fn search_users<'a>(&'a self, query: &'a str, limit: usize) -> BoxFuture<'a, Result<Vec<UserRecord>>>;
}

pub trait ReplySink: Send + Sync {
    fn add_reply<'a>(&'a self, opportunity_id: &'a str, reply: &'a ReplyPayload) -> BoxFuture<'a, Result<()>>;
}

/// Look up the conversation for `identifier` and fetch its messages.
/// A contact without a conversation simply has no messages.
pub async fn fetch_conversation_messages(
    service: &dyn ConversationService,
    identifier: &str,
    limit: usize,
) -> Result<Vec<RawMessage>> {
    match service.get_conversation_by_identifier(identifier).await? {
        Some(conversation) => service.get_messages_by_conversation(&conversation.id, limit).await,
        None => Ok(Vec::new()),
    }
}
