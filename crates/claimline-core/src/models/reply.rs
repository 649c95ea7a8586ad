use serde::Serialize;

use super::activity::Channel;
use super::mention::MentionCandidate;

/// Outbound reply handed to the reply sink
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyPayload {
    pub content: String,
    pub parent_id: String,
    pub mentions: Vec<MentionCandidate>,
    pub channel: Channel,
}
