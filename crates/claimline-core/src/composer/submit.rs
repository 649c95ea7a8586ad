use std::sync::Arc;

use tracing::{info, warn};

use super::state::MentionComposer;
use crate::models::{Channel, ReplyPayload};
use crate::services::ReplySink;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Reply is empty: add text or mention someone")]
    EmptyReply,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The sink rejected the reply; the composer still holds the draft
    #[error("Failed to send reply: {0:#}")]
    Dispatch(anyhow::Error),
}

/// Validates composer drafts and hands them to the reply sink for one
/// opportunity.
#[derive(Clone)]
pub struct ReplySubmitter {
    opportunity_id: String,
    sink: Arc<dyn ReplySink>,
}

impl ReplySubmitter {
    pub fn new(opportunity_id: impl Into<String>, sink: Arc<dyn ReplySink>) -> Self {
        Self {
            opportunity_id: opportunity_id.into(),
            sink,
        }
    }

    /// Build the payload for the composer's current draft
    pub fn prepare(
        composer: &MentionComposer,
        parent_id: &str,
        channel: Channel,
    ) -> Result<ReplyPayload, ValidationError> {
        if composer.is_blank() {
            return Err(ValidationError::EmptyReply);
        }

        Ok(ReplyPayload {
            content: composer.text().to_string(),
            parent_id: parent_id.to_string(),
            mentions: composer.selected_mentions().to_vec(),
            channel,
        })
    }

    /// Validate and dispatch the draft. The composer is reset only after the
    /// sink accepted the reply; on any error it is left as it was.
    pub async fn submit(
        &self,
        composer: &mut MentionComposer,
        parent_id: &str,
        channel: Channel,
    ) -> Result<ReplyPayload, SubmitError> {
        let payload = Self::prepare(composer, parent_id, channel)?;

        if let Err(e) = self.sink.add_reply(&self.opportunity_id, &payload).await {
            warn!(
                opportunity = %self.opportunity_id,
                parent = %parent_id,
                "Reply dispatch failed: {:#}",
                e
            );
            return Err(SubmitError::Dispatch(e));
        }

        info!(
            opportunity = %self.opportunity_id,
            parent = %parent_id,
            %channel,
            mentions = payload.mentions.len(),
            "Reply sent"
        );
        composer.reset();
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MentionCandidate;
    use crate::services::memory::MemoryReplySink;

    fn joan() -> MentionCandidate {
        MentionCandidate {
            user_id: "u1".into(),
            display_name: "Joan".into(),
            email: Some("joan@example.com".into()),
        }
    }

    #[tokio::test]
    async fn test_whitespace_only_reply_is_rejected() {
        let sink = Arc::new(MemoryReplySink::default());
        let submitter = ReplySubmitter::new("opp-1", sink.clone());
        let mut composer = MentionComposer::new(1, "sms-1", 8);
        composer.set_text("   ", 3);

        let err = submitter.submit(&mut composer, "sms-1", Channel::Sms).await.unwrap_err();
        assert!(matches!(err, SubmitError::Invalid(ValidationError::EmptyReply)));
        assert!(sink.sent().is_empty());
        assert_eq!(composer.text(), "   ");
    }

    #[tokio::test]
    async fn test_mention_only_reply_is_sent() {
        let sink = Arc::new(MemoryReplySink::default());
        let submitter = ReplySubmitter::new("opp-1", sink.clone());
        let mut composer = MentionComposer::new(1, "email-2", 8);
        composer.set_text("@jo", 3);
        assert!(composer.select_candidate(joan()));
        assert_eq!(composer.text(), "");

        let payload = submitter.submit(&mut composer, "email-2", Channel::Email).await.unwrap();
        assert_eq!(payload.content, "");
        assert_eq!(payload.parent_id, "email-2");
        assert_eq!(payload.mentions, vec![joan()]);
        assert_eq!(payload.channel, Channel::Email);

        let sent = sink.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "opp-1");
        assert_eq!(sent[0].1, payload);
        assert!(composer.is_blank());
    }

    #[tokio::test]
    async fn test_dispatch_failure_preserves_draft() {
        let sink = Arc::new(MemoryReplySink::failing("sink offline"));
        let submitter = ReplySubmitter::new("opp-1", sink.clone());
        let mut composer = MentionComposer::new(1, "phone-0", 8);
        composer.set_text("@jo", 3);
        composer.select_candidate(joan());
        composer.set_text("Called back, see notes", 22);

        let err = submitter.submit(&mut composer, "phone-0", Channel::Phone).await.unwrap_err();
        assert!(matches!(err, SubmitError::Dispatch(_)));
        assert!(err.to_string().contains("sink offline"));
        assert_eq!(composer.text(), "Called back, see notes");
        assert_eq!(composer.selected_mentions(), &[joan()]);
    }

    #[test]
    fn test_payload_serializes_camel_case() {
        let mut composer = MentionComposer::new(1, "sms-1", 8);
        composer.set_text("On my way", 9);
        let payload = ReplySubmitter::prepare(&composer, "sms-1", Channel::Sms).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["parentId"], "sms-1");
        assert_eq!(json["channel"], "sms");
        assert_eq!(json["content"], "On my way");
        assert!(json["mentions"].as_array().unwrap().is_empty());
    }
}
