//! Per-contact timeline controller: owns the fetched streams, the merged
//! feed, filter and collapse state, and the single open reply composer.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::composer::{MentionComposer, ReplySubmitter, SearchOutcome, SearchRequest, SubmitError};
use crate::config::CoreConfig;
use crate::models::{ActivityItem, CallLogEntry, Channel, RawMessage, ReplyPayload};
use crate::services::{fetch_conversation_messages, CallLogService, ConversationService};
use crate::timeline::{self, ChannelCounts, ChannelFilter, CollapseState};

/// How to reach the contact whose activity is shown
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactIdentifiers {
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// Fresh contents for one stream
#[derive(Debug, Clone)]
pub enum StreamUpdate {
    Sms(Vec<RawMessage>),
    Email(Vec<RawMessage>),
    Phone(Vec<CallLogEntry>),
}

impl StreamUpdate {
    pub fn channel(&self) -> Channel {
        match self {
            Self::Sms(_) => Channel::Sms,
            Self::Email(_) => Channel::Email,
            Self::Phone(_) => Channel::Phone,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Sms(items) | Self::Email(items) => items.len(),
            Self::Phone(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No timeline item with id {0}")]
    UnknownItem(String),

    #[error("No reply is being composed")]
    NoOpenReply,

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

struct ActiveReply {
    composer: MentionComposer,
    channel: Channel,
}

pub struct TimelineSession {
    config: CoreConfig,
    sms: Vec<RawMessage>,
    email: Vec<RawMessage>,
    phone: Vec<CallLogEntry>,
    feed: Vec<ActivityItem>,
    filter: ChannelFilter,
    collapsed: CollapseState,
    reply: Option<ActiveReply>,
    next_composer_id: u64,
}

impl TimelineSession {
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            sms: Vec::new(),
            email: Vec::new(),
            phone: Vec::new(),
            feed: Vec::new(),
            filter: ChannelFilter::All,
            collapsed: CollapseState::new(),
            reply: None,
            next_composer_id: 1,
        }
    }

    // ===== Streams =====

    /// Fetch all three streams concurrently. Each stream is applied as soon
    /// as it arrives; a failing stream is replaced by an empty one.
    pub async fn refresh(
        &mut self,
        contact: &ContactIdentifiers,
        conversations: &dyn ConversationService,
        call_logs: &dyn CallLogService,
    ) {
        let message_limit = self.config.message_limit;
        let call_log_limit = self.config.call_log_limit;
        let phone = contact.phone.as_deref();
        let email = contact.email.as_deref();

        let mut pending: FuturesUnordered<BoxFuture<'_, StreamUpdate>> = FuturesUnordered::new();
        pending.push(
            fetch_messages(conversations, phone, message_limit)
                .map(StreamUpdate::Sms)
                .boxed(),
        );
        pending.push(
            fetch_messages(conversations, email, message_limit)
                .map(StreamUpdate::Email)
                .boxed(),
        );
        pending.push(fetch_calls(call_logs, phone, call_log_limit).map(StreamUpdate::Phone).boxed());

        while let Some(update) = pending.next().await {
            self.apply_stream(update);
        }
        info!(
            sms = self.sms.len(),
            email = self.email.len(),
            phone = self.phone.len(),
            "Timeline refreshed"
        );
    }

    /// Replace one stream and rebuild the feed
    pub fn apply_stream(&mut self, update: StreamUpdate) {
        debug!(channel = %update.channel(), count = update.len(), "Applying stream update");
        match update {
            StreamUpdate::Sms(items) => self.sms = items,
            StreamUpdate::Email(items) => self.email = items,
            StreamUpdate::Phone(items) => self.phone = items,
        }
        self.feed = timeline::merge(&timeline::normalize(&self.sms, &self.email, &self.phone));
    }

    // ===== Feed =====

    /// The full merged feed, newest first
    pub fn feed(&self) -> &[ActivityItem] {
        &self.feed
    }

    pub fn visible_feed(&self) -> Vec<ActivityItem> {
        timeline::filter(&self.feed, self.filter)
    }

    pub fn counts(&self) -> ChannelCounts {
        timeline::counts(&self.feed)
    }

    pub fn filter(&self) -> ChannelFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: ChannelFilter) {
        self.filter = filter;
    }

    pub fn item(&self, id: &str) -> Option<&ActivityItem> {
        self.feed.iter().find(|item| item.id == id)
    }

    pub fn toggle_collapsed(&mut self, id: &str) {
        self.collapsed = std::mem::take(&mut self.collapsed).toggle(id);
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.is_collapsed(id)
    }

    pub fn collapse_state(&self) -> &CollapseState {
        &self.collapsed
    }

    // ===== Reply composer =====

    /// Open the reply box for a feed item. Opening a different item discards
    /// the previous draft; reopening the same item keeps it.
    pub fn open_reply(&mut self, item_id: &str) -> Result<&mut MentionComposer, SessionError> {
        let channel = self
            .item(item_id)
            .map(ActivityItem::channel)
            .ok_or_else(|| SessionError::UnknownItem(item_id.to_string()))?;

        let keep = self
            .reply
            .as_ref()
            .is_some_and(|r| r.composer.parent_id() == item_id);
        if !keep {
            let id = self.next_composer_id;
            self.next_composer_id += 1;
            debug!(item = %item_id, composer = id, "Opening reply composer");
            self.reply = Some(ActiveReply {
                composer: MentionComposer::new(id, item_id, self.config.user_search_limit),
                channel,
            });
        }

        self.composer_mut().ok_or(SessionError::NoOpenReply)
    }

    pub fn close_reply(&mut self) {
        self.reply = None;
    }

    pub fn composer(&self) -> Option<&MentionComposer> {
        self.reply.as_ref().map(|r| &r.composer)
    }

    pub fn composer_mut(&mut self) -> Option<&mut MentionComposer> {
        self.reply.as_mut().map(|r| &mut r.composer)
    }

    pub fn edit_reply(&mut self, text: impl Into<String>, cursor: usize) -> Result<Option<SearchRequest>, SessionError> {
        let composer = self.composer_mut().ok_or(SessionError::NoOpenReply)?;
        Ok(composer.set_text(text, cursor))
    }

    pub fn move_reply_cursor(&mut self, cursor: usize) -> Result<Option<SearchRequest>, SessionError> {
        let composer = self.composer_mut().ok_or(SessionError::NoOpenReply)?;
        Ok(composer.move_cursor(cursor))
    }

    pub fn search_debounce(&self) -> Duration {
        self.config.search_debounce()
    }

    /// Hand a finished search to the open composer. Returns whether it was
    /// applied; results for a closed or replaced composer are dropped.
    pub fn deliver_search(&mut self, outcome: SearchOutcome) -> bool {
        match self.composer_mut() {
            Some(composer) => composer.apply_search(outcome),
            None => {
                debug!(composer = outcome.ticket.composer, "Dropping search result for closed composer");
                false
            }
        }
    }

    /// Submit the open reply against its parent item. The reply box closes
    /// only when the sink accepted it.
    pub async fn submit_reply(&mut self, submitter: &ReplySubmitter) -> Result<ReplyPayload, SessionError> {
        let reply = self.reply.as_mut().ok_or(SessionError::NoOpenReply)?;
        let parent_id = reply.composer.parent_id().to_string();
        let payload = submitter
            .submit(&mut reply.composer, &parent_id, reply.channel)
            .await?;
        self.reply = None;
        Ok(payload)
    }
}

async fn fetch_messages(
    service: &dyn ConversationService,
    identifier: Option<&str>,
    limit: usize,
) -> Vec<RawMessage> {
    let Some(identifier) = identifier else {
        return Vec::new();
    };
    match fetch_conversation_messages(service, identifier, limit).await {
        Ok(messages) => messages,
        Err(e) => {
            warn!(identifier = %identifier, "Message fetch failed, showing none: {:#}", e);
            Vec::new()
        }
    }
}

async fn fetch_calls(service: &dyn CallLogService, phone: Option<&str>, limit: usize) -> Vec<CallLogEntry> {
    let Some(phone) = phone else {
        return Vec::new();
    };
    match service.get_call_logs(phone, limit).await {
        Ok(calls) => calls,
        Err(e) => {
            warn!(phone = %phone, "Call log fetch failed, showing none: {:#}", e);
            Vec::new()
        }
    }
}
