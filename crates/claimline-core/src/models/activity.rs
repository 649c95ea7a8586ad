use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `call_result` value for calls that were never answered
pub const MISSED_CALL_RESULT: &str = "missed";

/// Origin system of an activity item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Sms,
    Email,
    Phone,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Sms, Channel::Email, Channel::Phone];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Sms => "sms",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    /// Parse a loosely formatted direction string ("inbound", "Outgoing", "in", ...)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inbound" | "incoming" | "in" | "received" => Some(Self::Inbound),
            "outbound" | "outgoing" | "out" | "sent" => Some(Self::Outbound),
            _ => None,
        }
    }
}

/// Channel-specific payload of an activity item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "channel", rename_all = "lowercase")]
pub enum ActivityDetail {
    Sms {
        body: Option<String>,
    },
    Email {
        subject: Option<String>,
        body: Option<String>,
    },
    Phone {
        duration_seconds: Option<u32>,
        call_result: Option<String>,
    },
}

/// One communication event on the timeline, normalized from any channel.
///
/// `timestamp` is `None` when the source record had no parseable time; such
/// items sort after every dated item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityItem {
    pub id: String,
    pub direction: Direction,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub detail: ActivityDetail,
}

impl ActivityItem {
    pub fn channel(&self) -> Channel {
        match self.detail {
            ActivityDetail::Sms { .. } => Channel::Sms,
            ActivityDetail::Email { .. } => Channel::Email,
            ActivityDetail::Phone { .. } => Channel::Phone,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        match &self.detail {
            ActivityDetail::Email { subject, .. } => subject.as_deref(),
            _ => None,
        }
    }

    pub fn body(&self) -> Option<&str> {
        match &self.detail {
            ActivityDetail::Sms { body } | ActivityDetail::Email { body, .. } => body.as_deref(),
            ActivityDetail::Phone { .. } => None,
        }
    }

    pub fn is_missed_call(&self) -> bool {
        matches!(
            &self.detail,
            ActivityDetail::Phone { call_result: Some(result), .. } if result == MISSED_CALL_RESULT
        )
    }
}
