//! Maps raw per-channel records into [`ActivityItem`]s.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::models::{
    ActivityDetail, ActivityItem, CallLogEntry, Channel, Direction, RawMessage, RawTimestamp,
    MISSED_CALL_RESULT,
};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Statuses the call-log service uses for calls nobody picked up
const MISSED_STATUSES: &[&str] = &["missed", "no-answer", "no_answer", "noanswer"];

/// Normalize all three streams. Output keeps input order: SMS, then email,
/// then phone, each in fetch order.
pub fn normalize(sms: &[RawMessage], email: &[RawMessage], phone: &[CallLogEntry]) -> Vec<ActivityItem> {
    let mut items = Vec::with_capacity(sms.len() + email.len() + phone.len());
    items.extend(normalize_sms(sms));
    items.extend(normalize_email(email));
    items.extend(normalize_calls(phone));
    items
}

pub fn normalize_sms(messages: &[RawMessage]) -> impl Iterator<Item = ActivityItem> + '_ {
    normalize_messages(Channel::Sms, messages, |msg| ActivityDetail::Sms {
        body: message_body(msg),
    })
}

pub fn normalize_email(messages: &[RawMessage]) -> impl Iterator<Item = ActivityItem> + '_ {
    normalize_messages(Channel::Email, messages, |msg| ActivityDetail::Email {
        subject: msg.subject.clone(),
        body: message_body(msg),
    })
}

fn normalize_messages(
    channel: Channel,
    messages: &[RawMessage],
    detail: fn(&RawMessage) -> ActivityDetail,
) -> impl Iterator<Item = ActivityItem> + '_ {
    messages.iter().enumerate().map(move |(index, msg)| ActivityItem {
        id: stable_id(msg.id.as_deref(), channel, index),
        direction: msg
            .direction
            .as_deref()
            .and_then(Direction::parse)
            .unwrap_or(Direction::Inbound),
        timestamp: first_parsed(&[msg.created_at.as_ref(), msg.sent_at.as_ref()]),
        detail: detail(msg),
    })
}

fn message_body(msg: &RawMessage) -> Option<String> {
    msg.body.clone().or_else(|| msg.content.clone())
}

pub fn normalize_calls(calls: &[CallLogEntry]) -> impl Iterator<Item = ActivityItem> + '_ {
    calls.iter().enumerate().map(|(index, call)| {
        let direction = match call.outbound {
            Some(true) => Direction::Outbound,
            Some(false) => Direction::Inbound,
            None => call
                .direction
                .as_deref()
                .and_then(Direction::parse)
                .unwrap_or(Direction::Inbound),
        };

        ActivityItem {
            id: stable_id(call.id.as_deref(), Channel::Phone, index),
            direction,
            timestamp: first_parsed(&[call.start_time.as_ref(), call.created_at.as_ref()]),
            detail: ActivityDetail::Phone {
                duration_seconds: call.duration,
                call_result: call.status.as_deref().map(call_result),
            },
        }
    })
}

fn stable_id(id: Option<&str>, channel: Channel, index: usize) -> String {
    match id.map(str::trim) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("{}-{}", channel, index),
    }
}

fn call_result(status: &str) -> String {
    let status = status.trim().to_ascii_lowercase();
    if MISSED_STATUSES.contains(&status.as_str()) {
        MISSED_CALL_RESULT.to_string()
    } else {
        status
    }
}

/// First candidate that parses wins; a present but unparseable field falls
/// through to the next one.
fn first_parsed(candidates: &[Option<&RawTimestamp>]) -> Option<DateTime<Utc>> {
    candidates.iter().flatten().find_map(|raw| parse_timestamp(raw))
}

pub fn parse_timestamp(raw: &RawTimestamp) -> Option<DateTime<Utc>> {
    match raw {
        RawTimestamp::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
        RawTimestamp::FloatMillis(ms) if ms.is_finite() && ms.abs() < i64::MAX as f64 => {
            Utc.timestamp_millis_opt(ms.round() as i64).single()
        }
        RawTimestamp::FloatMillis(_) | RawTimestamp::Other(_) => None,
        RawTimestamp::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                return None;
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.with_timezone(&Utc));
            }
            NAIVE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|naive| naive.and_utc())
        }
    }
}
