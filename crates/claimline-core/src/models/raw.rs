//! Records as they arrive from the external messaging, call-log and user
//! directory services. Field names follow the services' camelCase JSON.
//!
//! One odd record must not fail a whole listing, so scalar fields are read
//! leniently: ids accept numbers, text fields drop values of the wrong type,
//! and unusable timestamps or durations become `None`.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A timestamp as sent by the services: a formatted string or epoch
/// milliseconds (integer or float). Anything else is kept as `Other` and
/// never parses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    Millis(i64),
    FloatMillis(f64),
    Text(String),
    Other(Value),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
}

/// SMS or email message from a conversation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub direction: Option<String>,
    #[serde(default)]
    pub created_at: Option<RawTimestamp>,
    #[serde(default)]
    pub sent_at: Option<RawTimestamp>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub body: Option<String>,
    /// Some message types carry their text here instead of `body`
    #[serde(default, deserialize_with = "lenient_string")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLogEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub direction: Option<String>,
    /// Explicit flag; takes precedence over `direction` when present
    #[serde(default, deserialize_with = "lenient_bool")]
    pub outbound: Option<bool>,
    #[serde(default)]
    pub start_time: Option<RawTimestamp>,
    #[serde(default)]
    pub created_at: Option<RawTimestamp>,
    /// Whole seconds; fractions round, negative or non-numeric values are dropped
    #[serde(default, alias = "durationSeconds", deserialize_with = "lenient_seconds")]
    pub duration: Option<u32>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
}

/// A user as returned by the directory search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("expected a string or numeric id, got {}", other))),
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<bool>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let seconds = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(seconds
        .filter(|s| s.is_finite() && *s >= 0.0 && *s <= f64::from(u32::MAX))
        .map(|s| s.round() as u32))
}
