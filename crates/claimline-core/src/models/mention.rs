use serde::{Deserialize, Serialize};

use super::raw::UserRecord;

/// A directory user eligible to be mentioned in a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MentionCandidate {
    pub user_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl From<UserRecord> for MentionCandidate {
    fn from(user: UserRecord) -> Self {
        let full_name = [user.first_name.as_deref(), user.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let display_name = user
            .name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| (!full_name.is_empty()).then_some(full_name))
            .or_else(|| user.email.clone())
            .unwrap_or_else(|| user.id.clone());

        Self {
            user_id: user.id,
            display_name,
            email: user.email,
        }
    }
}
