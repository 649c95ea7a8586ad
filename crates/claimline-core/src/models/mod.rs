pub mod activity;
pub mod mention;
pub mod raw;
pub mod reply;

pub use activity::{ActivityDetail, ActivityItem, Channel, Direction, MISSED_CALL_RESULT};
pub use mention::MentionCandidate;
pub use raw::{CallLogEntry, Conversation, RawMessage, RawTimestamp, UserRecord};
pub use reply::ReplyPayload;
