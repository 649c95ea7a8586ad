pub mod composer;
pub mod config;
pub mod models;
pub mod services;
pub mod session;
pub mod timeline;
pub mod tracing_setup;

pub use composer::{MentionComposer, ReplySubmitter, SearchRequest, SearchTicket};
pub use config::CoreConfig;
pub use models::{ActivityItem, Channel, Direction, MentionCandidate, ReplyPayload};
pub use session::{ContactIdentifiers, TimelineSession};
pub use timeline::{ChannelCounts, ChannelFilter, CollapseState};
