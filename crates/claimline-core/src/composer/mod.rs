//! Inline reply composer: "@" mention detection, candidate search
//! sequencing, mention splicing and reply submission.

pub mod search;
pub mod state;
pub mod submit;
pub mod trigger;

pub use search::{SearchGate, SearchOutcome, SearchRequest, SearchTicket};
pub use state::{ComposerPhase, MentionComposer};
pub use submit::{ReplySubmitter, SubmitError, ValidationError};
pub use trigger::{detect_trigger, MentionTrigger};
