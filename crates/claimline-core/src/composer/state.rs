use tracing::{debug, warn};

use super::search::{SearchGate, SearchOutcome, SearchRequest, SearchTicket};
use super::trigger::{clamp_to_boundary, detect_trigger, MentionTrigger};
use crate::models::MentionCandidate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerPhase {
    /// No "@" span at the cursor
    Idle,
    /// "@" span at the cursor, nothing searched yet (bare "@")
    Triggered,
    /// A candidate search was issued for the current span
    Resolving,
}

/// Reply-authoring state bound to one timeline item.
///
/// Offsets are byte offsets into `text` and always sit on char boundaries.
#[derive(Debug)]
pub struct MentionComposer {
    id: u64,
    parent_id: String,
    text: String,
    cursor: usize,
    trigger: Option<MentionTrigger>,
    /// Query of the most recent search issued for the live trigger
    searched_query: Option<String>,
    candidates: Vec<MentionCandidate>,
    selected: Vec<MentionCandidate>,
    search_limit: usize,
    gate: SearchGate,
}

impl MentionComposer {
    pub fn new(id: u64, parent_id: impl Into<String>, search_limit: usize) -> Self {
        Self {
            id,
            parent_id: parent_id.into(),
            text: String::new(),
            cursor: 0,
            trigger: None,
            searched_query: None,
            candidates: Vec::new(),
            selected: Vec::new(),
            search_limit,
            gate: SearchGate::new(),
        }
    }

    // ===== Getters =====

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn parent_id(&self) -> &str {
        &self.parent_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn trigger(&self) -> Option<&MentionTrigger> {
        self.trigger.as_ref()
    }

    pub fn candidates(&self) -> &[MentionCandidate] {
        &self.candidates
    }

    pub fn selected_mentions(&self) -> &[MentionCandidate] {
        &self.selected
    }

    pub fn phase(&self) -> ComposerPhase {
        match (&self.trigger, &self.searched_query) {
            (None, _) => ComposerPhase::Idle,
            (Some(_), None) => ComposerPhase::Triggered,
            (Some(_), Some(_)) => ComposerPhase::Resolving,
        }
    }

    /// Whether the reply has nothing worth sending
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty() && self.selected.is_empty()
    }

    // ===== Editing =====

    /// Text-change event: replace the text and cursor, then re-scan for a
    /// trigger at the cursor.
    ///
    /// Returns a search to run when the live query changed and is non-empty.
    pub fn set_text(&mut self, text: impl Into<String>, cursor: usize) -> Option<SearchRequest> {
        self.text = text.into();
        self.cursor = clamp_to_boundary(&self.text, cursor);
        self.rescan()
    }

    /// Cursor-move event. Moving off the trigger span dismisses it.
    pub fn move_cursor(&mut self, cursor: usize) -> Option<SearchRequest> {
        self.cursor = clamp_to_boundary(&self.text, cursor);
        self.rescan()
    }

    /// Close the candidate list without touching the text
    pub fn dismiss(&mut self) {
        self.clear_trigger();
    }

    fn rescan(&mut self) -> Option<SearchRequest> {
        let Some(trigger) = detect_trigger(&self.text, self.cursor) else {
            self.clear_trigger();
            return None;
        };

        if trigger.query.is_empty() {
            // Bare "@": show the trigger but don't search yet
            self.gate.invalidate();
            self.searched_query = None;
            self.candidates.clear();
            self.trigger = Some(trigger);
            return None;
        }

        if self.searched_query.as_deref() == Some(trigger.query.as_str()) {
            self.trigger = Some(trigger);
            return None;
        }

        let ticket = SearchTicket {
            composer: self.id,
            seq: self.gate.issue(),
        };
        debug!(query = %trigger.query, seq = ticket.seq, "Issuing mention search");
        self.searched_query = Some(trigger.query.clone());
        let request = SearchRequest::new(ticket, trigger.query.clone(), self.search_limit, self.gate.clone());
        self.trigger = Some(trigger);
        Some(request)
    }

    fn clear_trigger(&mut self) {
        if self.trigger.is_some() || self.searched_query.is_some() {
            self.gate.invalidate();
        }
        self.trigger = None;
        self.searched_query = None;
        self.candidates.clear();
    }

    // ===== Search results =====

    /// Whether `ticket` is the latest search this composer issued
    pub fn is_current(&self, ticket: SearchTicket) -> bool {
        ticket.composer == self.id && self.gate.is_current(ticket.seq)
    }

    /// Apply a finished search. Stale results are dropped; failures show no
    /// candidates. Returns whether the outcome was applied.
    pub fn apply_search(&mut self, outcome: SearchOutcome) -> bool {
        if !self.is_current(outcome.ticket) {
            debug!(seq = outcome.ticket.seq, "Dropping stale mention search result");
            return false;
        }

        match outcome.result {
            Ok(candidates) => self.candidates = candidates,
            Err(e) => {
                warn!("Mention search failed: {:#}", e);
                self.candidates.clear();
            }
        }
        true
    }

    // ===== Mentions =====

    /// Pick a candidate for the live trigger: the "@query" span is cut out of
    /// the text, the cursor moves to where the span started, and the
    /// candidate joins the selected mentions unless already present.
    ///
    /// Returns `false` (and does nothing) when no trigger is live.
    pub fn select_candidate(&mut self, candidate: MentionCandidate) -> bool {
        let Some(trigger) = self.trigger.take() else {
            return false;
        };

        let start = trigger.start.min(self.text.len());
        let end = self.cursor.max(start);
        self.text.replace_range(start..end, "");
        self.cursor = start;

        if !self.selected.iter().any(|m| m.user_id == candidate.user_id) {
            self.selected.push(candidate);
        }

        self.clear_trigger();
        true
    }

    /// Select one of the current candidates by position
    pub fn select_candidate_at(&mut self, index: usize) -> bool {
        match self.candidates.get(index).cloned() {
            Some(candidate) => self.select_candidate(candidate),
            None => false,
        }
    }

    /// Remove a selected mention. The text is left untouched.
    pub fn remove_mention(&mut self, index: usize) -> Option<MentionCandidate> {
        (index < self.selected.len()).then(|| self.selected.remove(index))
    }

    /// Back to a blank composer for the same item; outstanding searches go stale
    pub fn reset(&mut self) {
        self.gate.invalidate();
        self.text.clear();
        self.cursor = 0;
        self.trigger = None;
        self.searched_query = None;
        self.candidates.clear();
        self.selected.clear();
    }
}

impl Drop for MentionComposer {
    fn drop(&mut self) {
        // Searches still in flight for a closed composer must never apply
        self.gate.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn candidate(id: &str, name: &str) -> MentionCandidate {
        MentionCandidate {
            user_id: id.to_string(),
            display_name: name.to_string(),
            email: None,
        }
    }

    fn outcome(request: &SearchRequest, names: &[(&str, &str)]) -> SearchOutcome {
        SearchOutcome {
            ticket: request.ticket,
            result: Ok(names.iter().map(|(id, n)| candidate(id, n)).collect()),
        }
    }

    fn type_text(composer: &mut MentionComposer, text: &str) -> Option<SearchRequest> {
        composer.set_text(text, text.len())
    }

    #[test]
    fn test_trigger_detected_on_text_change() {
        let mut c = MentionComposer::new(1, "sms-1", 8);
        let req = type_text(&mut c, "hello @da").unwrap();
        assert_eq!(req.query, "da");
        assert_eq!(req.limit, 8);
        let trigger = c.trigger().unwrap();
        assert_eq!(trigger.query, "da");
        assert_eq!(trigger.start, 6);
        assert_eq!(c.phase(), ComposerPhase::Resolving);
    }

    #[test]
    fn test_trigger_absent_when_cursor_elsewhere() {
        let mut c = MentionComposer::new(1, "sms-1", 8);
        assert!(type_text(&mut c, "hello @da world").is_none());
        assert!(c.trigger().is_none());
        assert_eq!(c.phase(), ComposerPhase::Idle);
    }

    #[test]
    fn test_bare_at_triggers_without_search() {
        let mut c = MentionComposer::new(1, "sms-1", 8);
        assert!(type_text(&mut c, "thanks @").is_none());
        assert_eq!(c.phase(), ComposerPhase::Triggered);
        assert_eq!(c.trigger().unwrap().query, "");
    }

    #[test]
    fn test_same_query_does_not_search_twice() {
        let mut c = MentionComposer::new(1, "sms-1", 8);
        let req = type_text(&mut c, "@jo").unwrap();
        assert!(c.move_cursor(3).is_none());
        assert!(req.is_current());
    }

    #[test]
    fn test_splice_on_selection() {
        let mut c = MentionComposer::new(1, "email-3", 8);
        let text = "Hey @jo, check this";
        let req = c.set_text(text, 7).unwrap();
        assert_eq!(req.query, "jo");
        assert!(c.apply_search(outcome(&req, &[("u1", "Joan"), ("u2", "Jorge")])));

        assert!(c.select_candidate_at(0));
        assert_eq!(c.text(), "Hey , check this");
        assert_eq!(c.cursor(), 4);
        assert_eq!(c.selected_mentions(), &[candidate("u1", "Joan")]);
        assert!(c.trigger().is_none());
        assert!(c.candidates().is_empty());
        assert_eq!(c.phase(), ComposerPhase::Idle);
    }

    #[test]
    fn test_selection_dedupes_by_user_id() {
        let mut c = MentionComposer::new(1, "sms-1", 8);
        type_text(&mut c, "@jo");
        assert!(c.select_candidate(candidate("u1", "Joan")));
        type_text(&mut c, "@joa");
        assert!(c.select_candidate(candidate("u1", "Joan A.")));
        assert_eq!(c.selected_mentions().len(), 1);
        assert_eq!(c.selected_mentions()[0].display_name, "Joan");
        assert_eq!(c.text(), "");
    }

    #[test]
    fn test_select_without_trigger_is_noop() {
        let mut c = MentionComposer::new(1, "sms-1", 8);
        type_text(&mut c, "no mention here");
        assert!(!c.select_candidate(candidate("u1", "Joan")));
        assert_eq!(c.text(), "no mention here");
        assert!(c.selected_mentions().is_empty());
    }

    #[test]
    fn test_stale_search_result_is_ignored() {
        let mut c = MentionComposer::new(1, "sms-1", 8);
        let first = type_text(&mut c, "@j").unwrap();
        let second = type_text(&mut c, "@jo").unwrap();

        // "jo" resolves first, then the slower "j" arrives
        assert!(c.apply_search(outcome(&second, &[("u2", "Jorge")])));
        assert!(!c.apply_search(outcome(&first, &[("u1", "Jane"), ("u2", "Jorge")])));
        assert_eq!(c.candidates(), &[candidate("u2", "Jorge")]);
        assert_eq!(c.trigger().unwrap().query, "jo");

        // And in the other order
        let mut c = MentionComposer::new(2, "sms-1", 8);
        let first = type_text(&mut c, "@j").unwrap();
        let second = type_text(&mut c, "@jo").unwrap();
        assert!(!first.is_current());
        assert!(!c.apply_search(outcome(&first, &[("u1", "Jane")])));
        assert!(c.candidates().is_empty());
        assert!(c.apply_search(outcome(&second, &[("u2", "Jorge")])));
        assert_eq!(c.candidates(), &[candidate("u2", "Jorge")]);
    }

    #[test]
    fn test_search_failure_shows_no_candidates() {
        let mut c = MentionComposer::new(1, "sms-1", 8);
        let req = type_text(&mut c, "@jo").unwrap();
        let failed = SearchOutcome {
            ticket: req.ticket,
            result: Err(anyhow!("directory unavailable")),
        };
        assert!(c.apply_search(failed));
        assert!(c.candidates().is_empty());
        assert!(c.trigger().is_some());
    }

    #[test]
    fn test_dismiss_when_cursor_moves_away() {
        let mut c = MentionComposer::new(1, "sms-1", 8);
        let req = c.set_text("@jo and more", 3).unwrap();
        assert!(c.trigger().is_some());
        assert!(c.move_cursor(12).is_none());
        assert!(c.trigger().is_none());
        assert!(!req.is_current());
        assert!(!c.apply_search(outcome(&req, &[("u1", "Joan")])));
        assert_eq!(c.text(), "@jo and more");
    }

    #[test]
    fn test_deleting_at_sign_dismisses() {
        let mut c = MentionComposer::new(1, "sms-1", 8);
        type_text(&mut c, "hi @jo");
        type_text(&mut c, "hi jo");
        assert!(c.trigger().is_none());
        assert_eq!(c.phase(), ComposerPhase::Idle);
    }

    #[test]
    fn test_remove_mention_leaves_text() {
        let mut c = MentionComposer::new(1, "sms-1", 8);
        type_text(&mut c, "@a");
        c.select_candidate(candidate("u1", "Ann"));
        type_text(&mut c, "see @b");
        c.select_candidate(candidate("u2", "Bo"));
        c.set_text("see @Ann manually", 17);

        assert_eq!(c.remove_mention(0), Some(candidate("u1", "Ann")));
        assert_eq!(c.remove_mention(5), None);
        assert_eq!(c.selected_mentions(), &[candidate("u2", "Bo")]);
        assert_eq!(c.text(), "see @Ann manually");
    }

    #[test]
    fn test_reset_clears_everything_and_stales_searches() {
        let mut c = MentionComposer::new(1, "sms-1", 8);
        let req = type_text(&mut c, "@jo").unwrap();
        c.select_candidate(candidate("u1", "Joan"));
        type_text(&mut c, "draft @x");
        c.reset();
        assert_eq!(c.text(), "");
        assert_eq!(c.cursor(), 0);
        assert!(c.selected_mentions().is_empty());
        assert!(c.is_blank());
        assert!(!req.is_current());
    }

    #[test]
    fn test_drop_stales_outstanding_search() {
        let mut c = MentionComposer::new(1, "sms-1", 8);
        let req = type_text(&mut c, "@jo").unwrap();
        drop(c);
        assert!(!req.is_current());
    }
}
