use std::collections::HashSet;

/// Ids of feed items whose body is hidden.
///
/// Ids that no longer match a feed item are harmless and simply never
/// consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapseState {
    collapsed: HashSet<String>,
}

impl CollapseState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flip membership of `id`
    #[must_use]
    pub fn toggle(mut self, id: &str) -> Self {
        if !self.collapsed.remove(id) {
            self.collapsed.insert(id.to_string());
        }
        self
    }

    pub fn is_collapsed(&self, id: &str) -> bool {
        self.collapsed.contains(id)
    }

    pub fn len(&self) -> usize {
        self.collapsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collapsed.is_empty()
    }

    /// Drop ids not present in `live_ids`
    #[must_use]
    pub fn prune<'a>(mut self, live_ids: impl IntoIterator<Item = &'a str>) -> Self {
        let live: HashSet<&str> = live_ids.into_iter().collect();
        self.collapsed.retain(|id| live.contains(id.as_str()));
        self
    }
}

impl<S: Into<String>> FromIterator<S> for CollapseState {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            collapsed: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_toggle_adds_then_removes() {
        let state = CollapseState::new().toggle("sms-1");
        assert!(state.is_collapsed("sms-1"));
        let state = state.toggle("sms-1");
        assert!(!state.is_collapsed("sms-1"));
        assert!(state.is_empty());
    }

    #[test]
    fn test_stale_ids_are_inert() {
        let state = CollapseState::new().toggle("gone").toggle("kept");
        assert!(state.is_collapsed("gone"));
        let pruned = state.prune(["kept", "other"]);
        assert!(!pruned.is_collapsed("gone"));
        assert!(pruned.is_collapsed("kept"));
        assert_eq!(pruned.len(), 1);
    }

    proptest! {
        #[test]
        fn prop_double_toggle_is_identity(ids in prop::collection::hash_set("[a-z]{1,4}", 0..20), id in "[a-z]{1,4}") {
            let state: CollapseState = ids.into_iter().collect();
            let round_trip = state.clone().toggle(&id).toggle(&id);
            prop_assert_eq!(round_trip, state);
        }
    }
}
