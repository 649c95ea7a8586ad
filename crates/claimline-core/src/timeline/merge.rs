use std::cmp::Reverse;

use crate::models::ActivityItem;

/// Merge normalized items into one feed, newest first.
///
/// The sort is stable, so items with equal timestamps keep their input
/// order. Undated items (`timestamp == None`) sink to the end.
pub fn merge(items: &[ActivityItem]) -> Vec<ActivityItem> {
    let mut feed = items.to_vec();
    // Option orders None < Some, so reversing puts undated items last
    feed.sort_by_key(|item| Reverse(item.timestamp));
    feed
}
