//! Normalize, merge and filter the three activity streams.

pub mod collapse;
pub mod filter;
pub mod merge;
pub mod normalize;

pub use collapse::CollapseState;
pub use filter::{counts, filter, ChannelCounts, ChannelFilter};
pub use merge::merge;
pub use normalize::normalize;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CallLogEntry, RawMessage, RawTimestamp};
    use proptest::prelude::*;

    fn arb_stamp() -> impl Strategy<Value = Option<RawTimestamp>> {
        prop_oneof![
            (0i64..4_000_000_000_000).prop_map(|ms| Some(RawTimestamp::Millis(ms))),
            Just(Some(RawTimestamp::Text("unknown".to_string()))),
            Just(None),
        ]
    }

    fn arb_messages() -> impl Strategy<Value = Vec<RawMessage>> {
        prop::collection::vec(
            (arb_stamp(), arb_stamp()).prop_map(|(created_at, sent_at)| RawMessage {
                created_at,
                sent_at,
                ..Default::default()
            }),
            0..40,
        )
    }

    fn arb_calls() -> impl Strategy<Value = Vec<CallLogEntry>> {
        prop::collection::vec(
            arb_stamp().prop_map(|start_time| CallLogEntry {
                start_time,
                ..Default::default()
            }),
            0..40,
        )
    }

    proptest! {
        #[test]
        fn prop_pipeline_orders_and_conserves(sms in arb_messages(), email in arb_messages(), phone in arb_calls()) {
            let feed = merge(&normalize(&sms, &email, &phone));

            prop_assert_eq!(feed.len(), sms.len() + email.len() + phone.len());
            for pair in feed.windows(2) {
                prop_assert!(pair[0].timestamp >= pair[1].timestamp);
            }

            let c = counts(&feed);
            prop_assert_eq!(c.total, c.sms + c.email + c.phone);
            prop_assert_eq!(c.sms, sms.len());
            prop_assert_eq!(c.email, email.len());
            prop_assert_eq!(c.phone, phone.len());
        }
    }
}
