use serde::{Deserialize, Serialize};

use crate::models::{ActivityItem, Channel};

/// Channel selection applied to the feed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelFilter {
    #[default]
    All,
    Sms,
    Email,
    Phone,
}

impl ChannelFilter {
    pub const VALUES: [ChannelFilter; 4] = [Self::All, Self::Sms, Self::Email, Self::Phone];

    pub fn channel(&self) -> Option<Channel> {
        match self {
            Self::All => None,
            Self::Sms => Some(Channel::Sms),
            Self::Email => Some(Channel::Email),
            Self::Phone => Some(Channel::Phone),
        }
    }

    pub fn matches(&self, item: &ActivityItem) -> bool {
        self.channel().map_or(true, |c| item.channel() == c)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Sms => "sms",
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::VALUES
            .into_iter()
            .find(|f| f.label().eq_ignore_ascii_case(value.trim()))
    }
}

impl From<Channel> for ChannelFilter {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Sms => Self::Sms,
            Channel::Email => Self::Email,
            Channel::Phone => Self::Phone,
        }
    }
}

/// Per-channel tallies shown on the filter tabs
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ChannelCounts {
    pub total: usize,
    pub sms: usize,
    pub email: usize,
    pub phone: usize,
}

impl ChannelCounts {
    pub fn get(&self, filter: ChannelFilter) -> usize {
        match filter {
            ChannelFilter::All => self.total,
            ChannelFilter::Sms => self.sms,
            ChannelFilter::Email => self.email,
            ChannelFilter::Phone => self.phone,
        }
    }
}

pub fn filter(feed: &[ActivityItem], selection: ChannelFilter) -> Vec<ActivityItem> {
    feed.iter().filter(|item| selection.matches(item)).cloned().collect()
}

pub fn counts(feed: &[ActivityItem]) -> ChannelCounts {
    feed.iter().fold(ChannelCounts::default(), |mut acc, item| {
        acc.total += 1;
        match item.channel() {
            Channel::Sms => acc.sms += 1,
            Channel::Email => acc.email += 1,
            Channel::Phone => acc.phone += 1,
        }
        acc
    })
}
