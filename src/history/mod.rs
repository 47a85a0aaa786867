//! Chat history as the mapping engine sees it.
//!
//! Platform adapters (see `channels`) convert their native message objects
//! into these types so the engine never touches a platform SDK directly.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }
    };
}

snowflake_id!(
    /// Stable identity of a community member.
    MemberId
);
snowflake_id!(ChannelId);
snowflake_id!(MessageId);
snowflake_id!(
    /// Identity of the group being mapped (a role on Discord).
    GroupId
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub display_name: String,
}

impl Member {
    pub fn new(id: impl Into<MemberId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

/// The set of members whose interactions are mapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChannel {
    pub id: ChannelId,
    pub name: String,
}

/// Pointer from a reply to the message it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRef {
    pub channel_id: ChannelId,
    pub message_id: Option<MessageId>,
    /// Author of the referenced message when the platform already sent it
    /// along with the reply.
    pub cached_author: Option<Member>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub author: Member,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub reply_ref: Option<ReplyRef>,
    pub mentions: Vec<Member>,
}

/// Read-only access to one host's (guild's) message history.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Text channels of the host, in a stable order.
    async fn text_channels(&self) -> anyhow::Result<Vec<TextChannel>>;

    /// Messages of `channel` posted after `after`, oldest first.
    ///
    /// The stream is finite. An `Err` item ends the channel.
    fn history(
        &self,
        channel: ChannelId,
        after: DateTime<Utc>,
    ) -> BoxStream<'_, anyhow::Result<Message>>;

    /// Fetch one message. `Ok(None)` means the host reported it as missing.
    async fn fetch_message(
        &self,
        channel: ChannelId,
        id: MessageId,
    ) -> anyhow::Result<Option<Message>>;
}
