// Shared test helpers; not all items used by every test binary.
#![allow(unused)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use futures_util::stream::{self, BoxStream, StreamExt};
use relmap::config::Config;
use relmap::history::{
    ChannelId, Group, GroupId, HistorySource, Member, Message, MessageId, ReplyRef, TextChannel,
};
use relmap::sentiment::SentimentScorer;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

pub fn member(id: u64, name: &str) -> Member {
    Member::new(id, name)
}

pub fn group(id: u64, members: &[Member]) -> Group {
    Group {
        id: GroupId(id),
        name: format!("group-{id}"),
        members: members.to_vec(),
    }
}

/// Builds one channel's history with increasing ids and timestamps.
pub struct ChannelScript {
    channel: ChannelId,
    next_id: u64,
    start: DateTime<Utc>,
    pub messages: Vec<Message>,
}

impl ChannelScript {
    pub fn new(channel: u64, first_id: u64) -> Self {
        Self {
            channel: ChannelId(channel),
            next_id: first_id,
            start: Utc::now() - Duration::days(1),
            messages: Vec::new(),
        }
    }

    fn push(&mut self, author: &Member, content: &str) -> &mut Message {
        let id = self.next_id;
        self.next_id += 1;
        self.messages.push(Message {
            id: MessageId(id),
            channel_id: self.channel,
            author: author.clone(),
            content: content.to_string(),
            timestamp: self.start + Duration::seconds(id as i64),
            reply_ref: None,
            mentions: Vec::new(),
        });
        self.messages.last_mut().unwrap()
    }

    pub fn say(&mut self, author: &Member, content: &str) -> MessageId {
        self.push(author, content).id
    }

    /// Reply without the referenced author attached, forcing a fetch.
    pub fn reply(&mut self, author: &Member, to: MessageId, content: &str) -> MessageId {
        let channel = self.channel;
        let m = self.push(author, content);
        m.reply_ref = Some(ReplyRef {
            channel_id: channel,
            message_id: Some(to),
            cached_author: None,
        });
        m.id
    }

    pub fn mention(&mut self, author: &Member, who: &[Member], content: &str) -> MessageId {
        let m = self.push(author, content);
        m.mentions = who.to_vec();
        m.id
    }
}

#[derive(Default)]
pub struct ScriptedHistory {
    channels: Vec<(TextChannel, Vec<Message>)>,
    pub list_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl ScriptedHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(mut self, name: &str, script: ChannelScript) -> Self {
        self.channels.push((
            TextChannel {
                id: script.channel,
                name: name.to_string(),
            },
            script.messages,
        ));
        self
    }
}

#[async_trait]
impl HistorySource for ScriptedHistory {
    async fn text_channels(&self) -> anyhow::Result<Vec<TextChannel>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.channels.iter().map(|(c, _)| c.clone()).collect())
    }

    fn history(
        &self,
        channel: ChannelId,
        after: DateTime<Utc>,
    ) -> BoxStream<'_, anyhow::Result<Message>> {
        let messages: Vec<anyhow::Result<Message>> = self
            .channels
            .iter()
            .filter(|(c, _)| c.id == channel)
            .flat_map(|(_, msgs)| msgs.iter())
            .filter(|m| m.timestamp > after)
            .cloned()
            .map(Ok)
            .collect();
        stream::iter(messages).boxed()
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        id: MessageId,
    ) -> anyhow::Result<Option<Message>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .channels
            .iter()
            .filter(|(c, _)| c.id == channel)
            .flat_map(|(_, msgs)| msgs.iter())
            .find(|m| m.id == id)
            .cloned())
    }
}

/// Scores by keyword: "thanks"/"love" positive, "hate"/"ugh" negative.
#[derive(Default)]
pub struct KeywordScorer {
    pub calls: AtomicUsize,
}

#[async_trait]
impl SentimentScorer for KeywordScorer {
    async fn score(&self, text: &str) -> anyhow::Result<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let lower = text.to_lowercase();
        Ok(if lower.contains("thanks") || lower.contains("love") {
            0.8
        } else if lower.contains("hate") || lower.contains("ugh") {
            -0.6
        } else {
            0.0
        })
    }
}

/// Config writing artifacts into a fresh temp dir.
pub fn temp_config() -> (Config, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.mapping.output_dir = dir.path().join("artifacts").to_string_lossy().into_owned();
    config.mapping.min_edge_count = 2;
    (config, dir)
}
