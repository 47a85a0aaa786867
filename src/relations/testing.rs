//! In-memory collaborators for engine tests.

use crate::history::{
    ChannelId, HistorySource, Member, MemberId, Message, MessageId, ReplyRef, TextChannel,
};
use crate::relations::graph::InteractionGraph;
use crate::relations::metric::MetricGrid;
use crate::render::{ColorScale, GraphLayout, Renderer};
use crate::sentiment::SentimentScorer;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use futures_util::stream::{self, BoxStream, StreamExt};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn alice() -> Member {
    Member::new(1, "Alice")
}

pub fn bob() -> Member {
    Member::new(2, "Bob")
}

pub fn carol() -> Member {
    Member::new(3, "Carol")
}

pub fn tracked(members: &[Member]) -> HashSet<MemberId> {
    members.iter().map(|m| m.id).collect()
}

/// Message `id`, timestamped `id` seconds after a point one hour ago.
pub fn msg(id: u64, channel: u64, author: &Member, content: &str) -> Message {
    Message {
        id: MessageId(id),
        channel_id: ChannelId(channel),
        author: author.clone(),
        content: content.to_string(),
        timestamp: Utc::now() - ChronoDuration::hours(1) + ChronoDuration::seconds(id as i64),
        reply_ref: None,
        mentions: Vec::new(),
    }
}

pub trait MessageExt {
    fn replying_to(self, original: &Message, cached: bool) -> Self;
    fn mentioning(self, members: &[Member]) -> Self;
    fn at(self, timestamp: DateTime<Utc>) -> Self;
}

impl MessageExt for Message {
    fn replying_to(mut self, original: &Message, cached: bool) -> Self {
        self.reply_ref = Some(ReplyRef {
            channel_id: original.channel_id,
            message_id: Some(original.id),
            cached_author: cached.then(|| original.author.clone()),
        });
        self
    }

    fn mentioning(mut self, members: &[Member]) -> Self {
        self.mentions.extend(members.iter().cloned());
        self
    }

    fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[derive(Default)]
pub struct FakeHistory {
    channels: Vec<(TextChannel, Vec<Message>)>,
    failing: HashSet<ChannelId>,
    broken_after: HashMap<ChannelId, usize>,
    missing: HashSet<MessageId>,
    fetch_errors: HashSet<MessageId>,
    list_error: Mutex<Option<String>>,
    delay: Option<Duration>,
    pub list_calls: AtomicUsize,
    pub history_calls: AtomicUsize,
    pub fetch_calls: AtomicUsize,
}

impl FakeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, id: u64, name: &str, messages: Vec<Message>) -> Self {
        self.channels.push((
            TextChannel {
                id: ChannelId(id),
                name: name.to_string(),
            },
            messages,
        ));
        self
    }

    /// The channel refuses to be read at all.
    pub fn failing(mut self, id: u64) -> Self {
        self.failing.insert(ChannelId(id));
        self
    }

    /// The channel yields `n` messages and then an error.
    pub fn broken_after(mut self, id: u64, n: usize) -> Self {
        self.broken_after.insert(ChannelId(id), n);
        self
    }

    /// `fetch_message` reports this id as deleted.
    pub fn missing(mut self, id: u64) -> Self {
        self.missing.insert(MessageId(id));
        self
    }

    /// `fetch_message` fails for this id.
    pub fn fetch_error(mut self, id: u64) -> Self {
        self.fetch_errors.insert(MessageId(id));
        self
    }

    /// The first `text_channels` call fails.
    pub fn list_error_once(self, message: &str) -> Self {
        *self.list_error.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl HistorySource for FakeHistory {
    async fn text_channels(&self) -> anyhow::Result<Vec<TextChannel>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self.list_error.lock().unwrap().take() {
            anyhow::bail!(message);
        }
        Ok(self.channels.iter().map(|(c, _)| c.clone()).collect())
    }

    fn history(
        &self,
        channel: ChannelId,
        after: DateTime<Utc>,
    ) -> BoxStream<'_, anyhow::Result<Message>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&channel) {
            return stream::once(async move { Err(anyhow::anyhow!("403 Missing Access")) })
                .boxed();
        }
        let mut messages: Vec<Message> = self
            .channels
            .iter()
            .find(|(c, _)| c.id == channel)
            .map(|(_, msgs)| msgs.clone())
            .unwrap_or_default();
        messages.retain(|m| m.timestamp > after);
        let mut items: Vec<anyhow::Result<Message>> = messages.into_iter().map(Ok).collect();
        if let Some(&n) = self.broken_after.get(&channel) {
            items.truncate(n);
            items.push(Err(anyhow::anyhow!("connection reset")));
        }
        stream::iter(items).boxed()
    }

    async fn fetch_message(
        &self,
        channel: ChannelId,
        id: MessageId,
    ) -> anyhow::Result<Option<Message>> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fetch_errors.contains(&id) {
            anyhow::bail!("502 Bad Gateway");
        }
        if self.missing.contains(&id) {
            return Ok(None);
        }
        Ok(self
            .channels
            .iter()
            .filter(|(c, _)| c.id == channel)
            .flat_map(|(_, msgs)| msgs.iter())
            .find(|m| m.id == id)
            .cloned())
    }
}

/// Scores by exact content lookup; unknown content scores 0.
#[derive(Default)]
pub struct FakeScorer {
    scores: HashMap<String, f64>,
    failing: HashSet<String>,
    pub calls: Mutex<Vec<String>>,
}

impl FakeScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, content: &str, score: f64) -> Self {
        self.scores.insert(content.to_string(), score);
        self
    }

    pub fn failing_on(mut self, content: &str) -> Self {
        self.failing.insert(content.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SentimentScorer for FakeScorer {
    async fn score(&self, text: &str) -> anyhow::Result<f64> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.failing.contains(text) {
            anyhow::bail!("model overloaded");
        }
        Ok(self.scores.get(text).copied().unwrap_or(0.0))
    }
}

/// Writes a marker file instead of drawing; can fail a set number of times.
#[derive(Default)]
pub struct FakeRenderer {
    failures_left: AtomicUsize,
    pub matrix_calls: AtomicUsize,
    pub graph_calls: AtomicUsize,
    pub last_graph_edges: Mutex<Option<usize>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_times(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }

    fn maybe_fail(&self) -> anyhow::Result<()> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            anyhow::bail!("backend error: out of memory");
        }
        Ok(())
    }
}

impl Renderer for FakeRenderer {
    fn render_matrix(
        &self,
        grid: &MetricGrid,
        color_scale: ColorScale,
        path: &Path,
    ) -> anyhow::Result<PathBuf> {
        self.matrix_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        std::fs::write(path, format!("{} {}", grid.metric, color_scale))?;
        Ok(path.to_path_buf())
    }

    fn render_graph(
        &self,
        graph: &InteractionGraph,
        _layout: GraphLayout,
        path: &Path,
    ) -> anyhow::Result<PathBuf> {
        self.graph_calls.fetch_add(1, Ordering::SeqCst);
        self.maybe_fail()?;
        *self.last_graph_edges.lock().unwrap() = Some(graph.edges.len());
        std::fs::write(path, "graph")?;
        Ok(path.to_path_buf())
    }
}
