use crate::errors::{RelmapError, RelmapResult};
use crate::history::{ChannelId, Group, GroupId, HistorySource, Member, MemberId, TextChannel};
use crate::relations::artifacts::ArtifactCache;
use crate::relations::matrix::InteractionMatrix;
use crate::relations::progress::ScanProgress;
use crate::relations::resolver::{SpeakerCursor, TargetResolver};
use crate::sentiment::{SentimentScorer, truncate_for_scoring};
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use futures_util::StreamExt;
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// What a map covers. Equal scopes share one map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Scope {
    pub group: GroupId,
    pub lookback_days: u32,
    /// Restrict the scan to one channel instead of the whole host.
    pub channel: Option<ChannelId>,
}

/// Interaction statistics for one scope, built by at most one scan.
#[derive(Debug)]
pub struct MessageMap {
    scope: Scope,
    group_name: String,
    members: Vec<Member>,
    tracked: HashSet<MemberId>,
    created_at: DateTime<Utc>,
    since: DateTime<Utc>,
    scan: OnceCell<Arc<InteractionMatrix>>,
    artifacts: ArtifactCache,
    progress: Arc<ScanProgress>,
    requests: AtomicU64,
}

impl MessageMap {
    /// Track every member of `group` except `bot`.
    pub fn new(
        scope: Scope,
        group: &Group,
        bot: Option<MemberId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut seen = HashSet::new();
        let members: Vec<Member> = group
            .members
            .iter()
            .filter(|m| Some(m.id) != bot && seen.insert(m.id))
            .cloned()
            .collect();
        let tracked = members.iter().map(|m| m.id).collect();
        Self {
            scope,
            group_name: group.name.clone(),
            members,
            tracked,
            created_at,
            since: created_at
                .checked_sub_signed(Duration::days(i64::from(scope.lookback_days)))
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            scan: OnceCell::new(),
            artifacts: ArtifactCache::new(),
            progress: Arc::new(ScanProgress::default()),
            requests: AtomicU64::new(0),
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn group_name(&self) -> &str {
        &self.group_name
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn since(&self) -> DateTime<Utc> {
        self.since
    }

    pub fn artifacts(&self) -> &ArtifactCache {
        &self.artifacts
    }

    pub fn progress(&self) -> Arc<ScanProgress> {
        self.progress.clone()
    }

    /// Count a request against this map; returns the running total.
    pub fn record_request(&self) -> u64 {
        self.requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// The finished matrix, if the scan has completed.
    pub fn matrix(&self) -> Option<Arc<InteractionMatrix>> {
        self.scan.get().cloned()
    }

    pub fn is_complete(&self) -> bool {
        self.scan.initialized()
    }

    /// Whether the map is older than `max_age` at `now`.
    pub fn is_stale(&self, now: DateTime<Utc>, max_age: Option<Duration>) -> bool {
        max_age.is_some_and(|age| now - self.created_at > age)
    }

    /// Scan history into the matrix, or join the scan already running.
    ///
    /// A failed scan leaves the map empty, so the next call starts over.
    pub async fn build(
        &self,
        source: &dyn HistorySource,
        scorer: &dyn SentimentScorer,
        max_chars: usize,
    ) -> RelmapResult<Arc<InteractionMatrix>> {
        self.scan
            .get_or_try_init(|| self.scan_all(source, scorer, max_chars))
            .await
            .cloned()
    }

    async fn scan_all(
        &self,
        source: &dyn HistorySource,
        scorer: &dyn SentimentScorer,
        max_chars: usize,
    ) -> RelmapResult<Arc<InteractionMatrix>> {
        let channels = match self.scope.channel {
            Some(id) => vec![TextChannel {
                id,
                name: id.to_string(),
            }],
            None => source
                .text_channels()
                .await
                .context("Failed to list text channels")?,
        };
        info!(
            "Mapping group '{}' ({} members) over {} channel(s) since {}",
            self.group_name,
            self.members.len(),
            channels.len(),
            self.since.format("%Y-%m-%d")
        );

        let mut matrix = InteractionMatrix::new(self.members.iter().cloned());
        for channel in &channels {
            let mut tally = matrix.empty_like();
            match self
                .scan_channel(channel, source, scorer, max_chars, &mut tally)
                .await
            {
                Ok(recorded) => {
                    matrix.absorb(&tally);
                    self.progress
                        .messages_recorded
                        .fetch_add(recorded, Ordering::Relaxed);
                    self.progress
                        .channels_scanned
                        .fetch_add(1, Ordering::Relaxed);
                    debug!("Channel #{} contributed {} messages", channel.name, recorded);
                }
                Err(e) if e.is_recoverable() => {
                    self.progress
                        .channels_skipped
                        .fetch_add(1, Ordering::Relaxed);
                    warn!("Skipping channel: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        let snapshot = self.progress.snapshot(std::time::Duration::ZERO);
        info!(
            "Mapped group '{}': {} messages seen, {} recorded, {} channels skipped",
            self.group_name,
            snapshot.messages_seen,
            snapshot.messages_recorded,
            snapshot.channels_skipped
        );
        Ok(Arc::new(matrix))
    }

    /// Fold one channel into `tally`; returns the number of recorded messages.
    async fn scan_channel(
        &self,
        channel: &TextChannel,
        source: &dyn HistorySource,
        scorer: &dyn SentimentScorer,
        max_chars: usize,
        tally: &mut InteractionMatrix,
    ) -> RelmapResult<u64> {
        let resolver = TargetResolver::new(&self.tracked, source);
        let mut cursor = SpeakerCursor::new();
        let mut recorded = 0;
        let mut history = source.history(channel.id, self.since);

        while let Some(item) = history.next().await {
            let message = item.map_err(|e| RelmapError::ChannelScan {
                channel: channel.name.clone(),
                message: e.to_string(),
            })?;
            self.progress.messages_seen.fetch_add(1, Ordering::Relaxed);

            let author = message.author.id;
            if !tally.contains(author) {
                continue;
            }
            let previous = cursor.advance(author);

            let targets = match resolver.resolve(&message, previous).await {
                Ok(targets) => targets,
                Err(e) if e.is_recoverable() => {
                    warn!("Skipping message {}: {}", message.id, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            if targets.is_empty() {
                continue;
            }

            let score = score_message(scorer, &message.content, max_chars).await;
            for target in targets {
                tally.record(author, target, score);
            }
            recorded += 1;
        }
        Ok(recorded)
    }
}

/// Sentiment of one message; scoring problems count as neutral.
async fn score_message(scorer: &dyn SentimentScorer, content: &str, max_chars: usize) -> f64 {
    let text = truncate_for_scoring(content.trim(), max_chars);
    if text.is_empty() {
        return 0.0;
    }
    match scorer.score(text).await {
        Ok(score) if score.is_finite() => score.clamp(-1.0, 1.0),
        Ok(score) => {
            warn!("Scorer returned {}; counting message as neutral", score);
            0.0
        }
        Err(e) => {
            warn!("{}; counting message as neutral", RelmapError::Scoring(e.to_string()));
            0.0
        }
    }
}
