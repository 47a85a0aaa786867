use crate::errors::{RelmapError, RelmapResult};
use crate::history::{HistorySource, MemberId, Message};
use std::collections::HashSet;
use tracing::debug;

/// Tracks who spoke last and who spoke before them, one channel at a time.
///
/// The cursor only moves on an author change, so a burst of consecutive
/// messages from one author keeps pointing at the same previous speaker.
#[derive(Debug, Default, Clone)]
pub struct SpeakerCursor {
    current: Option<MemberId>,
    previous: Option<MemberId>,
}

impl SpeakerCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next tracked author and return the last speaker that is not them.
    pub fn advance(&mut self, author: MemberId) -> Option<MemberId> {
        if self.current != Some(author) {
            self.previous = self.current;
            self.current = Some(author);
        }
        self.previous
    }
}

/// Decides which tracked members a message is addressed to.
pub struct TargetResolver<'a> {
    members: &'a HashSet<MemberId>,
    source: &'a dyn HistorySource,
}

impl<'a> TargetResolver<'a> {
    pub fn new(members: &'a HashSet<MemberId>, source: &'a dyn HistorySource) -> Self {
        Self { members, source }
    }

    /// Distinct tracked targets of `message`, in discovery order.
    ///
    /// A reply targets the replied-to author; otherwise the previous speaker
    /// is assumed. Mentions are always added. The author is never a target.
    pub async fn resolve(
        &self,
        message: &Message,
        previous_speaker: Option<MemberId>,
    ) -> RelmapResult<Vec<MemberId>> {
        let author = message.author.id;
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        let mut push = |id: MemberId| {
            if id != author && self.members.contains(&id) && seen.insert(id) {
                targets.push(id);
            }
        };

        if let Some(reply) = &message.reply_ref {
            if let Some(cached) = &reply.cached_author {
                push(cached.id);
            } else if let Some(message_id) = reply.message_id {
                let fetched = self
                    .source
                    .fetch_message(reply.channel_id, message_id)
                    .await
                    .map_err(|e| RelmapError::ReplyFetch {
                        channel_id: reply.channel_id.get(),
                        message_id: message_id.get(),
                        message: e.to_string(),
                    })?;
                match fetched {
                    Some(original) => push(original.author.id),
                    None => debug!(
                        "replied-to message {} in channel {} no longer exists",
                        message_id, reply.channel_id
                    ),
                }
            }
        } else if let Some(previous) = previous_speaker {
            push(previous);
        }

        for mentioned in &message.mentions {
            push(mentioned.id);
        }

        Ok(targets)
    }
}

#[cfg(test)]
mod tests;
