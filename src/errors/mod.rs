use std::sync::Arc;
use thiserror::Error;

/// Typed error hierarchy for relmap.
///
/// Use at module boundaries (scans, scoring, rendering, request validation).
/// Internal/leaf functions can continue using `anyhow::Result`; the `Internal` variant
/// allows seamless conversion via the `?` operator.
#[derive(Debug, Error)]
pub enum RelmapError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Channel scan failed: {channel}: {message}")]
    ChannelScan { channel: String, message: String },

    #[error("Sentiment scoring failed: {0}")]
    Scoring(String),

    #[error("Failed to fetch replied-to message {message_id} in channel {channel_id}: {message}")]
    ReplyFetch {
        channel_id: u64,
        message_id: u64,
        message: String,
    },

    #[error("Unknown color scale '{name}' (supported: {supported})")]
    UnknownColorScale { name: String, supported: String },

    #[error("Unknown metric '{name}' (supported: {supported})")]
    UnknownMetric { name: String, supported: String },

    #[error("Nothing to render: the group has no tracked members")]
    EmptyMatrix,

    #[error("Lookback of {days} days is out of range (1..={max})")]
    InvalidLookback { days: u32, max: u32 },

    #[error("Render error: {0}")]
    Render(String),

    #[error(transparent)]
    Shared(Arc<RelmapError>),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Convenience alias for results using `RelmapError`.
pub type RelmapResult<T> = std::result::Result<T, RelmapError>;

impl RelmapError {
    /// Whether the engine recovers from this error locally (skip a channel,
    /// score as neutral, skip a message) instead of surfacing it.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ChannelScan { .. } | Self::Scoring(_) | Self::ReplyFetch { .. } => true,
            Self::Shared(inner) => inner.is_recoverable(),
            Self::Config(_)
            | Self::UnknownColorScale { .. }
            | Self::UnknownMetric { .. }
            | Self::EmptyMatrix
            | Self::InvalidLookback { .. }
            | Self::Render(_)
            | Self::Internal(_) => false,
        }
    }

    /// Whether the caller sent a request that can never succeed as written.
    pub fn is_validation(&self) -> bool {
        match self {
            Self::UnknownColorScale { .. }
            | Self::UnknownMetric { .. }
            | Self::EmptyMatrix
            | Self::InvalidLookback { .. } => true,
            Self::Shared(inner) => inner.is_validation(),
            _ => false,
        }
    }

    /// Recover the concrete error handed out by a single-flight cache.
    ///
    /// The cache keeps its own clone of the `Arc`, so the value is rebuilt
    /// from a borrow. Only `Internal` cannot be copied and stays wrapped.
    pub fn from_shared(err: Arc<RelmapError>) -> Self {
        match &*err {
            Self::Config(msg) => Self::Config(msg.clone()),
            Self::ChannelScan { channel, message } => Self::ChannelScan {
                channel: channel.clone(),
                message: message.clone(),
            },
            Self::Scoring(msg) => Self::Scoring(msg.clone()),
            Self::ReplyFetch {
                channel_id,
                message_id,
                message,
            } => Self::ReplyFetch {
                channel_id: *channel_id,
                message_id: *message_id,
                message: message.clone(),
            },
            Self::UnknownColorScale { name, supported } => Self::UnknownColorScale {
                name: name.clone(),
                supported: supported.clone(),
            },
            Self::UnknownMetric { name, supported } => Self::UnknownMetric {
                name: name.clone(),
                supported: supported.clone(),
            },
            Self::EmptyMatrix => Self::EmptyMatrix,
            Self::InvalidLookback { days, max } => Self::InvalidLookback {
                days: *days,
                max: *max,
            },
            Self::Render(msg) => Self::Render(msg.clone()),
            Self::Shared(inner) => Self::from_shared(Arc::clone(inner)),
            Self::Internal(_) => Self::Shared(Arc::clone(&err)),
        }
    }
}
