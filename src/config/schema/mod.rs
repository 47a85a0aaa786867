use crate::errors::RelmapError;
use crate::render::ColorScale;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Generates a `Debug` impl that redacts secret fields.
///
/// Field specifiers:
/// - `field_name`            : printed normally via `&self.field_name`
/// - `redact(field_name)`    : `String` field: shows `[empty]` or `[REDACTED]`
macro_rules! redact_debug {
    (@field $builder:ident, $self:ident, redact($field:ident)) => {
        $builder.field(
            stringify!($field),
            &if $self.$field.is_empty() {
                "[empty]"
            } else {
                "[REDACTED]"
            },
        );
    };
    (@field $builder:ident, $self:ident, $field:ident) => {
        $builder.field(stringify!($field), &$self.$field);
    };

    (@fields $builder:ident, $self:ident,) => {};
    (@fields $builder:ident, $self:ident, redact($field:ident), $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, redact($field));
        redact_debug!(@fields $builder, $self, $($rest)*);
    };
    (@fields $builder:ident, $self:ident, $field:ident, $($rest:tt)*) => {
        redact_debug!(@field $builder, $self, $field);
        redact_debug!(@fields $builder, $self, $($rest)*);
    };

    ($struct_name:ident, $($fields:tt)*) => {
        impl std::fmt::Debug for $struct_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let mut builder = f.debug_struct(stringify!($struct_name));
                redact_debug!(@fields builder, self, $($fields)*);
                builder.finish()
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Discord
// ---------------------------------------------------------------------------

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct DiscordConfig {
    #[serde(default)]
    pub token: String,
    /// Guild whose history is mapped. 0 = not configured.
    #[serde(default, rename = "guildId")]
    pub guild_id: u64,
}

redact_debug!(DiscordConfig, redact(token), guild_id,);

// ---------------------------------------------------------------------------
// Sentiment
// ---------------------------------------------------------------------------

fn default_sentiment_api_url() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}

fn default_sentiment_model() -> String {
    "cardiffnlp/twitter-xlm-roberta-base-sentiment".to_string()
}

fn default_sentiment_timeout() -> u64 {
    30
}

fn default_max_chars() -> usize {
    1000
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    #[serde(default = "default_sentiment_api_url", rename = "apiUrl")]
    pub api_url: String,
    #[serde(default = "default_sentiment_model")]
    pub model: String,
    #[serde(default, rename = "apiKey")]
    pub api_key: String,
    #[serde(default = "default_sentiment_timeout", rename = "timeoutSecs")]
    pub timeout_secs: u64,
    /// Message text is cut to this many characters before scoring.
    #[serde(default = "default_max_chars", rename = "maxChars")]
    pub max_chars: usize,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            api_url: default_sentiment_api_url(),
            model: default_sentiment_model(),
            api_key: String::new(),
            timeout_secs: default_sentiment_timeout(),
            max_chars: default_max_chars(),
        }
    }
}

redact_debug!(
    SentimentConfig,
    api_url,
    model,
    redact(api_key),
    timeout_secs,
    max_chars,
);

// ---------------------------------------------------------------------------
// Mapping
// ---------------------------------------------------------------------------

/// Longest history window a map may cover.
pub const MAX_LOOKBACK_DAYS: u32 = 3650;

fn default_lookback_days() -> u32 {
    30
}

fn default_stale_after_days() -> u32 {
    7
}

fn default_min_edge_count() -> u64 {
    10
}

fn default_progress_interval() -> u64 {
    30
}

fn default_output_dir() -> String {
    "~/.relmap/maps".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingConfig {
    #[serde(default = "default_lookback_days", rename = "lookbackDays")]
    pub lookback_days: u32,
    /// Maps older than this are rebuilt on the next request. 0 = never.
    #[serde(default = "default_stale_after_days", rename = "staleAfterDays")]
    pub stale_after_days: u32,
    /// Edges below this message count are left out of graphs.
    #[serde(default = "default_min_edge_count", rename = "minEdgeCount")]
    pub min_edge_count: u64,
    #[serde(default = "default_progress_interval", rename = "progressIntervalSecs")]
    pub progress_interval_secs: u64,
    #[serde(default = "default_output_dir", rename = "outputDir")]
    pub output_dir: String,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            stale_after_days: default_stale_after_days(),
            min_edge_count: default_min_edge_count(),
            progress_interval_secs: default_progress_interval(),
            output_dir: default_output_dir(),
        }
    }
}

impl MappingConfig {
    pub fn output_path(&self) -> PathBuf {
        crate::utils::expand_home(&self.output_dir)
    }

    pub fn stale_after(&self) -> Option<chrono::Duration> {
        (self.stale_after_days > 0).then(|| chrono::Duration::days(i64::from(self.stale_after_days)))
    }
}

// ---------------------------------------------------------------------------
// Render
// ---------------------------------------------------------------------------

fn default_canvas() -> u32 {
    900
}

fn default_color_scale() -> String {
    "viridis".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default = "default_canvas")]
    pub width: u32,
    #[serde(default = "default_canvas")]
    pub height: u32,
    #[serde(default = "default_color_scale", rename = "defaultColorScale")]
    pub default_color_scale: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: default_canvas(),
            height: default_canvas(),
            default_color_scale: default_color_scale(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub mapping: MappingConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

impl Config {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), RelmapError> {
        self.validate_sentiment()?;
        self.validate_mapping()?;
        self.validate_render()?;
        Ok(())
    }

    fn validate_sentiment(&self) -> Result<(), RelmapError> {
        let s = &self.sentiment;
        if s.api_url.trim().is_empty() {
            return Err(RelmapError::Config("sentiment.apiUrl must not be empty".into()));
        }
        if s.model.trim().is_empty() {
            return Err(RelmapError::Config("sentiment.model must not be empty".into()));
        }
        if s.timeout_secs == 0 {
            return Err(RelmapError::Config("sentiment.timeoutSecs must be > 0".into()));
        }
        if s.max_chars == 0 {
            return Err(RelmapError::Config("sentiment.maxChars must be > 0".into()));
        }
        Ok(())
    }

    fn validate_mapping(&self) -> Result<(), RelmapError> {
        let m = &self.mapping;
        if m.lookback_days == 0 {
            return Err(RelmapError::Config("mapping.lookbackDays must be > 0".into()));
        }
        if m.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(RelmapError::Config(format!(
                "mapping.lookbackDays is unreasonably large (> {MAX_LOOKBACK_DAYS})"
            )));
        }
        if m.lookback_days > 365 {
            warn!(
                "mapping.lookbackDays is {}; scanning this much history may take a long time",
                m.lookback_days
            );
        }
        if m.min_edge_count == 0 {
            return Err(RelmapError::Config("mapping.minEdgeCount must be > 0".into()));
        }
        if m.progress_interval_secs == 0 {
            return Err(RelmapError::Config(
                "mapping.progressIntervalSecs must be > 0".into(),
            ));
        }
        if m.output_dir.trim().is_empty() {
            return Err(RelmapError::Config("mapping.outputDir must not be empty".into()));
        }
        Ok(())
    }

    fn validate_render(&self) -> Result<(), RelmapError> {
        let r = &self.render;
        if r.width < 200 || r.height < 200 {
            return Err(RelmapError::Config(
                "render.width and render.height must be at least 200".into(),
            ));
        }
        if r.width > 8000 || r.height > 8000 {
            return Err(RelmapError::Config(
                "render.width and render.height must be at most 8000".into(),
            ));
        }
        r.default_color_scale
            .parse::<ColorScale>()
            .map_err(|e| RelmapError::Config(format!("render.defaultColorScale: {e}")))?;
        Ok(())
    }
}
