use crate::config::{Config, MAX_LOOKBACK_DAYS};
use crate::errors::{RelmapError, RelmapResult};
use crate::history::{ChannelId, Group, HistorySource, MemberId};
use crate::relations::artifacts::ArtifactKey;
use crate::relations::graph::InteractionGraph;
use crate::relations::map::{MessageMap, Scope};
use crate::relations::matrix::InteractionMatrix;
use crate::relations::metric::{Metric, MetricGrid};
use crate::relations::progress::{ProgressCallback, with_progress};
use crate::relations::registry::MapRegistry;
use crate::render::{ColorScale, GraphLayout, Renderer};
use crate::sentiment::SentimentScorer;
use crate::utils::ensure_dir;
use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Which slice of history a request is about.
#[derive(Debug, Clone)]
pub struct ScopeRequest {
    pub group: Group,
    /// Falls back to the configured lookback.
    pub lookback_days: Option<u32>,
    pub channel: Option<ChannelId>,
}

impl ScopeRequest {
    pub fn new(group: Group) -> Self {
        Self {
            group,
            lookback_days: None,
            channel: None,
        }
    }

    pub fn with_lookback(mut self, days: u32) -> Self {
        self.lookback_days = Some(days);
        self
    }

    pub fn in_channel(mut self, channel: ChannelId) -> Self {
        self.channel = Some(channel);
        self
    }
}

/// Entry point for map, matrix and graph requests.
pub struct RelationService {
    source: Arc<dyn HistorySource>,
    scorer: Arc<dyn SentimentScorer>,
    renderer: Arc<dyn Renderer>,
    registry: MapRegistry,
    lookback_days: u32,
    min_edge_count: u64,
    max_chars: usize,
    progress_interval: Duration,
    output_dir: PathBuf,
    default_color_scale: ColorScale,
}

impl RelationService {
    pub fn new(
        source: Arc<dyn HistorySource>,
        scorer: Arc<dyn SentimentScorer>,
        renderer: Arc<dyn Renderer>,
        config: &Config,
        bot: Option<MemberId>,
    ) -> RelmapResult<Self> {
        let default_color_scale = config
            .render
            .default_color_scale
            .parse()
            .map_err(|e| RelmapError::Config(format!("render.defaultColorScale: {e}")))?;
        Ok(Self {
            source,
            scorer,
            renderer,
            registry: MapRegistry::new(config.mapping.stale_after(), bot),
            lookback_days: config.mapping.lookback_days,
            min_edge_count: config.mapping.min_edge_count,
            max_chars: config.sentiment.max_chars,
            progress_interval: Duration::from_secs(config.mapping.progress_interval_secs),
            output_dir: config.mapping.output_path(),
            default_color_scale,
        })
    }

    /// Resolve the request's scope, rejecting a lookback outside `1..=MAX_LOOKBACK_DAYS`.
    pub fn scope_for(&self, request: &ScopeRequest) -> RelmapResult<Scope> {
        let lookback_days = request.lookback_days.unwrap_or(self.lookback_days);
        if !(1..=MAX_LOOKBACK_DAYS).contains(&lookback_days) {
            return Err(RelmapError::InvalidLookback {
                days: lookback_days,
                max: MAX_LOOKBACK_DAYS,
            });
        }
        Ok(Scope {
            group: request.group.id,
            lookback_days,
            channel: request.channel,
        })
    }

    pub fn registry(&self) -> &MapRegistry {
        &self.registry
    }

    /// Build (or join) the scan for the request's scope.
    ///
    /// `force_refresh` discards any existing map for the scope first.
    pub async fn build_map(
        &self,
        request: &ScopeRequest,
        force_refresh: bool,
        progress: Option<ProgressCallback>,
    ) -> RelmapResult<Arc<MessageMap>> {
        let (map, _) = self.scan(request, force_refresh, progress).await?;
        Ok(map)
    }

    /// Heatmap of `metric` for the request's scope; returns the image path.
    pub async fn matrix(
        &self,
        request: &ScopeRequest,
        metric: &str,
        color_scale: Option<&str>,
        progress: Option<ProgressCallback>,
    ) -> RelmapResult<PathBuf> {
        let metric: Metric = metric.parse()?;
        let color_scale = match color_scale {
            Some(name) => name.parse()?,
            None => self.default_color_scale,
        };
        self.scope_for(request)?;
        self.ensure_members(request)?;

        let (map, matrix) = self.scan(request, false, progress).await?;
        let key = ArtifactKey::Matrix {
            metric,
            color_scale,
        };
        let path = key.path_in(&self.output_dir, map.scope(), map.created_at());
        let renderer = self.renderer.clone();
        let output_dir = self.output_dir.clone();

        map.artifacts()
            .get_or_build(key, async move {
                let grid = MetricGrid::from_matrix(&matrix, metric)?;
                ensure_dir(&output_dir)?;
                render_blocking(move || renderer.render_matrix(&grid, color_scale, &path)).await
            })
            .await
    }

    /// Interaction graph for the request's scope; returns the image path.
    pub async fn graph(
        &self,
        request: &ScopeRequest,
        min_count: Option<u64>,
        progress: Option<ProgressCallback>,
    ) -> RelmapResult<PathBuf> {
        let min_count = min_count.unwrap_or(self.min_edge_count);
        self.scope_for(request)?;
        self.ensure_members(request)?;

        let (map, matrix) = self.scan(request, false, progress).await?;
        let key = ArtifactKey::Graph { min_count };
        let path = key.path_in(&self.output_dir, map.scope(), map.created_at());
        let renderer = self.renderer.clone();
        let output_dir = self.output_dir.clone();

        map.artifacts()
            .get_or_build(key, async move {
                let graph = InteractionGraph::from_matrix(&matrix, min_count)?;
                ensure_dir(&output_dir)?;
                render_blocking(move || renderer.render_graph(&graph, GraphLayout::Circular, &path))
                    .await
            })
            .await
    }

    /// Forget the map for `scope`; the next request rescans.
    pub fn invalidate(&self, scope: &Scope) -> bool {
        let removed = self.registry.invalidate(scope);
        if removed {
            info!("Invalidated map for group {}", scope.group);
        }
        removed
    }

    async fn scan(
        &self,
        request: &ScopeRequest,
        force_refresh: bool,
        progress: Option<ProgressCallback>,
    ) -> RelmapResult<(Arc<MessageMap>, Arc<InteractionMatrix>)> {
        let scope = self.scope_for(request)?;
        let map = self
            .registry
            .get_or_create(scope, &request.group, force_refresh, Utc::now());
        let served = map.record_request();
        debug!("Request #{} for group {}", served, scope.group);

        let matrix = with_progress(
            map.build(self.source.as_ref(), self.scorer.as_ref(), self.max_chars),
            self.progress_interval,
            map.progress(),
            progress,
        )
        .await?;
        Ok((map, matrix))
    }

    fn ensure_members(&self, request: &ScopeRequest) -> RelmapResult<()> {
        let bot = self.registry.bot();
        if request.group.members.iter().any(|m| Some(m.id) != bot) {
            Ok(())
        } else {
            Err(RelmapError::EmptyMatrix)
        }
    }
}

async fn render_blocking<F>(render: F) -> RelmapResult<PathBuf>
where
    F: FnOnce() -> anyhow::Result<PathBuf> + Send + 'static,
{
    tokio::task::spawn_blocking(render)
        .await
        .map_err(|e| RelmapError::Render(format!("render task failed: {e}")))?
        .map_err(|e| RelmapError::Render(format!("{e:#}")))
}
