use crate::errors::{RelmapError, RelmapResult};
use crate::relations::map::Scope;
use crate::relations::metric::Metric;
use crate::render::ColorScale;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Distinct renderings one map can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    Matrix {
        metric: Metric,
        color_scale: ColorScale,
    },
    Graph {
        min_count: u64,
    },
}

impl ArtifactKey {
    pub fn slug(&self) -> String {
        match self {
            ArtifactKey::Matrix {
                metric,
                color_scale,
            } => format!("matrix-{metric}-{color_scale}"),
            ArtifactKey::Graph { min_count } => format!("graph-min{min_count}"),
        }
    }

    /// Output file for this key, unique per scope and map creation time.
    pub fn path_in(&self, dir: &Path, scope: &Scope, created_at: DateTime<Utc>) -> PathBuf {
        let channel = scope
            .channel
            .map_or_else(|| "all".to_string(), |id| format!("c{id}"));
        dir.join(format!(
            "{}-{}d-{}-{}-{}.svg",
            scope.group,
            scope.lookback_days,
            channel,
            created_at.format("%Y%m%dT%H%M%S%3f"),
            self.slug()
        ))
    }
}

/// Memoized renderings of one map.
///
/// Concurrent requests for the same key share one build; a failed build is
/// not remembered. The cache is unbounded: a built key stays for the life of
/// the map.
#[derive(Debug)]
pub struct ArtifactCache {
    built: Cache<ArtifactKey, PathBuf>,
}

impl Default for ArtifactCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactCache {
    pub fn new() -> Self {
        Self {
            built: Cache::builder().build(),
        }
    }

    pub async fn get_or_build<F>(&self, key: ArtifactKey, build: F) -> RelmapResult<PathBuf>
    where
        F: Future<Output = RelmapResult<PathBuf>>,
    {
        self.built
            .try_get_with(key, build)
            .await
            .map_err(RelmapError::from_shared)
    }

    pub async fn len(&self) -> u64 {
        self.built.run_pending_tasks().await;
        self.built.entry_count()
    }
}
