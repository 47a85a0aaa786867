//! The relationship-mapping engine: who addresses whom, how often, and how
//! warmly.

pub mod artifacts;
pub mod graph;
pub mod map;
pub mod matrix;
pub mod metric;
pub mod progress;
pub mod registry;
pub mod resolver;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use artifacts::{ArtifactCache, ArtifactKey};
pub use graph::{GraphEdge, GraphNode, InteractionGraph};
pub use map::{MessageMap, Scope};
pub use matrix::{Interaction, InteractionMatrix};
pub use metric::{Metric, MetricGrid};
pub use progress::{ProgressCallback, ProgressSnapshot, ScanProgress};
pub use registry::MapRegistry;
pub use resolver::{SpeakerCursor, TargetResolver};
pub use service::{RelationService, ScopeRequest};
