use crate::errors::{RelmapError, RelmapResult};
use crate::history::Member;
use crate::relations::matrix::InteractionMatrix;
use crate::relations::metric::Metric;

#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub member: Member,
    /// Total messages this member addressed to anyone.
    pub weight: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    /// Index into `InteractionGraph::nodes`.
    pub from: usize,
    pub to: usize,
    pub count: u64,
    /// Mean sentiment, clamped to `[-1, 1]`.
    pub color: f64,
    /// `log2(max(1, count))`.
    pub width: f64,
}

/// Directed who-talks-to-whom graph, thresholded by message count.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub min_count: u64,
}

impl InteractionGraph {
    /// Keep every author→target pair with at least `min_count` messages.
    pub fn from_matrix(matrix: &InteractionMatrix, min_count: u64) -> RelmapResult<Self> {
        if matrix.is_empty() {
            return Err(RelmapError::EmptyMatrix);
        }
        let nodes = matrix
            .members()
            .iter()
            .map(|member| GraphNode {
                member: member.clone(),
                weight: matrix.outgoing_count(member.id),
            })
            .collect();

        let n = matrix.len();
        let mut edges = Vec::new();
        for from in 0..n {
            for to in 0..n {
                if from == to {
                    continue;
                }
                let cell = matrix.at(from, to);
                if cell.count < min_count {
                    continue;
                }
                edges.push(GraphEdge {
                    from,
                    to,
                    count: cell.count,
                    color: Metric::Mean.apply(&cell).clamp(-1.0, 1.0),
                    width: (cell.count.max(1) as f64).log2(),
                });
            }
        }

        Ok(Self {
            nodes,
            edges,
            min_count,
        })
    }

    pub fn max_weight(&self) -> u64 {
        self.nodes.iter().map(|n| n.weight).max().unwrap_or(0)
    }
}
