use crate::errors::{RelmapError, RelmapResult};
use crate::relations::matrix::{Interaction, InteractionMatrix};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Matrix labels longer than this are cut.
pub const LABEL_MAX_CHARS: usize = 10;

/// How an `Interaction` is turned into one plotted number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Count,
    Sum,
    Mean,
    LogCount,
    LogSum,
}

type MetricFn = fn(&Interaction) -> f64;

static METRICS: [(Metric, &str, MetricFn); 5] = [
    (Metric::Count, "count", count),
    (Metric::Sum, "sum", sum),
    (Metric::Mean, "mean", mean),
    (Metric::LogCount, "logcount", log_count),
    (Metric::LogSum, "logsum", log_sum),
];

fn count(i: &Interaction) -> f64 {
    i.count as f64
}

fn sum(i: &Interaction) -> f64 {
    i.sum
}

fn mean(i: &Interaction) -> f64 {
    if i.count == 0 {
        0.0
    } else {
        i.sum / i.count as f64
    }
}

fn log_count(i: &Interaction) -> f64 {
    if i.count == 0 {
        0.0
    } else {
        (i.count as f64 + 1.0).ln()
    }
}

fn log_sum(i: &Interaction) -> f64 {
    if i.sum == 0.0 {
        0.0
    } else if i.sum > 0.0 {
        (i.sum + 1.0).ln()
    } else {
        -(i.sum.abs() + 1.0).ln()
    }
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Count,
        Metric::Sum,
        Metric::Mean,
        Metric::LogCount,
        Metric::LogSum,
    ];

    fn entry(self) -> &'static (Metric, &'static str, MetricFn) {
        // METRICS is ordered like the enum
        &METRICS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    pub fn apply(self, interaction: &Interaction) -> f64 {
        (self.entry().2)(interaction)
    }

    /// Color-scale bounds for a set of metric values.
    ///
    /// Must be computed from the current values on every render.
    pub fn value_range(self, values: impl IntoIterator<Item = f64>) -> (f64, f64) {
        match self {
            Metric::Mean => (-1.0, 1.0),
            Metric::Count | Metric::LogCount => {
                let max = values.into_iter().fold(0.0_f64, f64::max);
                (0.0, max)
            }
            Metric::Sum | Metric::LogSum => {
                let max = values.into_iter().map(f64::abs).fold(0.0_f64, f64::max);
                (-max, max)
            }
        }
    }

    pub fn supported() -> String {
        METRICS
            .iter()
            .map(|(_, name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = RelmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        METRICS
            .iter()
            .find(|(_, name, _)| *name == wanted)
            .map(|(metric, _, _)| *metric)
            .ok_or_else(|| RelmapError::UnknownMetric {
                name: s.to_string(),
                supported: Metric::supported(),
            })
    }
}

/// A square metric matrix ready for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricGrid {
    pub metric: Metric,
    pub labels: Vec<String>,
    /// `values[row][col]`: row = author, col = target.
    pub values: Vec<Vec<f64>>,
    pub range: (f64, f64),
}

impl MetricGrid {
    /// Evaluate `metric` over every cell of `matrix`.
    pub fn from_matrix(matrix: &InteractionMatrix, metric: Metric) -> RelmapResult<Self> {
        if matrix.is_empty() {
            return Err(RelmapError::EmptyMatrix);
        }
        let n = matrix.len();
        let values: Vec<Vec<f64>> = (0..n)
            .map(|row| (0..n).map(|col| metric.apply(&matrix.at(row, col))).collect())
            .collect();
        let range = metric.value_range(values.iter().flatten().copied());
        let labels = matrix
            .members()
            .iter()
            .map(|m| truncate_label(&m.display_name))
            .collect();
        Ok(Self {
            metric,
            labels,
            values,
            range,
        })
    }
}

pub fn truncate_label(name: &str) -> String {
    name.chars().take(LABEL_MAX_CHARS).collect()
}
