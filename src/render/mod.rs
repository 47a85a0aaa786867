//! Turning metric grids and interaction graphs into images.

mod plot;

pub use plot::PlotRenderer;

use crate::errors::RelmapError;
use crate::relations::graph::InteractionGraph;
use crate::relations::metric::MetricGrid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Draws engine views to files. Implementations are CPU-bound and are
/// called from a blocking thread.
pub trait Renderer: Send + Sync {
    /// Render `grid` as a heatmap at `path`; returns the written path.
    fn render_matrix(
        &self,
        grid: &MetricGrid,
        color_scale: ColorScale,
        path: &Path,
    ) -> anyhow::Result<PathBuf>;

    fn render_graph(
        &self,
        graph: &InteractionGraph,
        layout: GraphLayout,
        path: &Path,
    ) -> anyhow::Result<PathBuf>;
}

/// Node placement for graph renderings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GraphLayout {
    /// Members evenly spaced on a circle, first member at the top.
    #[default]
    Circular,
}

impl GraphLayout {
    /// Node centers for `n` nodes around `center`.
    pub fn positions(self, n: usize, center: (f64, f64), radius: f64) -> Vec<(f64, f64)> {
        match self {
            GraphLayout::Circular => (0..n)
                .map(|i| {
                    let angle = -std::f64::consts::FRAC_PI_2
                        + std::f64::consts::TAU * i as f64 / n.max(1) as f64;
                    (
                        center.0 + radius * angle.cos(),
                        center.1 + radius * angle.sin(),
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScale {
    Viridis,
    Magma,
    Coolwarm,
    RdYlGn,
    Greys,
}

type Rgb = [u8; 3];

static COLOR_SCALES: [(ColorScale, &str, &[Rgb]); 5] = [
    (
        ColorScale::Viridis,
        "viridis",
        &[
            [68, 1, 84],
            [59, 82, 139],
            [33, 145, 140],
            [94, 201, 98],
            [253, 231, 37],
        ],
    ),
    (
        ColorScale::Magma,
        "magma",
        &[
            [0, 0, 4],
            [81, 18, 124],
            [183, 55, 121],
            [252, 137, 97],
            [252, 253, 191],
        ],
    ),
    (
        ColorScale::Coolwarm,
        "coolwarm",
        &[
            [59, 76, 192],
            [141, 176, 254],
            [221, 221, 221],
            [244, 154, 123],
            [180, 4, 38],
        ],
    ),
    (
        ColorScale::RdYlGn,
        "rdylgn",
        &[
            [165, 0, 38],
            [244, 109, 67],
            [255, 255, 191],
            [102, 189, 99],
            [0, 104, 55],
        ],
    ),
    (ColorScale::Greys, "greys", &[[255, 255, 255], [0, 0, 0]]),
];

impl ColorScale {
    pub const ALL: [ColorScale; 5] = [
        ColorScale::Viridis,
        ColorScale::Magma,
        ColorScale::Coolwarm,
        ColorScale::RdYlGn,
        ColorScale::Greys,
    ];

    fn entry(self) -> &'static (ColorScale, &'static str, &'static [Rgb]) {
        &COLOR_SCALES[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    /// Color at position `t` in `[0, 1]`, linearly interpolated between stops.
    pub fn color_at(self, t: f64) -> Rgb {
        let stops = self.entry().2;
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let scaled = t * (stops.len() - 1) as f64;
        let lower = (scaled.floor() as usize).min(stops.len() - 2);
        let frac = scaled - lower as f64;
        let (a, b) = (stops[lower], stops[lower + 1]);
        let mix = |i: usize| (a[i] as f64 + (b[i] as f64 - a[i] as f64) * frac).round() as u8;
        [mix(0), mix(1), mix(2)]
    }

    pub fn supported() -> String {
        COLOR_SCALES
            .iter()
            .map(|(_, name, _)| *name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ColorScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorScale {
    type Err = RelmapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        COLOR_SCALES
            .iter()
            .find(|(_, name, _)| *name == wanted)
            .map(|(scale, _, _)| *scale)
            .ok_or_else(|| RelmapError::UnknownColorScale {
                name: s.to_string(),
                supported: ColorScale::supported(),
            })
    }
}

/// Widen a zero-width range so values can still be placed on a color bar.
pub fn drawable_range((lo, hi): (f64, f64)) -> (f64, f64) {
    if (hi - lo).abs() < f64::EPSILON {
        (lo, lo + 1.0)
    } else {
        (lo, hi)
    }
}

/// Position of `value` inside `range`, clamped to `[0, 1]`.
pub fn normalize(value: f64, range: (f64, f64)) -> f64 {
    let (lo, hi) = drawable_range(range);
    ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
}
