use super::{ColorScale, GraphLayout, Renderer, drawable_range, normalize};
use crate::config::RenderConfig;
use crate::relations::graph::InteractionGraph;
use crate::relations::metric::MetricGrid;
use anyhow::{Result, anyhow};
use plotters::prelude::*;
use plotters::style::FontTransform;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::debug;

const FONT: &str = "sans-serif";
const MARGIN: i32 = 20;
const TITLE_HEIGHT: i32 = 40;
const LABEL_AREA: i32 = 90;
const COLORBAR_WIDTH: i32 = 24;
const COLORBAR_GAP: i32 = 30;
const COLORBAR_STEPS: i32 = 64;
const NODE_MIN_RADIUS: f64 = 8.0;
const NODE_MAX_RADIUS: f64 = 28.0;
const ARROW_SIZE: f64 = 10.0;

/// SVG renderer built on `plotters`.
pub struct PlotRenderer {
    width: u32,
    height: u32,
}

impl PlotRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
        }
    }
}

fn draw_err(e: impl Display) -> anyhow::Error {
    anyhow!("drawing failed: {e}")
}

fn rgb(c: [u8; 3]) -> RGBColor {
    RGBColor(c[0], c[1], c[2])
}

fn format_value(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e9 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

impl Renderer for PlotRenderer {
    fn render_matrix(
        &self,
        grid: &MetricGrid,
        color_scale: ColorScale,
        path: &Path,
    ) -> Result<PathBuf> {
        let n = grid.labels.len() as i32;
        if n == 0 {
            return Err(anyhow!("cannot render an empty grid"));
        }
        let root = SVGBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        let title = format!("{} ({})", grid.metric, color_scale);
        root.draw(&Text::new(
            title,
            (self.width as i32 / 2, MARGIN),
            (FONT, 22)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Top)),
        ))
        .map_err(draw_err)?;

        let left = MARGIN + LABEL_AREA;
        let top = MARGIN + TITLE_HEIGHT + LABEL_AREA;
        let avail_w = self.width as i32 - left - MARGIN - COLORBAR_GAP - COLORBAR_WIDTH - 60;
        let avail_h = self.height as i32 - top - MARGIN;
        let cell = (avail_w.min(avail_h) / n).max(1);
        let range = drawable_range(grid.range);

        for (row, values) in grid.values.iter().enumerate() {
            for (col, &value) in values.iter().enumerate() {
                let x0 = left + col as i32 * cell;
                let y0 = top + row as i32 * cell;
                let fill = rgb(color_scale.color_at(normalize(value, range)));
                root.draw(&Rectangle::new(
                    [(x0, y0), (x0 + cell, y0 + cell)],
                    fill.filled(),
                ))
                .map_err(draw_err)?;
            }
        }

        let label_style = (FONT, 13).into_font().color(&BLACK);
        for (i, label) in grid.labels.iter().enumerate() {
            let mid = i as i32 * cell + cell / 2;
            // authors down the left edge, targets across the top
            root.draw(&Text::new(
                label.clone(),
                (left - 6, top + mid),
                label_style.clone().pos(Pos::new(HPos::Right, VPos::Center)),
            ))
            .map_err(draw_err)?;
            root.draw(&Text::new(
                label.clone(),
                (left + mid, top - 6),
                (FONT, 13)
                    .into_font()
                    .transform(FontTransform::Rotate270)
                    .color(&BLACK)
                    .pos(Pos::new(HPos::Left, VPos::Center)),
            ))
            .map_err(draw_err)?;
        }

        let bar_x = left + n * cell + COLORBAR_GAP;
        let bar_h = n * cell;
        let step_h = (bar_h as f64 / COLORBAR_STEPS as f64).max(1.0);
        for step in 0..COLORBAR_STEPS {
            let t = 1.0 - step as f64 / (COLORBAR_STEPS - 1) as f64;
            let y0 = top + (step as f64 * step_h) as i32;
            let y1 = top + ((step + 1) as f64 * step_h).ceil() as i32;
            root.draw(&Rectangle::new(
                [(bar_x, y0), (bar_x + COLORBAR_WIDTH, y1.min(top + bar_h))],
                rgb(color_scale.color_at(t)).filled(),
            ))
            .map_err(draw_err)?;
        }
        let tick_style = (FONT, 12)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Left, VPos::Center));
        root.draw(&Text::new(
            format_value(range.1),
            (bar_x + COLORBAR_WIDTH + 6, top),
            tick_style.clone(),
        ))
        .map_err(draw_err)?;
        root.draw(&Text::new(
            format_value(range.0),
            (bar_x + COLORBAR_WIDTH + 6, top + bar_h),
            tick_style,
        ))
        .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
        debug!("Rendered {}x{} {} matrix to {}", n, n, grid.metric, path.display());
        Ok(path.to_path_buf())
    }

    fn render_graph(
        &self,
        graph: &InteractionGraph,
        layout: GraphLayout,
        path: &Path,
    ) -> Result<PathBuf> {
        let root = SVGBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;

        root.draw(&Text::new(
            format!("interactions (min {} messages)", graph.min_count),
            (self.width as i32 / 2, MARGIN),
            (FONT, 22)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Top)),
        ))
        .map_err(draw_err)?;

        let center = (self.width as f64 / 2.0, (self.height as f64 + TITLE_HEIGHT as f64) / 2.0);
        let radius = (self.width.min(self.height) as f64 / 2.0)
            - NODE_MAX_RADIUS
            - LABEL_AREA as f64 / 2.0;
        let positions = layout.positions(graph.nodes.len(), center, radius.max(10.0));
        let max_weight = graph.max_weight().max(1) as f64;
        let node_radius: Vec<f64> = graph
            .nodes
            .iter()
            .map(|node| {
                NODE_MIN_RADIUS
                    + (NODE_MAX_RADIUS - NODE_MIN_RADIUS) * (node.weight as f64 / max_weight).sqrt()
            })
            .collect();

        for edge in &graph.edges {
            let (from, to) = (positions[edge.from], positions[edge.to]);
            let (dx, dy) = (to.0 - from.0, to.1 - from.1);
            let len = (dx * dx + dy * dy).sqrt().max(1.0);
            let (ux, uy) = (dx / len, dy / len);
            // offset sideways so A->B and B->A stay distinguishable
            let (ox, oy) = (-uy * 4.0, ux * 4.0);
            let start = (
                from.0 + ux * node_radius[edge.from] + ox,
                from.1 + uy * node_radius[edge.from] + oy,
            );
            let tip = (
                to.0 - ux * node_radius[edge.to] + ox,
                to.1 - uy * node_radius[edge.to] + oy,
            );
            let color = rgb(ColorScale::RdYlGn.color_at((edge.color + 1.0) / 2.0));
            let stroke = (1.0 + edge.width * 1.5).round() as u32;

            root.draw(&PathElement::new(
                vec![
                    (start.0 as i32, start.1 as i32),
                    (tip.0 as i32, tip.1 as i32),
                ],
                color.mix(0.85).stroke_width(stroke),
            ))
            .map_err(draw_err)?;

            let back = (tip.0 - ux * ARROW_SIZE, tip.1 - uy * ARROW_SIZE);
            let head = vec![
                (tip.0 as i32, tip.1 as i32),
                (
                    (back.0 - uy * ARROW_SIZE / 2.0) as i32,
                    (back.1 + ux * ARROW_SIZE / 2.0) as i32,
                ),
                (
                    (back.0 + uy * ARROW_SIZE / 2.0) as i32,
                    (back.1 - ux * ARROW_SIZE / 2.0) as i32,
                ),
            ];
            root.draw(&Polygon::new(head, color.filled()))
                .map_err(draw_err)?;
        }

        for (i, node) in graph.nodes.iter().enumerate() {
            let (x, y) = positions[i];
            root.draw(&Circle::new(
                (x as i32, y as i32),
                node_radius[i] as i32,
                RGBColor(70, 130, 180).filled(),
            ))
            .map_err(draw_err)?;
            root.draw(&Text::new(
                node.member.display_name.clone(),
                (x as i32, (y + node_radius[i]) as i32 + 4),
                (FONT, 13)
                    .into_font()
                    .color(&BLACK)
                    .pos(Pos::new(HPos::Center, VPos::Top)),
            ))
            .map_err(draw_err)?;
        }

        root.present().map_err(draw_err)?;
        debug!(
            "Rendered graph with {} nodes and {} edges to {}",
            graph.nodes.len(),
            graph.edges.len(),
            path.display()
        );
        Ok(path.to_path_buf())
    }
}
