//! Figure composition: the pseudocolor concentration map, the missing-data
//! hatching and legend, the colorbar, and the biomass annotation block,
//! written out as a single PNG.

use crate::biomass::BiomassEstimate;
use crate::grid::{Grid, MaskedField};

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::FontStyle;

use std::fmt;
use std::path::Path;

pub mod colormap;
pub use colormap::LogNorm;

const FIG_WIDTH: u32 = 760;
const FIG_HEIGHT: u32 = 860;
const HEADER_HEIGHT: u32 = 70;
const FOOTER_HEIGHT: u32 = 230;
const COLORBAR_WIDTH: u32 = 150;
const COLORBAR_TICKS: usize = 6;

#[derive(Debug)]
pub enum RenderError {
    /// No strictly positive unmasked value exists, so a log color scale is
    /// undefined.
    DegenerateScale { unmasked: usize },
    Draw(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::DegenerateScale { unmasked } => write!(
                f,
                "Cannot build a log color scale: no strictly positive unmasked values \
                 ({} unmasked cells)",
                unmasked
            ),
            RenderError::Draw(msg) => write!(f, "Figure drawing failed: {}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

fn draw_failed(e: impl fmt::Display) -> RenderError {
    RenderError::Draw(e.to_string())
}

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Draws the complete figure and writes it to `output`. The color scale is
/// validated before any drawing so a degenerate field never produces a
/// partial file.
pub fn render_figure(
    grid: &Grid,
    field: &MaskedField,
    estimate: &BiomassEstimate,
    mld_m: f64,
    output: &Path,
) -> Result<(), RenderError> {
    let norm = LogNorm::from_field(field).ok_or(RenderError::DegenerateScale {
        unmasked: field.unmasked_count(),
    })?;

    let root = BitMapBackend::new(output, (FIG_WIDTH, FIG_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_failed)?;

    let (header, rest) = root.split_vertically(HEADER_HEIGHT);
    let body_height = rest.dim_in_pixel().1 - FOOTER_HEIGHT;
    let (body, footer) = rest.split_vertically(body_height);
    let map_width = body.dim_in_pixel().0 - COLORBAR_WIDTH;
    let (map_area, colorbar_area) = body.split_horizontally(map_width);

    draw_title(&header)?;
    draw_map(&map_area, grid, field, &norm)?;
    draw_colorbar(&colorbar_area, &norm)?;
    annotate(&footer, estimate, mld_m)?;

    root.present().map_err(draw_failed)?;

    Ok(())
}

fn draw_title(area: &Area<'_>) -> Result<(), RenderError> {
    let (w, _) = area.dim_in_pixel();
    let center = Pos::new(HPos::Center, VPos::Center);

    let title = ("sans-serif", 22)
        .into_font()
        .style(FontStyle::Bold)
        .color(&BLACK)
        .pos(center);
    area.draw(&Text::new(
        "Chlorophyll-a concentration in sea water",
        (w as i32 / 2, 26),
        title,
    ))
    .map_err(draw_failed)?;

    let subtitle = ("sans-serif", 16)
        .into_font()
        .style(FontStyle::Bold)
        .color(&BLACK)
        .pos(center);
    area.draw(&Text::new(
        "- Copernicus Marine - SIOS OceanColor -",
        (w as i32 / 2, 52),
        subtitle,
    ))
    .map_err(draw_failed)?;

    Ok(())
}

fn draw_map(
    area: &Area<'_>,
    grid: &Grid,
    field: &MaskedField,
    norm: &LogNorm,
) -> Result<(), RenderError> {
    let lon_edges = grid.lon_edges();
    let lat_edges = grid.lat_edges();

    let (x_lo, x_hi) = axis_span(&lon_edges);
    let (y_lo, y_hi) = axis_span(&lat_edges);

    let mut chart = ChartBuilder::on(area)
        .margin(8)
        .x_label_area_size(42)
        .y_label_area_size(56)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(draw_failed)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("degree East")
        .y_desc("degree North")
        .label_style(("sans-serif", 14).into_font())
        .draw()
        .map_err(draw_failed)?;

    // One filled rectangle per valid cell; masked cells get the diagonal
    // hatch texture instead of a fill.
    let mut cells = Vec::new();
    let mut hatches = Vec::new();
    for row in 0..field.height() {
        let (y0, y1) = ordered(lat_edges[row], lat_edges[row + 1]);
        for col in 0..field.width() {
            let (x0, x1) = ordered(lon_edges[col], lon_edges[col + 1]);
            if field.is_masked(row, col) {
                hatches.extend(hatch_segments(x0, y0, x1, y1));
            } else {
                let color = colormap::summer_reversed(norm.apply(field.value(row, col)));
                cells.push(Rectangle::new([(x0, y0), (x1, y1)], color.filled()));
            }
        }
    }

    chart.draw_series(cells).map_err(draw_failed)?;

    // The legend entry is attached to the hatch series and drawn regardless
    // of whether any cell is actually missing.
    chart
        .draw_series(hatches)
        .map_err(draw_failed)?
        .label("Missing data")
        .legend(|(x, y)| PathElement::new(vec![(x, y + 5), (x + 12, y - 5)], BLACK));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(draw_failed)?;

    Ok(())
}

fn axis_span(edges: &[f64]) -> (f64, f64) {
    let first = *edges.first().unwrap_or(&0.0);
    let last = *edges.last().unwrap_or(&1.0);
    ordered(first, last)
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

// Three parallel diagonals per cell, bottom-left to top-right, mimicking a
// '///' hatch at cell granularity.
fn hatch_segments(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<PathElement<(f64, f64)>> {
    let xm = (x0 + x1) / 2.0;
    let ym = (y0 + y1) / 2.0;

    vec![
        PathElement::new(vec![(x0, ym), (xm, y1)], BLACK),
        PathElement::new(vec![(x0, y0), (x1, y1)], BLACK),
        PathElement::new(vec![(xm, y0), (x1, ym)], BLACK),
    ]
}

fn draw_colorbar(area: &Area<'_>, norm: &LogNorm) -> Result<(), RenderError> {
    let (_, h) = area.dim_in_pixel();
    let (bar_x0, bar_x1) = (16i32, 40i32);
    let (bar_y0, bar_y1) = (30i32, h as i32 - 28);

    area.draw(&Text::new(
        "mg/m³",
        (bar_x0 - 2, 8),
        ("sans-serif", 14).into_font(),
    ))
    .map_err(draw_failed)?;

    for py in bar_y0..bar_y1 {
        let frac = 1.0 - (py - bar_y0) as f64 / (bar_y1 - bar_y0 - 1).max(1) as f64;
        let color = colormap::summer_reversed(frac);
        area.draw(&PathElement::new(vec![(bar_x0, py), (bar_x1, py)], color))
            .map_err(draw_failed)?;
    }

    area.draw(&Rectangle::new([(bar_x0, bar_y0), (bar_x1, bar_y1)], BLACK))
        .map_err(draw_failed)?;

    // Uniform tick spacing along the bar; labels carry the log-interpolated
    // data values at one decimal place.
    for (frac, value) in colormap::colorbar_ticks(norm, COLORBAR_TICKS) {
        let py = bar_y1 - (frac * (bar_y1 - bar_y0) as f64).round() as i32;
        area.draw(&PathElement::new(
            vec![(bar_x1, py), (bar_x1 + 5, py)],
            BLACK,
        ))
        .map_err(draw_failed)?;
        area.draw(&Text::new(
            format!("{:.1}", value),
            (bar_x1 + 8, py - 7),
            ("sans-serif", 13).into_font(),
        ))
        .map_err(draw_failed)?;
    }

    Ok(())
}

/// Writes the biomass caption and the framed summary box below the map.
fn annotate(area: &Area<'_>, estimate: &BiomassEstimate, mld_m: f64) -> Result<(), RenderError> {
    let (w, _) = area.dim_in_pixel();
    let center = Pos::new(HPos::Center, VPos::Center);

    let caption = format!(
        "Estimated phytoplankton biomass from CHL-a (MLD = {} m)",
        mld_m
    );
    let caption_style = ("sans-serif", 15)
        .into_font()
        .style(FontStyle::Bold)
        .color(&BLACK)
        .pos(center);
    area.draw(&Text::new(caption, (w as i32 / 2, 16), caption_style))
        .map_err(draw_failed)?;

    let text = estimate.text_block();
    let line_style = ("sans-serif", 14).into_font().color(&BLACK);
    let line_height = 20i32;
    let padding = 10i32;

    let mut text_width = 0i32;
    for line in text.lines() {
        let (lw, _) = area
            .estimate_text_size(line, &line_style)
            .map_err(draw_failed)?;
        text_width = text_width.max(lw as i32);
    }
    let line_count = text.lines().count() as i32;

    let box_w = text_width + 2 * padding;
    let box_h = line_count * line_height + 2 * padding;
    let x0 = (w as i32 - box_w) / 2;
    let y0 = 34i32;

    area.draw(&Rectangle::new(
        [(x0, y0), (x0 + box_w, y0 + box_h)],
        WHITE.mix(0.85).filled(),
    ))
    .map_err(draw_failed)?;
    area.draw(&Rectangle::new([(x0, y0), (x0 + box_w, y0 + box_h)], BLACK))
        .map_err(draw_failed)?;

    for (i, line) in text.lines().enumerate() {
        area.draw(&Text::new(
            line.to_string(),
            (x0 + padding, y0 + padding + i as i32 * line_height),
            line_style.clone(),
        ))
        .map_err(draw_failed)?;
    }

    Ok(())
}
