use crate::aggregate::{Activity, Gender, GenderActivity, SourceSummary};
use crate::bucket::AgeGroup;
use crate::dashboard::BubbleView;
use crate::palette::parse_hex;
use crate::scale::{value_axis, ActivityScale};
use anyhow::{bail, Context, Result};
use image::ImageEncoder;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::f64::consts::PI;

pub struct ChartConfig {
    pub title: Option<String>,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        ChartConfig {
            title: None,
            width: 800,
            height: 600,
        }
    }
}

const BAR_COLOR: RGBColor = RGBColor(100, 100, 255);
const MALE_COLOR: RGBColor = RGBColor(0x88, 0x84, 0xd8);
const FEMALE_COLOR: RGBColor = RGBColor(0x82, 0xca, 0x9d);
const UNMAPPED_COLOR: RGBColor = RGBColor(0xcc, 0xcc, 0xcc);

/// Largest accepted width or height in pixels.
pub const MAX_DIMENSION: u32 = 16_384;

fn hex_color(hex: &str) -> RGBColor {
    parse_hex(hex)
        .map(|(r, g, b)| RGBColor(r, g, b))
        .unwrap_or(UNMAPPED_COLOR)
}

/// Draw into an RGB bitmap and encode it as PNG.
fn render_png<F>(config: &ChartConfig, draw: F) -> Result<Vec<u8>>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<()>,
{
    if config.width == 0 || config.height == 0 {
        bail!("Chart size {}x{} has a zero dimension", config.width, config.height);
    }
    if config.width > MAX_DIMENSION || config.height > MAX_DIMENSION {
        bail!(
            "Chart size {}x{} exceeds the {}px limit",
            config.width,
            config.height,
            MAX_DIMENSION
        );
    }
    let len = (config.width as usize)
        .checked_mul(config.height as usize)
        .and_then(|pixels| pixels.checked_mul(3))
        .context("Chart buffer size overflows")?;
    let mut buffer = vec![0u8; len];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (config.width, config.height))
            .into_drawing_area();
        root.fill(&WHITE).context("Failed to fill background")?;
        draw(&root)?;
        root.present().context("Failed to present drawing")?;
    }

    let mut png_bytes = Vec::new();
    {
        let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
        encoder
            .write_image(&buffer, config.width, config.height, image::ColorType::Rgb8)
            .context("Failed to encode PNG")?;
    }

    Ok(png_bytes)
}

/// Bar chart of row counts per source material.
pub fn render_source_bar(summary: &SourceSummary, config: &ChartConfig) -> Result<Vec<u8>> {
    if summary.is_empty() {
        bail!("No data for region '{}'", summary.region);
    }

    let caption = config
        .title
        .clone()
        .unwrap_or_else(|| format!("Anime Count by Source: {}", summary.region));
    let n = summary.labels.len() as u32;
    let values: Vec<f64> = summary.counts.iter().map(|&c| c as f64).collect();
    let y_range = value_axis(&values);

    render_png(config, |root| {
        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .caption(&caption, ("sans-serif", 20))
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d((0u32..n).into_segmented(), y_range)
            .context("Failed to build chart")?;

        let label_for = |value: &SegmentValue<u32>| match value {
            SegmentValue::CenterOf(idx) => summary.labels.get(*idx as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(summary.labels.len())
            .x_label_formatter(&label_for)
            .x_desc("Source")
            .y_desc("Count")
            .draw()
            .context("Failed to draw mesh")?;

        chart
            .draw_series(
                Histogram::vertical(&chart)
                    .style(BAR_COLOR.mix(0.6).filled())
                    .margin(10)
                    .data(values.iter().enumerate().map(|(i, v)| (i as u32, *v))),
            )
            .context("Failed to draw bars")?;

        Ok(())
    })
}

/// Radar chart of activity totals for male and female viewers.
pub fn render_gender_radar(
    summary: &GenderActivity,
    scale: &ActivityScale,
    config: &ChartConfig,
) -> Result<Vec<u8>> {
    if summary.is_empty() {
        bail!("No gender activity data");
    }

    let caption = config.title.clone().unwrap_or_else(|| "Anime by Gender".to_string());
    let series: Vec<(Gender, [f64; 4], RGBColor)> = vec![
        (Gender::Male, summary.series(Gender::Male, scale), MALE_COLOR),
        (Gender::Female, summary.series(Gender::Female, scale), FEMALE_COLOR),
    ];
    let max = series
        .iter()
        .flat_map(|(_, values, _)| values.iter().copied())
        .fold(0.0, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };

    // Axis i points up for i = 0 and proceeds clockwise
    let spoke = |i: usize, r: f64| {
        let angle = PI / 2.0 - i as f64 * 2.0 * PI / Activity::ALL.len() as f64;
        (r * angle.cos(), r * angle.sin())
    };

    render_png(config, |root| {
        let mut chart = ChartBuilder::on(root)
            .margin(20)
            .caption(&caption, ("sans-serif", 20))
            .build_cartesian_2d(-1.4f64..1.4f64, -1.3f64..1.3f64)
            .context("Failed to build chart")?;

        for ring in 1..=4 {
            let r = ring as f64 / 4.0;
            let mut outline: Vec<(f64, f64)> = (0..Activity::ALL.len()).map(|i| spoke(i, r)).collect();
            outline.push(spoke(0, r));
            chart
                .draw_series(std::iter::once(PathElement::new(outline, BLACK.mix(0.2))))
                .context("Failed to draw grid")?;
        }

        for (i, activity) in Activity::ALL.iter().enumerate() {
            chart
                .draw_series(std::iter::once(PathElement::new(vec![(0.0, 0.0), spoke(i, 1.0)], BLACK.mix(0.3))))
                .context("Failed to draw spoke")?;
            chart
                .draw_series(std::iter::once(Text::new(
                    activity.field().to_string(),
                    spoke(i, 1.12),
                    ("sans-serif", 15).into_font(),
                )))
                .context("Failed to draw axis label")?;
        }

        chart
            .draw_series(std::iter::once(Text::new(
                scale.format_scaled(max),
                spoke(0, 1.0),
                ("sans-serif", 12).into_font().color(&BLACK.mix(0.6)),
            )))
            .context("Failed to draw scale label")?;

        for (gender, values, color) in &series {
            let points: Vec<(f64, f64)> = values.iter().enumerate().map(|(i, v)| spoke(i, v / max)).collect();
            let color = *color;
            chart
                .draw_series(std::iter::once(Polygon::new(points.clone(), color.mix(0.4).filled())))
                .context("Failed to draw radar area")?
                .label(gender.label())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));

            let mut outline = points;
            outline.push(outline[0]);
            chart
                .draw_series(std::iter::once(PathElement::new(outline, color.stroke_width(2))))
                .context("Failed to draw radar outline")?;
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .context("Failed to draw legend")?;

        Ok(())
    })
}

/// Bubble chart: genre on x, age group on y, one series per genre.
pub fn render_genre_bubble(view: &BubbleView, config: &ChartConfig) -> Result<Vec<u8>> {
    let summary = &view.summary;
    if summary.cells.is_empty() {
        bail!("No data for region '{}'", summary.region);
    }

    let caption = config
        .title
        .clone()
        .unwrap_or_else(|| format!("Genre x Age x Popularity: {}", summary.region));
    let axis = summary.genre_axis();
    let ages = AgeGroup::ALL.len() as u32;

    render_png(config, |root| {
        let mut chart = ChartBuilder::on(root)
            .margin(10)
            .caption(&caption, ("sans-serif", 20))
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d((0u32..axis.len() as u32).into_segmented(), (0u32..ages).into_segmented())
            .context("Failed to build chart")?;

        let genre_label = |value: &SegmentValue<u32>| match value {
            SegmentValue::CenterOf(idx) => axis.get(*idx as usize).cloned().unwrap_or_default(),
            _ => String::new(),
        };
        let age_label = |value: &SegmentValue<u32>| match value {
            SegmentValue::CenterOf(idx) => AgeGroup::ALL
                .get(*idx as usize)
                .map(|g| g.label().to_string())
                .unwrap_or_default(),
            _ => String::new(),
        };

        chart
            .configure_mesh()
            .x_labels(axis.len())
            .y_labels(AgeGroup::ALL.len())
            .x_label_formatter(&genre_label)
            .y_label_formatter(&age_label)
            .x_desc("Genre")
            .y_desc("Age Group")
            .draw()
            .context("Failed to draw mesh")?;

        for genre in summary.genres() {
            let Some(x) = axis.iter().position(|g| g == genre) else {
                continue;
            };
            let color = view.colors.get(genre).map(|c| hex_color(c)).unwrap_or(UNMAPPED_COLOR);
            let bubbles: Vec<Circle<(SegmentValue<u32>, SegmentValue<u32>), i32>> = summary
                .cells
                .iter()
                .zip(view.radii.iter())
                .filter(|(cell, _)| cell.genre == genre)
                .map(|(cell, radius)| {
                    Circle::new(
                        (SegmentValue::CenterOf(x as u32), SegmentValue::CenterOf(cell.age.index() as u32)),
                        radius.round() as i32,
                        color.mix(0.7).filled(),
                    )
                })
                .collect();
            chart
                .draw_series(bubbles)
                .context("Failed to draw bubbles")?
                .label(genre)
                .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
        }

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .context("Failed to draw legend")?;

        Ok(())
    })
}
