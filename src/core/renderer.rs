use std::fmt::Display;

use once_cell::sync::Lazy;
use plotters::prelude::*;
use plotters::style::register_font;

use crate::core::error::ChartError;
use crate::core::psychrochart::{LayerKind, LineStyle, PsychroChart};

pub const DEFAULT_DPI: f64 = 150.0;
const TITLE_FONT_PT: f64 = 16.0;
const LABEL_FONT_PT: f64 = 10.0;
const CURVE_LABEL_FONT_PT: f64 = 8.0;
const FONT_FAMILY: &str = "sans-serif";

static FONT_REGULAR: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
static FONT_BOLD: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans-Bold.ttf");

static FONTS: Lazy<Result<(), String>> = Lazy::new(|| {
    register_font(FONT_FAMILY, FontStyle::Normal, FONT_REGULAR)
        .map_err(|_| "embedded regular font is not a valid font file".to_string())?;
    register_font(FONT_FAMILY, FontStyle::Bold, FONT_BOLD)
        .map_err(|_| "embedded bold font is not a valid font file".to_string())?;
    tracing::debug!("registered chart fonts for family {}", FONT_FAMILY);
    Ok(())
});

/// Registers the embedded fonts with plotters. Runs once per process.
pub fn ensure_fonts() -> Result<(), ChartError> {
    FONTS
        .as_ref()
        .map(|_| ())
        .map_err(|e| ChartError::RenderFailure(e.clone()))
}

fn render_err(err: impl Display) -> ChartError {
    ChartError::RenderFailure(err.to_string())
}

/// Turns a computed chart into PNG bytes.
pub trait ChartRenderer: Send + Sync {
    fn render_png(&self, chart: &PsychroChart, title: &str) -> Result<Vec<u8>, ChartError>;
}

/// Draws charts with plotters on an opaque in-memory RGB bitmap.
#[derive(Clone, Debug)]
pub struct PlottersRenderer {
    dpi: f64,
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self { dpi: DEFAULT_DPI }
    }
}

impl PlottersRenderer {
    pub fn new(dpi: f64) -> Self {
        Self { dpi }
    }

    pub fn dpi(&self) -> f64 {
        self.dpi
    }

    /// Points to pixels at this renderer's resolution.
    fn px(&self, points: f64) -> f64 {
        points * self.dpi / 72.0
    }

    fn stroke(&self, style: &LineStyle) -> ShapeStyle {
        let (r, g, b, a) = style.rgba();
        let width = (self.px(style.linewidth).round() as u32).max(1);
        RGBAColor(r, g, b, a).stroke_width(width)
    }

    fn draw(
        &self,
        chart: &PsychroChart,
        title: &str,
        buffer: &mut [u8],
        size: (u32, u32),
    ) -> Result<(), ChartError> {
        let bounds = chart.bounds();
        let limits = &chart.config().limits;
        let x_ticks = ((bounds.x.1 - bounds.x.0) / limits.step_temp).round() as usize + 1;

        let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let margin = self.px(12.0) as u32;
        let mut ctx = ChartBuilder::on(&root)
            .caption(title, (FONT_FAMILY, self.px(TITLE_FONT_PT), FontStyle::Bold))
            .margin(margin)
            .x_label_area_size(self.px(36.0) as u32)
            // humidity axis lives on the right
            .right_y_label_area_size(self.px(42.0) as u32)
            .build_cartesian_2d(bounds.x.0..bounds.x.1, bounds.y.0..bounds.y.1)
            .map_err(render_err)?;

        ctx.configure_mesh()
            .x_labels(x_ticks.clamp(2, 40))
            .y_labels(7)
            .x_desc("Dry bulb temperature [°C]")
            .y_desc("Humidity ratio [g/kg dry air]")
            .label_style((FONT_FAMILY, self.px(LABEL_FONT_PT)))
            .axis_desc_style((FONT_FAMILY, self.px(LABEL_FONT_PT)))
            .light_line_style(BLACK.mix(0.04))
            .bold_line_style(BLACK.mix(0.12))
            .draw()
            .map_err(render_err)?;

        // saturation goes last so it sits on top of the overlays
        let mut layers: Vec<_> = chart.layers().iter().collect();
        layers.sort_by_key(|l| l.kind == LayerKind::Saturation);

        for layer in layers {
            let stroke = self.stroke(&layer.style);
            for curve in &layer.curves {
                for segment in curve.segments.iter().filter(|s| s.len() > 1) {
                    ctx.draw_series(LineSeries::new(segment.iter().copied(), stroke))
                        .map_err(render_err)?;
                }
            }

            if layer.kind == LayerKind::ConstantRh {
                let (r, g, b, _) = layer.style.rgba();
                let label_style = (FONT_FAMILY, self.px(CURVE_LABEL_FONT_PT))
                    .into_font()
                    .color(&RGBColor(r, g, b));
                let labels = layer.curves.iter().filter_map(|curve| {
                    let anchor = curve.segments.last()?.last()?;
                    Some(Text::new(curve.label.clone(), *anchor, label_style.clone()))
                });
                ctx.draw_series(labels).map_err(render_err)?;
            }
        }

        root.present().map_err(render_err)?;
        Ok(())
    }
}

impl ChartRenderer for PlottersRenderer {
    fn render_png(&self, chart: &PsychroChart, title: &str) -> Result<Vec<u8>, ChartError> {
        ensure_fonts()?;

        let (width, height) = chart.figsize().pixels(self.dpi);
        if width == 0 || height == 0 {
            return Err(ChartError::RenderFailure(format!(
                "figure of {}x{} pixels cannot be drawn",
                width, height
            )));
        }

        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        self.draw(chart, title, &mut buffer, (width, height))?;

        encode_png(&buffer, (width, height), self.dpi)
    }
}

/// Encodes an RGB8 buffer as PNG, recording the resolution in the pHYs chunk.
pub fn encode_png(rgb: &[u8], (width, height): (u32, u32), dpi: f64) -> Result<Vec<u8>, ChartError> {
    let expected = width as usize * height as usize * 3;
    if rgb.len() != expected {
        return Err(ChartError::EncodingFailure(format!(
            "buffer holds {} bytes, expected {} for {}x{} RGB",
            rgb.len(),
            expected,
            width,
            height
        )));
    }

    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let pixels_per_meter = (dpi / 0.0254).round() as u32;
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: pixels_per_meter,
            yppu: pixels_per_meter,
            unit: png::Unit::Meter,
        }));
        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgb)?;
        writer.finish()?;
    }

    Ok(out)
}

/// Draws a line of text on a tiny bitmap to prove the plotting backend
/// and its fonts are usable.
pub fn check_backend() -> Result<(), ChartError> {
    ensure_fonts()?;

    let size = (96u32, 32u32);
    let mut buffer = vec![0u8; (size.0 * size.1 * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, size).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;
        root.draw(&Text::new("25 °C", (4, 4), (FONT_FAMILY, 14.0).into_font()))
            .map_err(render_err)?;
        root.present().map_err(render_err)?;
    }

    if buffer.iter().all(|&b| b == 0xff) {
        return Err(ChartError::RenderFailure(
            "text rendering produced no pixels".to_string(),
        ));
    }
    Ok(())
}
