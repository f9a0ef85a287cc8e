use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose};

use crate::core::error::ChartError;
use crate::core::psychrochart::{ChartConfig, FigureSize, PsychroChart};
use crate::core::psychrolib::{Psychrometrics, UnitSystem};
use crate::core::renderer::{ChartRenderer, PlottersRenderer};
use crate::core::request::ChartRequest;

/// Figure size of generated charts, in inches.
pub const FIGURE_SIZE: FigureSize = FigureSize {
    width: 12.0,
    height: 8.0,
};

/// Builds and renders psychrometric charts.
///
/// The unit system is part of the engine rather than process state, so
/// concurrent requests never observe each other's settings.
#[derive(Clone)]
pub struct ChartEngine {
    renderer: Arc<dyn ChartRenderer>,
    units: UnitSystem,
    figsize: FigureSize,
}

impl Default for ChartEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartEngine {
    pub fn new() -> Self {
        Self::with_renderer(Arc::new(PlottersRenderer::default()))
    }

    pub fn with_renderer(renderer: Arc<dyn ChartRenderer>) -> Self {
        Self {
            renderer,
            units: UnitSystem::Si,
            figsize: FIGURE_SIZE,
        }
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    pub fn build_chart(&self, request: &ChartRequest) -> Result<PsychroChart, ChartError> {
        let (temp_min, temp_max) = request.temperature_range()?;
        let config = ChartConfig::for_temperature_range(temp_min, temp_max);
        tracing::debug!("chart config: {:?}", config);

        PsychroChart::new(config, self.figsize, Psychrometrics::new(self.units))
    }

    /// Renders the chart on a blocking worker and returns PNG bytes.
    pub async fn render(&self, request: ChartRequest) -> Result<Vec<u8>, ChartError> {
        let engine = self.clone();

        tokio::task::spawn_blocking(move || engine.render_sync(&request)).await?
    }

    pub async fn render_base64(&self, request: ChartRequest) -> Result<String, ChartError> {
        let png = self.render(request).await?;
        Ok(general_purpose::STANDARD.encode(&png))
    }

    fn render_sync(&self, request: &ChartRequest) -> Result<Vec<u8>, ChartError> {
        let chart = self.build_chart(request)?;
        let png = self.renderer.render_png(&chart, &request.title_text())?;
        tracing::debug!("rendered {} PNG bytes", png.len());
        Ok(png)
    }
}
