use std::collections::BTreeMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

use crate::core::error::ChartError;
use crate::core::psychrochart::{ChartConfig, FigureSize, LayerKind, PsychroChart};
use crate::core::psychrolib::{PsychroError, Psychrometrics};
use crate::core::renderer;

pub const STATUS_OK: &str = "OK";

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error(transparent)]
    Chart(#[from] ChartError),

    #[error(transparent)]
    Psychro(#[from] PsychroError),

    #[error("{0}")]
    Unexpected(String),

    #[error("{0}")]
    Panic(String),
}

impl ProbeError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Chart(e) => e.kind(),
            Self::Psychro(e) => e.kind(),
            Self::Unexpected(_) => "Unexpected",
            Self::Panic(_) => "Panic",
        }
    }

    /// `ERROR: <kind>: <message>`, the wire form of a failed check.
    pub fn status(&self) -> String {
        format!("ERROR: {}: {}", self.kind(), self)
    }
}

/// One component of the chart pipeline that can be exercised in isolation.
pub trait DependencyCheck: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self) -> Result<(), ProbeError>;
}

/// Draws text through plotters with the embedded fonts.
pub struct PlottersCheck;

impl DependencyCheck for PlottersCheck {
    fn name(&self) -> &'static str {
        "plotters"
    }

    fn check(&self) -> Result<(), ProbeError> {
        Ok(renderer::check_backend()?)
    }
}

/// Computes the saturation pressure at 20 °C and compares it with the
/// ASHRAE table value.
pub struct PsychrolibCheck;

impl DependencyCheck for PsychrolibCheck {
    fn name(&self) -> &'static str {
        "psychrolib"
    }

    fn check(&self) -> Result<(), ProbeError> {
        let p_ws = Psychrometrics::si().sat_vap_pres(20.0)?;
        if !(2330.0..2345.0).contains(&p_ws) {
            return Err(ProbeError::Unexpected(format!(
                "saturation pressure at 20 °C is {:.1} Pa, expected about 2339 Pa",
                p_ws
            )));
        }
        Ok(())
    }
}

/// Builds the default chart and checks the saturation curve came out.
pub struct PsychrochartCheck;

impl DependencyCheck for PsychrochartCheck {
    fn name(&self) -> &'static str {
        "psychrochart"
    }

    fn check(&self) -> Result<(), ProbeError> {
        let chart = PsychroChart::new(
            ChartConfig::for_temperature_range(0.0, 40.0),
            FigureSize::new(12.0, 8.0),
            Psychrometrics::si(),
        )?;
        let drawn = chart
            .layer(LayerKind::Saturation)
            .is_some_and(|l| l.curves.iter().any(|c| !c.segments.is_empty()));
        if !drawn {
            return Err(ProbeError::Unexpected("saturation curve is empty".to_string()));
        }
        Ok(())
    }
}

pub struct DependencyProbe {
    checks: Vec<Box<dyn DependencyCheck>>,
}

impl Default for DependencyProbe {
    fn default() -> Self {
        Self::new(vec![
            Box::new(PlottersCheck),
            Box::new(PsychrolibCheck),
            Box::new(PsychrochartCheck),
        ])
    }
}

impl DependencyProbe {
    pub fn new(checks: Vec<Box<dyn DependencyCheck>>) -> Self {
        Self { checks }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Runs every check. Failures, panics included, become entries in the
    /// map; this never fails as a whole.
    pub fn run(&self) -> BTreeMap<String, String> {
        self.checks
            .iter()
            .map(|check| {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| check.check()))
                    .unwrap_or_else(|payload| Err(ProbeError::Panic(panic_message(payload.as_ref()))));

                let status = match outcome {
                    Ok(()) => {
                        tracing::info!("dependency {} OK", check.name());
                        STATUS_OK.to_string()
                    }
                    Err(e) => {
                        tracing::warn!("dependency {} failed: {}", check.name(), e);
                        e.status()
                    }
                };
                (check.name().to_string(), status)
            })
            .collect()
    }

    /// Runs the checks on a blocking worker; they compute and rasterise
    /// charts. A worker that dies marks every component as failed.
    pub async fn run_blocking(self: Arc<Self>) -> BTreeMap<String, String> {
        let probe = Arc::clone(&self);
        match tokio::task::spawn_blocking(move || probe.run()).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!("dependency probe task failed: {}", e);
                self.all_failed(&ProbeError::Panic(e.to_string()))
            }
        }
    }

    fn all_failed(&self, error: &ProbeError) -> BTreeMap<String, String> {
        self.checks
            .iter()
            .map(|check| (check.name().to_string(), error.status()))
            .collect()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl DependencyCheck for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn check(&self) -> Result<(), ProbeError> {
            Err(ChartError::RenderFailure("no backend".to_string()).into())
        }
    }

    struct Panicking;

    impl DependencyCheck for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn check(&self) -> Result<(), ProbeError> {
            panic!("boom")
        }
    }

    #[test]
    fn default_probe_checks_three_components() {
        let probe = DependencyProbe::default();
        assert_eq!(probe.names(), vec!["plotters", "psychrolib", "psychrochart"]);

        let results = probe.run();
        assert_eq!(results.len(), 3);
        for (name, status) in &results {
            assert_eq!(status, STATUS_OK, "{} reported {}", name, status);
        }
    }

    #[test]
    fn failures_are_reported_with_kind_and_message() {
        let probe = DependencyProbe::new(vec![Box::new(Failing), Box::new(PsychrolibCheck)]);
        let results = probe.run();
        assert_eq!(results["failing"], "ERROR: RenderFailure: render failure: no backend");
        assert_eq!(results["psychrolib"], "OK");
    }

    #[test]
    fn panics_are_captured() {
        let probe = DependencyProbe::new(vec![Box::new(Panicking)]);
        assert_eq!(probe.run()["panicking"], "ERROR: Panic: boom");
    }

    #[tokio::test]
    async fn blocking_run_reports_like_run() {
        let probe = Arc::new(DependencyProbe::new(vec![Box::new(Panicking), Box::new(PsychrolibCheck)]));
        let results = probe.run_blocking().await;
        assert_eq!(results["panicking"], "ERROR: Panic: boom");
        assert_eq!(results["psychrolib"], "OK");
    }

    #[test]
    fn dead_worker_fails_every_component() {
        let probe = DependencyProbe::new(vec![Box::new(Failing), Box::new(PsychrolibCheck)]);
        let results = probe.all_failed(&ProbeError::Panic("task cancelled".to_string()));
        assert_eq!(results.len(), 2);
        assert!(results.values().all(|s| s == "ERROR: Panic: task cancelled"));
    }

    #[test]
    fn psychro_errors_keep_their_kind() {
        let err: ProbeError = PsychroError::RelHumOutOfRange(2.0).into();
        assert!(err.status().starts_with("ERROR: RelHumOutOfRange: "));
    }
}
